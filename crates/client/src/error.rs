use thiserror::Error;

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server refused the credential. Not retried and never downgraded
    /// to a full upload; the user has to fix their token first.
    #[error("authentication rejected: {0}")]
    Auth(String),

    #[error("server rejected payload: {message}")]
    Rejected {
        message: String,
        details: Vec<String>,
    },

    #[error("unexpected response (HTTP {status}): {body}")]
    Unexpected { status: u16, body: String },
}
