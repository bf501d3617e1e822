use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("db error: {0}")]
    Db(#[from] usagegraph_db::DbError),
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("{0}")]
    Auth(String),
    #[error("invalid payload: {}", .0.join("; "))]
    Validation(Vec<String>),
}

pub type Result<T> = std::result::Result<T, AppError>;

/// HTTP error body. Validation failures carry the itemized field errors in
/// `details`.
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: u16,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::Auth(message) => Self {
                status: 401,
                error: message,
                code: Some("auth_invalid".to_string()),
                details: None,
            },
            AppError::Validation(details) => Self {
                status: 400,
                error: "validation failed".to_string(),
                code: Some("invalid_payload".to_string()),
                details: Some(details),
            },
            AppError::Db(_) | AppError::Serde(_) => Self {
                status: 500,
                error: err.to_string(),
                code: None,
                details: None,
            },
        }
    }
}
