use std::time::Duration;

use serde::Deserialize;

use usagegraph_core::{FingerprintTable, SubmissionPayload, SubmitReceipt};

use crate::error::{ClientError, Result};

/// HTTP access to the reconciliation endpoints of a usagegraph server.
pub struct SyncApi {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl SyncApi {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    pub async fn fetch_checksums(&self) -> Result<FingerprintTable> {
        let url = format!("{}/api/sync/checksums", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .header("Accept", "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(decode_error(status.as_u16(), &body));
        }
        Ok(response.json().await?)
    }

    pub async fn submit(&self, payload: &SubmissionPayload) -> Result<SubmitReceipt> {
        let url = format!("{}/api/sync/submit", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(decode_error(status.as_u16(), &body));
        }
        Ok(response.json().await?)
    }
}

#[derive(Deserialize)]
struct WireError {
    error: String,
    #[serde(default)]
    details: Option<Vec<String>>,
}

/// Map a non-success response onto a typed error. Bodies that are not the
/// server's JSON error shape fall through as `Unexpected` with the raw text.
fn decode_error(status: u16, body: &str) -> ClientError {
    let wire: Option<WireError> = serde_json::from_str(body).ok();
    match (status, wire) {
        (401, Some(wire)) => ClientError::Auth(wire.error),
        (401, None) => ClientError::Auth("credential rejected".to_string()),
        (400, Some(wire)) => ClientError::Rejected {
            message: wire.error,
            details: wire.details.unwrap_or_default(),
        },
        (_, Some(wire)) => ClientError::Unexpected {
            status,
            body: wire.error,
        },
        (_, None) => ClientError::Unexpected {
            status,
            body: body.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_auth_error() {
        let err = decode_error(401, r#"{"error":"unknown or expired credential","code":"auth_invalid"}"#);
        match err {
            ClientError::Auth(message) => assert_eq!(message, "unknown or expired credential"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn decodes_validation_error_with_details() {
        let body = r#"{"error":"invalid payload: bad date","code":"invalid_payload","details":["bad date","cost mismatch"]}"#;
        match decode_error(400, body) {
            ClientError::Rejected { message, details } => {
                assert_eq!(message, "invalid payload: bad date");
                assert_eq!(details.len(), 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn non_json_body_falls_through_as_unexpected() {
        match decode_error(502, "<html>bad gateway</html>") {
            ClientError::Unexpected { status, body } => {
                assert_eq!(status, 502);
                assert!(body.contains("bad gateway"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
