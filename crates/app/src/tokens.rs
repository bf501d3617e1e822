use chrono::{Duration, SecondsFormat, Utc};
use rand::RngCore;

use crate::error::Result;
use crate::state::{SharedConfig, open_db};

#[derive(Clone)]
pub struct TokenService {
    config: SharedConfig,
}

impl TokenService {
    pub(crate) fn new(config: SharedConfig) -> Self {
        Self { config }
    }

    /// Mint and persist a bearer token for `user_id`. `ttl_days` of `None`
    /// means the token never expires.
    pub fn mint(&self, user_id: &str, label: Option<&str>, ttl_days: Option<i64>) -> Result<String> {
        let db = open_db(&self.config)?;
        let token = generate_token();
        let now = Utc::now();
        let expires_at = ttl_days
            .map(|days| (now + Duration::days(days)).to_rfc3339_opts(SecondsFormat::Millis, true));
        db.insert_token(
            &token,
            user_id,
            label,
            expires_at.as_deref(),
            &now.to_rfc3339_opts(SecondsFormat::Millis, true),
        )?;
        Ok(token)
    }

    pub fn revoke(&self, token: &str) -> Result<bool> {
        let db = open_db(&self.config)?;
        Ok(db.revoke_token(token)?)
    }
}

pub fn generate_token() -> String {
    let mut bytes = [0u8; 24];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    bytes.iter().map(|byte| format!("{:02x}", byte)).collect()
}
