use rusqlite::{OptionalExtension, params};

use crate::Db;
use crate::error::Result;

impl Db {
    pub fn insert_token(
        &self,
        token: &str,
        user_id: &str,
        label: Option<&str>,
        expires_at: Option<&str>,
        now: &str,
    ) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO api_token (token, user_id, label, created_at, expires_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![token, user_id, label, now, expires_at],
        )?;
        Ok(())
    }

    /// Resolve a bearer token to its identity. Returns `None` for unknown
    /// tokens and for tokens whose expiry is at or before `now` (RFC 3339
    /// strings compare lexicographically).
    pub fn lookup_token(&self, token: &str, now: &str) -> Result<Option<String>> {
        self.conn
            .query_row(
                r#"
                SELECT user_id FROM api_token
                WHERE token = ?1 AND (expires_at IS NULL OR expires_at > ?2)
                "#,
                params![token, now],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn revoke_token(&self, token: &str) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM api_token WHERE token = ?1", params![token])?;
        Ok(deleted > 0)
    }
}
