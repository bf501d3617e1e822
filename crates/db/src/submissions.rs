use std::collections::{BTreeMap, BTreeSet};

use rusqlite::{Connection, OptionalExtension, Row, params};

use usagegraph_core::{DailyAggregate, DailyTotals, SourceBreakdown};

use crate::Db;
use crate::error::Result;

/// One row per identity holding the aggregate view of everything currently
/// stored for it, plus the audit hash of the last accepted payload.
#[derive(Debug, Clone)]
pub struct SubmissionRecord {
    pub id: i64,
    pub user_id: String,
    pub total_tokens: u64,
    pub total_cost: f64,
    pub date_range_start: Option<String>,
    pub date_range_end: Option<String>,
    pub active_days: u32,
    pub sources: Vec<String>,
    pub models: Vec<String>,
    pub payload_hash: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

/// One stored daily breakdown, with the per-source map decoded.
#[derive(Debug, Clone)]
pub struct StoredDay {
    pub date: String,
    pub totals: DailyTotals,
    pub sources: BTreeMap<String, SourceBreakdown>,
}

impl Db {
    /// Persist a submission for `user_id` in a single transaction.
    ///
    /// Only the dates named in `days` are written; each is inserted or
    /// overwritten in place, and every previously stored date stays
    /// untouched. The submission row's metrics are then recomputed from the
    /// full stored union, so they reflect the identity's current state
    /// rather than the (possibly diff-reduced) incoming payload. Any failure
    /// rolls the whole write back.
    pub fn upsert_submission(
        &mut self,
        user_id: &str,
        days: &[DailyAggregate],
        payload_hash: &str,
        now: &str,
    ) -> Result<SubmissionRecord> {
        let tx = self.conn.transaction()?;

        let submission_id: i64 = match tx
            .query_row(
                "SELECT id FROM submission WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?
        {
            Some(id) => id,
            None => {
                tx.execute(
                    "INSERT INTO submission (user_id, created_at, updated_at) VALUES (?1, ?2, ?2)",
                    params![user_id, now],
                )?;
                tx.last_insert_rowid()
            }
        };

        {
            let mut stmt = tx.prepare(
                r#"
                INSERT INTO daily_breakdown (
                  submission_id, date, total_tokens, total_cost, messages, sources_json
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT (submission_id, date) DO UPDATE SET
                  total_tokens = excluded.total_tokens,
                  total_cost = excluded.total_cost,
                  messages = excluded.messages,
                  sources_json = excluded.sources_json
                "#,
            )?;
            for day in days {
                let sources_json = serde_json::to_string(&day.sources)?;
                stmt.execute(params![
                    submission_id,
                    day.date,
                    day.totals.tokens as i64,
                    day.totals.cost,
                    day.totals.messages as i64,
                    sources_json,
                ])?;
            }
        }

        let stored = load_days(&tx, submission_id)?;
        let mut total_tokens = 0u64;
        let mut total_cost = 0f64;
        let mut active_days = 0u32;
        let mut sources: BTreeSet<String> = BTreeSet::new();
        let mut models: BTreeSet<String> = BTreeSet::new();
        for day in &stored {
            total_tokens = total_tokens.saturating_add(day.totals.tokens);
            total_cost += day.totals.cost;
            if day.totals.cost > 0.0 {
                active_days += 1;
            }
            for (source_id, source) in &day.sources {
                sources.insert(source_id.clone());
                models.extend(source.models.keys().cloned());
            }
        }
        let sources: Vec<String> = sources.into_iter().collect();
        let models: Vec<String> = models.into_iter().collect();

        tx.execute(
            r#"
            UPDATE submission SET
              total_tokens = ?2,
              total_cost = ?3,
              date_range_start = ?4,
              date_range_end = ?5,
              active_days = ?6,
              sources_json = ?7,
              models_json = ?8,
              payload_hash = ?9,
              status = 'complete',
              updated_at = ?10
            WHERE id = ?1
            "#,
            params![
                submission_id,
                total_tokens as i64,
                total_cost,
                stored.first().map(|day| day.date.as_str()),
                stored.last().map(|day| day.date.as_str()),
                active_days,
                serde_json::to_string(&sources)?,
                serde_json::to_string(&models)?,
                payload_hash,
                now,
            ],
        )?;

        tx.commit()?;

        self.conn
            .query_row(
                SELECT_SUBMISSION,
                params![user_id],
                submission_from_row,
            )
            .map_err(Into::into)
    }

    pub fn submission_for_user(&self, user_id: &str) -> Result<Option<SubmissionRecord>> {
        self.conn
            .query_row(SELECT_SUBMISSION, params![user_id], submission_from_row)
            .optional()
            .map_err(Into::into)
    }

    /// Drop an identity's submission; daily rows go with it via the cascade.
    pub fn delete_submission(&self, user_id: &str) -> Result<bool> {
        let deleted = self.conn.execute(
            "DELETE FROM submission WHERE user_id = ?1",
            params![user_id],
        )?;
        Ok(deleted > 0)
    }

    /// All stored daily breakdowns for `user_id`, date-ordered, with source
    /// maps decoded. Empty when the identity has never submitted.
    pub fn load_breakdowns(&self, user_id: &str) -> Result<Vec<StoredDay>> {
        let submission_id: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM submission WHERE user_id = ?1",
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;
        match submission_id {
            Some(id) => load_days(&self.conn, id),
            None => Ok(Vec::new()),
        }
    }
}

const SELECT_SUBMISSION: &str = r#"
SELECT id, user_id, total_tokens, total_cost, date_range_start, date_range_end,
       active_days, sources_json, models_json, payload_hash, status,
       created_at, updated_at
FROM submission
WHERE user_id = ?1
"#;

fn submission_from_row(row: &Row<'_>) -> rusqlite::Result<SubmissionRecord> {
    let sources_json: String = row.get(7)?;
    let models_json: String = row.get(8)?;
    Ok(SubmissionRecord {
        id: row.get(0)?,
        user_id: row.get(1)?,
        total_tokens: row.get::<_, i64>(2)? as u64,
        total_cost: row.get(3)?,
        date_range_start: row.get(4)?,
        date_range_end: row.get(5)?,
        active_days: row.get::<_, i64>(6)? as u32,
        sources: decode_string_list(7, &sources_json)?,
        models: decode_string_list(8, &models_json)?,
        payload_hash: row.get(9)?,
        status: row.get(10)?,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

// A corrupt JSON column is a decode failure, not an empty list.
fn decode_string_list(idx: usize, raw: &str) -> rusqlite::Result<Vec<String>> {
    serde_json::from_str(raw).map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(err))
    })
}

fn load_days(conn: &Connection, submission_id: i64) -> Result<Vec<StoredDay>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT date, total_tokens, total_cost, messages, sources_json
        FROM daily_breakdown
        WHERE submission_id = ?1
        ORDER BY date ASC
        "#,
    )?;
    let mut rows = stmt.query(params![submission_id])?;
    let mut days = Vec::new();
    while let Some(row) = rows.next()? {
        let sources_json: String = row.get(4)?;
        days.push(StoredDay {
            date: row.get(0)?,
            totals: DailyTotals {
                tokens: row.get::<_, i64>(1)? as u64,
                cost: row.get(2)?,
                messages: row.get::<_, i64>(3)? as u64,
            },
            sources: serde_json::from_str(&sources_json)?,
        });
    }
    Ok(days)
}
