use chrono::{SecondsFormat, Utc};
use sha2::{Digest, Sha256};

use usagegraph_core::{
    DateRange, FingerprintTable, SubmissionPayload, SubmitMetrics, SubmitReceipt, source_checksum,
};
use usagegraph_db::Db;

use crate::error::{AppError, Result};
use crate::state::{SharedConfig, open_db};
use crate::validate::{payload_warnings, validate_payload};

/// Server-side reconciliation: derive fingerprints from stored rows on read,
/// authenticate/validate/persist submissions on write.
#[derive(Clone)]
pub struct ReconcileService {
    config: SharedConfig,
}

impl ReconcileService {
    pub(crate) fn new(config: SharedConfig) -> Self {
        Self { config }
    }

    fn db(&self) -> Result<Db> {
        open_db(&self.config)
    }

    /// Current fingerprint table for the credential's identity, recomputed
    /// from storage on every call so it can never drift from persisted
    /// content. Empty table when the identity has never submitted.
    pub fn fingerprints(&self, token: &str) -> Result<FingerprintTable> {
        let db = self.db()?;
        let user_id = authenticate(&db, token)?;
        let stored = db.load_breakdowns(&user_id)?;
        let mut table = FingerprintTable::new();
        for day in stored {
            let entry = table.entry(day.date).or_default();
            for (source_id, source) in day.sources {
                entry.insert(source_id, source_checksum(&source));
            }
        }
        Ok(table)
    }

    /// Validate and persist a submission (full or diff-reduced). Nothing is
    /// persisted on authentication or validation failure; on success only the
    /// payload's dates are overwritten and the receipt's metrics describe the
    /// stored union.
    pub fn submit(&self, token: &str, payload: &SubmissionPayload) -> Result<SubmitReceipt> {
        let mut db = self.db()?;
        let user_id = authenticate(&db, token)?;

        let errors = validate_payload(payload);
        if !errors.is_empty() {
            return Err(AppError::Validation(errors));
        }
        let warnings = payload_warnings(payload, Utc::now().date_naive());

        // Audit hash of the entire incoming payload, independent of the
        // per-source fingerprints.
        let payload_hash = hash_payload(payload)?;
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let record = db.upsert_submission(&user_id, &payload.contributions, &payload_hash, &now)?;

        Ok(SubmitReceipt {
            success: true,
            submission_id: record.id,
            metrics: SubmitMetrics {
                total_tokens: record.total_tokens,
                total_cost: record.total_cost,
                date_range: DateRange {
                    start: record.date_range_start.unwrap_or_default(),
                    end: record.date_range_end.unwrap_or_default(),
                },
                active_days: record.active_days,
                sources: record.sources,
            },
            warnings: if warnings.is_empty() {
                None
            } else {
                Some(warnings)
            },
        })
    }
}

fn authenticate(db: &Db, token: &str) -> Result<String> {
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    db.lookup_token(token, &now)?
        .ok_or_else(|| AppError::Auth("unknown or expired credential".to_string()))
}

fn hash_payload(payload: &SubmissionPayload) -> Result<String> {
    let bytes = serde_json::to_vec(payload)?;
    let digest = Sha256::digest(&bytes);
    Ok(digest.iter().map(|byte| format!("{:02x}", byte)).collect())
}
