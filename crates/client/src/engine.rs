use chrono::{SecondsFormat, Utc};

use usagegraph_core::{
    DailyAggregate, SubmissionPayload, SubmissionPlan, build_payload, plan_submission,
};

use crate::api::SyncApi;
use crate::error::{ClientError, Result};

/// How a sync round ended.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// Server already held matching fingerprints for every local source.
    NoChange,
    Submitted {
        submission_id: i64,
        days: usize,
        full_upload: bool,
    },
}

/// Run one reconciliation round: fetch the server's fingerprint table, plan
/// the diff, and submit whatever the plan calls for.
///
/// A failed fetch (network error, server hiccup) degrades to a full upload
/// rather than aborting; the server's upsert makes resending everything safe.
/// An authentication failure is fatal either way.
pub async fn sync(api: &SyncApi, local: &[DailyAggregate], version: &str) -> Result<SyncOutcome> {
    let remote = match api.fetch_checksums().await {
        Ok(table) => Some(table),
        Err(ClientError::Auth(message)) => return Err(ClientError::Auth(message)),
        Err(_) => None,
    };

    let plan = plan_submission(local, remote.as_ref());
    let full_upload = matches!(plan, SubmissionPlan::FullUpload);
    let payload = match payload_for(plan, local, version) {
        Some(payload) => payload,
        None => return Ok(SyncOutcome::NoChange),
    };
    let days = payload.contributions.len();
    let receipt = api.submit(&payload).await?;
    Ok(SyncOutcome::Submitted {
        submission_id: receipt.submission_id,
        days,
        full_upload,
    })
}

fn payload_for(
    plan: SubmissionPlan,
    local: &[DailyAggregate],
    version: &str,
) -> Option<SubmissionPayload> {
    let generated_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    match plan {
        SubmissionPlan::NoChange => None,
        SubmissionPlan::FullUpload => Some(build_payload(local.to_vec(), version, &generated_at)),
        SubmissionPlan::Partial(days) => Some(build_payload(days, version, &generated_at)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use usagegraph_core::{TokenUsage, UsageEvent, aggregate_events, fingerprint_table};

    fn event(date: &str, source: &str, model: &str, input: u64, cost: f64) -> UsageEvent {
        UsageEvent {
            date: date.to_string(),
            source: source.to_string(),
            model: model.to_string(),
            tokens: TokenUsage {
                input,
                output: 0,
                cache_read: 0,
                cache_write: 0,
                reasoning: 0,
            },
            cost,
            messages: 1,
        }
    }

    #[test]
    fn no_change_plan_produces_no_payload() {
        let local = aggregate_events(&[event("2024-01-01", "opencode", "m1", 10, 0.01)]);
        assert!(payload_for(SubmissionPlan::NoChange, &local, "0.1.0").is_none());
    }

    #[test]
    fn full_upload_payload_carries_every_local_day() {
        let local = aggregate_events(&[
            event("2024-01-01", "opencode", "m1", 10, 0.01),
            event("2024-01-02", "codex", "m2", 20, 0.02),
        ]);
        let payload = payload_for(SubmissionPlan::FullUpload, &local, "0.1.0").expect("payload");
        assert_eq!(payload.contributions.len(), 2);
        assert_eq!(payload.summary.total_tokens, 30);
        assert_eq!(payload.meta.date_range_start, "2024-01-01");
        assert_eq!(payload.meta.date_range_end, "2024-01-02");
    }

    #[test]
    fn partial_payload_summary_describes_only_the_diff() {
        let local = aggregate_events(&[
            event("2024-01-01", "opencode", "m1", 10, 0.01),
            event("2024-01-02", "codex", "m2", 20, 0.02),
        ]);
        let mut remote = fingerprint_table(&local);
        remote.remove("2024-01-02");

        let plan = plan_submission(&local, Some(&remote));
        let payload = payload_for(plan, &local, "0.1.0").expect("payload");
        assert_eq!(payload.contributions.len(), 1);
        assert_eq!(payload.contributions[0].date, "2024-01-02");
        assert_eq!(payload.summary.total_tokens, 20);
    }
}
