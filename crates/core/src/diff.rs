use crate::aggregator::recompute_totals;
use crate::checksum::source_checksum;
use crate::{DailyAggregate, FingerprintTable};

/// What the client should transmit after comparing local state against the
/// server's fingerprint table.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmissionPlan {
    /// No server table available (fetch failed) or the identity has never
    /// submitted: send the entire local aggregate set unmodified.
    FullUpload,
    /// Only these day entries changed; each carries only its changed sources
    /// with totals recomputed from the included members.
    Partial(Vec<DailyAggregate>),
    /// Every local fingerprint matches the server. Nothing is transmitted.
    NoChange,
}

/// Compare local aggregates against the remote fingerprint table.
///
/// The diff only detects additions and modifications. A source that existed
/// in a prior submission but is absent locally produces no signal here and
/// stays on the server; absence is ambiguous with "nothing changed", and
/// propagating removals would need an explicit tombstone in the protocol.
pub fn plan_submission(
    local: &[DailyAggregate],
    remote: Option<&FingerprintTable>,
) -> SubmissionPlan {
    let remote = match remote {
        Some(table) if !table.is_empty() => table,
        _ => return SubmissionPlan::FullUpload,
    };

    let mut changed_days: Vec<DailyAggregate> = Vec::new();
    for day in local {
        let remote_day = remote.get(&day.date);
        let mut reduced = DailyAggregate {
            date: day.date.clone(),
            ..DailyAggregate::default()
        };
        for (source_id, source) in &day.sources {
            let matches_remote = remote_day
                .and_then(|sources| sources.get(source_id))
                .is_some_and(|fingerprint| *fingerprint == source_checksum(source));
            if !matches_remote {
                reduced.sources.insert(source_id.clone(), source.clone());
            }
        }
        if !reduced.sources.is_empty() {
            recompute_totals(&mut reduced);
            changed_days.push(reduced);
        }
    }

    if changed_days.is_empty() {
        SubmissionPlan::NoChange
    } else {
        SubmissionPlan::Partial(changed_days)
    }
}
