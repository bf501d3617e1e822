mod aggregator;
mod checksum;
mod diff;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use aggregator::{
    aggregate_events, build_payload, build_summary, build_years, clip_date_range,
    recompute_totals, retain_sources,
};
pub use checksum::{fingerprint_table, source_checksum};
pub use diff::{SubmissionPlan, plan_submission};

/// Raw per-(day, source, model) token counts as produced by the external
/// computation engine. Consumed opaquely; this crate never parses session logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageEvent {
    /// Calendar day in `YYYY-MM-DD`.
    pub date: String,
    pub source: String,
    pub model: String,
    pub tokens: TokenUsage,
    pub cost: f64,
    pub messages: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenUsage {
    pub input: u64,
    pub output: u64,
    pub cache_read: u64,
    pub cache_write: u64,
    pub reasoning: u64,
}

impl TokenUsage {
    pub fn total(&self) -> u64 {
        self.input
            .saturating_add(self.output)
            .saturating_add(self.cache_read)
            .saturating_add(self.cache_write)
            .saturating_add(self.reasoning)
    }
}

/// One model's share of a source's daily usage. Leaf of the breakdown tree;
/// immutable once computed for a given input set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelBreakdown {
    pub tokens: u64,
    pub cost: f64,
    pub input: u64,
    pub output: u64,
    pub cache_read: u64,
    pub cache_write: u64,
    pub reasoning: u64,
    pub messages: u64,
}

/// One provider's contribution for a day. Every scalar field equals the sum
/// of the same field across `models`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceBreakdown {
    pub tokens: u64,
    pub cost: f64,
    pub input: u64,
    pub output: u64,
    pub cache_read: u64,
    pub cache_write: u64,
    pub reasoning: u64,
    pub messages: u64,
    pub models: BTreeMap<String, ModelBreakdown>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTotals {
    pub tokens: u64,
    pub cost: f64,
    pub messages: u64,
}

/// One day's usage: totals plus the per-source decomposition. `totals` equals
/// the sum across all `sources`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyAggregate {
    pub date: String,
    pub totals: DailyTotals,
    pub sources: BTreeMap<String, SourceBreakdown>,
}

/// `date -> source -> fingerprint`. Either freshly computed from local
/// aggregates or derived on demand from server-side storage.
pub type FingerprintTable = BTreeMap<String, BTreeMap<String, String>>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionMeta {
    pub generated_at: String,
    pub version: String,
    pub date_range_start: String,
    pub date_range_end: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionSummary {
    pub total_tokens: u64,
    pub total_cost: f64,
    pub total_days: u32,
    pub active_days: u32,
    pub average_per_day: f64,
    pub max_cost_in_single_day: f64,
    pub sources: Vec<String>,
    pub models: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearSummary {
    pub year: String,
    pub total_tokens: u64,
    pub total_cost: f64,
    pub range_start: String,
    pub range_end: String,
}

/// The wire body of a submission: either the full local aggregate set or a
/// diff-reduced subset. Summary and years always describe `contributions`
/// alone, so a partial payload is self-consistent on its own terms.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    pub meta: SubmissionMeta,
    pub summary: SubmissionSummary,
    pub years: Vec<YearSummary>,
    pub contributions: Vec<DailyAggregate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub start: String,
    pub end: String,
}

/// Aggregate metrics of the identity's stored state after a successful
/// submit. Reflects the stored union, not just the incoming payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitMetrics {
    pub total_tokens: u64,
    pub total_cost: f64,
    pub date_range: DateRange,
    pub active_days: u32,
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitReceipt {
    pub success: bool,
    pub submission_id: i64,
    pub metrics: SubmitMetrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warnings: Option<Vec<String>>,
}
