use std::fmt::Write;

use crate::{DailyAggregate, FingerprintTable, SourceBreakdown};

/// Fingerprint one source's daily breakdown.
///
/// Client and server both call this over their own data, and the diff
/// protocol compares the results across the wire, so the canonical form must
/// never drift: models are serialized in lexicographic key order, costs are
/// canonicalized to fixed-point `round(cost * 10000)` before serialization,
/// and the field order is fixed. The digest itself is a 32-bit rolling hash —
/// a change detector, not a security primitive.
pub fn source_checksum(source: &SourceBreakdown) -> String {
    digest(&canonical_string(source))
}

/// Compute the full `date -> source -> fingerprint` table for a set of
/// aggregates.
pub fn fingerprint_table(aggregates: &[DailyAggregate]) -> FingerprintTable {
    let mut table = FingerprintTable::new();
    for day in aggregates {
        let entry = table.entry(day.date.clone()).or_default();
        for (source_id, source) in &day.sources {
            entry.insert(source_id.clone(), source_checksum(source));
        }
    }
    table
}

fn canonical_string(source: &SourceBreakdown) -> String {
    let mut out = String::with_capacity(64 + source.models.len() * 64);
    let _ = write!(
        out,
        "{}|{}|{}|{}|{}|{}|{}|{}",
        source.tokens,
        fixed_point_cost(source.cost),
        source.input,
        source.output,
        source.cache_read,
        source.cache_write,
        source.reasoning,
        source.messages,
    );
    // BTreeMap iteration is already lexicographic by model id.
    for (model_id, model) in &source.models {
        let _ = write!(
            out,
            "|{}:{},{},{},{},{},{},{},{}",
            model_id,
            model.tokens,
            fixed_point_cost(model.cost),
            model.input,
            model.output,
            model.cache_read,
            model.cache_write,
            model.reasoning,
            model.messages,
        );
    }
    out
}

/// Costs are compared at 1/10000th of a unit; representation noise below
/// that never changes the fingerprint, a real change at or above it always
/// does.
fn fixed_point_cost(cost: f64) -> i64 {
    (cost * 10_000.0).round() as i64
}

fn digest(canonical: &str) -> String {
    let mut hash: i32 = 0;
    for ch in canonical.chars() {
        hash = hash.wrapping_mul(33).wrapping_add(ch as i32);
    }
    format!("{:08x}", hash.unsigned_abs())
}
