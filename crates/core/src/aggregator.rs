use std::collections::{BTreeMap, BTreeSet};

use crate::{
    DailyAggregate, ModelBreakdown, SourceBreakdown, SubmissionMeta, SubmissionPayload,
    SubmissionSummary, UsageEvent, YearSummary,
};

/// Fold raw events into per-day aggregates, date-sorted. Totals are a pure
/// function of the member set; callers that filter members afterwards must go
/// through [`retain_sources`] or [`recompute_totals`] rather than patching
/// counters in place.
pub fn aggregate_events(events: &[UsageEvent]) -> Vec<DailyAggregate> {
    let mut days: BTreeMap<String, DailyAggregate> = BTreeMap::new();
    for event in events {
        let day = days
            .entry(event.date.clone())
            .or_insert_with(|| DailyAggregate {
                date: event.date.clone(),
                ..DailyAggregate::default()
            });
        let source = day.sources.entry(event.source.clone()).or_default();
        let model = source.models.entry(event.model.clone()).or_default();
        model.tokens = model.tokens.saturating_add(event.tokens.total());
        model.cost += event.cost;
        model.input = model.input.saturating_add(event.tokens.input);
        model.output = model.output.saturating_add(event.tokens.output);
        model.cache_read = model.cache_read.saturating_add(event.tokens.cache_read);
        model.cache_write = model.cache_write.saturating_add(event.tokens.cache_write);
        model.reasoning = model.reasoning.saturating_add(event.tokens.reasoning);
        model.messages = model.messages.saturating_add(event.messages);
    }
    let mut result: Vec<DailyAggregate> = days.into_values().collect();
    for day in &mut result {
        recompute_totals(day);
    }
    result
}

/// Rebuild every derived total from current membership: source scalars from
/// their model maps, day totals from the source maps.
pub fn recompute_totals(day: &mut DailyAggregate) {
    day.totals = Default::default();
    for source in day.sources.values_mut() {
        *source = rollup_source(&source.models);
        day.totals.tokens = day.totals.tokens.saturating_add(source.tokens);
        day.totals.cost += source.cost;
        day.totals.messages = day.totals.messages.saturating_add(source.messages);
    }
}

fn rollup_source(models: &BTreeMap<String, ModelBreakdown>) -> SourceBreakdown {
    let mut source = SourceBreakdown {
        models: models.clone(),
        ..SourceBreakdown::default()
    };
    for model in models.values() {
        source.tokens = source.tokens.saturating_add(model.tokens);
        source.cost += model.cost;
        source.input = source.input.saturating_add(model.input);
        source.output = source.output.saturating_add(model.output);
        source.cache_read = source.cache_read.saturating_add(model.cache_read);
        source.cache_write = source.cache_write.saturating_add(model.cache_write);
        source.reasoning = source.reasoning.saturating_add(model.reasoning);
        source.messages = source.messages.saturating_add(model.messages);
    }
    source
}

/// Keep only sources matching `keep`, recompute totals from scratch, and drop
/// days that end up with no sources at all.
pub fn retain_sources<F>(aggregates: Vec<DailyAggregate>, keep: F) -> Vec<DailyAggregate>
where
    F: Fn(&str) -> bool,
{
    aggregates
        .into_iter()
        .filter_map(|mut day| {
            day.sources.retain(|source_id, _| keep(source_id));
            if day.sources.is_empty() {
                return None;
            }
            recompute_totals(&mut day);
            Some(day)
        })
        .collect()
}

/// Keep only days inside `[start, end]` (inclusive, `YYYY-MM-DD` strings
/// compare lexicographically).
pub fn clip_date_range(
    aggregates: Vec<DailyAggregate>,
    start: &str,
    end: &str,
) -> Vec<DailyAggregate> {
    aggregates
        .into_iter()
        .filter(|day| day.date.as_str() >= start && day.date.as_str() <= end)
        .collect()
}

/// Summary statistics over exactly the given contribution set. An active day
/// is one with non-zero cost.
pub fn build_summary(contributions: &[DailyAggregate]) -> SubmissionSummary {
    let total_tokens = contributions
        .iter()
        .fold(0u64, |acc, day| acc.saturating_add(day.totals.tokens));
    let total_cost: f64 = contributions.iter().map(|day| day.totals.cost).sum();
    let active_days = contributions
        .iter()
        .filter(|day| day.totals.cost > 0.0)
        .count() as u32;
    let max_cost_in_single_day = contributions
        .iter()
        .map(|day| day.totals.cost)
        .fold(0.0, f64::max);

    let mut sources: BTreeSet<String> = BTreeSet::new();
    let mut models: BTreeSet<String> = BTreeSet::new();
    for day in contributions {
        for (source_id, source) in &day.sources {
            sources.insert(source_id.clone());
            models.extend(source.models.keys().cloned());
        }
    }

    SubmissionSummary {
        total_tokens,
        total_cost,
        total_days: contributions.len() as u32,
        active_days,
        average_per_day: if active_days > 0 {
            total_cost / active_days as f64
        } else {
            0.0
        },
        max_cost_in_single_day,
        sources: sources.into_iter().collect(),
        models: models.into_iter().collect(),
    }
}

/// Per-year rollup of the given contribution set.
pub fn build_years(contributions: &[DailyAggregate]) -> Vec<YearSummary> {
    let mut years: BTreeMap<String, YearSummary> = BTreeMap::new();
    for day in contributions {
        let year_key = day.date.get(0..4).unwrap_or("").to_string();
        let entry = years.entry(year_key.clone()).or_insert_with(|| YearSummary {
            year: year_key,
            range_start: day.date.clone(),
            range_end: day.date.clone(),
            ..YearSummary::default()
        });
        entry.total_tokens = entry.total_tokens.saturating_add(day.totals.tokens);
        entry.total_cost += day.totals.cost;
        if day.date < entry.range_start {
            entry.range_start = day.date.clone();
        }
        if day.date > entry.range_end {
            entry.range_end = day.date.clone();
        }
    }
    years.into_values().collect()
}

/// Assemble the wire payload for a contribution set. Summary, years, and the
/// meta date range describe only `contributions`; a diff-reduced set produces
/// a payload that is internally consistent without claiming to cover full
/// history.
pub fn build_payload(
    mut contributions: Vec<DailyAggregate>,
    version: &str,
    generated_at: &str,
) -> SubmissionPayload {
    contributions.sort_by(|a, b| a.date.cmp(&b.date));
    let summary = build_summary(&contributions);
    let years = build_years(&contributions);
    let meta = SubmissionMeta {
        generated_at: generated_at.to_string(),
        version: version.to_string(),
        date_range_start: contributions
            .first()
            .map(|day| day.date.clone())
            .unwrap_or_default(),
        date_range_end: contributions
            .last()
            .map(|day| day.date.clone())
            .unwrap_or_default(),
    };
    SubmissionPayload {
        meta,
        summary,
        years,
        contributions,
    }
}
