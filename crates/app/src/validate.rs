use chrono::NaiveDate;

use usagegraph_core::{DailyAggregate, SourceBreakdown, SubmissionPayload};

/// Cost sums are compared at this tolerance; token counts must match exactly.
const COST_TOLERANCE: f64 = 1e-6;

/// Check shape and value ranges of an incoming payload. Returns every
/// problem found, not just the first; an empty list means the payload is
/// acceptable.
pub fn validate_payload(payload: &SubmissionPayload) -> Vec<String> {
    let mut errors = Vec::new();

    if payload.contributions.is_empty() {
        errors.push("contributions must not be empty".to_string());
        return errors;
    }

    let mut seen_dates: Vec<&str> = Vec::new();
    for day in &payload.contributions {
        if NaiveDate::parse_from_str(&day.date, "%Y-%m-%d").is_err() {
            errors.push(format!("contribution date {:?} is not YYYY-MM-DD", day.date));
        }
        if seen_dates.contains(&day.date.as_str()) {
            errors.push(format!("duplicate contribution date {}", day.date));
        }
        seen_dates.push(day.date.as_str());
        validate_day(day, &mut errors);
    }

    let summary_tokens: u64 = payload
        .contributions
        .iter()
        .map(|day| day.totals.tokens)
        .sum();
    let summary_cost: f64 = payload.contributions.iter().map(|day| day.totals.cost).sum();
    if payload.summary.total_tokens != summary_tokens {
        errors.push(format!(
            "summary totalTokens {} does not match contributions sum {}",
            payload.summary.total_tokens, summary_tokens
        ));
    }
    if (payload.summary.total_cost - summary_cost).abs() > COST_TOLERANCE {
        errors.push(format!(
            "summary totalCost {} does not match contributions sum {}",
            payload.summary.total_cost, summary_cost
        ));
    }

    errors
}

fn validate_day(day: &DailyAggregate, errors: &mut Vec<String>) {
    if !day.totals.cost.is_finite() || day.totals.cost < 0.0 {
        errors.push(format!("{}: day cost must be finite and non-negative", day.date));
    }
    if day.sources.is_empty() {
        errors.push(format!("{}: day has no sources", day.date));
        return;
    }

    let mut source_tokens = 0u64;
    let mut source_cost = 0f64;
    let mut source_messages = 0u64;
    for (source_id, source) in &day.sources {
        validate_source(&day.date, source_id, source, errors);
        source_tokens = source_tokens.saturating_add(source.tokens);
        source_cost += source.cost;
        source_messages = source_messages.saturating_add(source.messages);
    }
    if day.totals.tokens != source_tokens {
        errors.push(format!(
            "{}: day tokens {} do not match source sum {}",
            day.date, day.totals.tokens, source_tokens
        ));
    }
    if day.totals.cost.is_finite() && (day.totals.cost - source_cost).abs() > COST_TOLERANCE {
        errors.push(format!(
            "{}: day cost {} does not match source sum {}",
            day.date, day.totals.cost, source_cost
        ));
    }
    if day.totals.messages != source_messages {
        errors.push(format!(
            "{}: day messages {} do not match source sum {}",
            day.date, day.totals.messages, source_messages
        ));
    }
}

fn validate_source(date: &str, source_id: &str, source: &SourceBreakdown, errors: &mut Vec<String>) {
    if !source.cost.is_finite() || source.cost < 0.0 {
        errors.push(format!(
            "{}/{}: source cost must be finite and non-negative",
            date, source_id
        ));
        return;
    }

    let mut model_tokens = 0u64;
    let mut model_cost = 0f64;
    for (model_id, model) in &source.models {
        if !model.cost.is_finite() || model.cost < 0.0 {
            errors.push(format!(
                "{}/{}/{}: model cost must be finite and non-negative",
                date, source_id, model_id
            ));
        }
        model_tokens = model_tokens.saturating_add(model.tokens);
        model_cost += model.cost;
    }
    if !source.models.is_empty() {
        if source.tokens != model_tokens {
            errors.push(format!(
                "{}/{}: source tokens {} do not match model sum {}",
                date, source_id, source.tokens, model_tokens
            ));
        }
        if (source.cost - model_cost).abs() > COST_TOLERANCE {
            errors.push(format!(
                "{}/{}: source cost {} does not match model sum {}",
                date, source_id, source.cost, model_cost
            ));
        }
    }
}

/// Non-fatal observations about an otherwise acceptable payload.
pub fn payload_warnings(payload: &SubmissionPayload, today: NaiveDate) -> Vec<String> {
    let mut warnings = Vec::new();
    for day in &payload.contributions {
        if let Ok(date) = NaiveDate::parse_from_str(&day.date, "%Y-%m-%d") {
            if date > today {
                warnings.push(format!("contribution for {} is dated in the future", day.date));
            }
        }
        for (source_id, source) in &day.sources {
            if source.models.is_empty() {
                warnings.push(format!(
                    "{}/{}: source has no model breakdown",
                    day.date, source_id
                ));
            }
        }
    }
    warnings
}
