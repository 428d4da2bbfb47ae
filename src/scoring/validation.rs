use std::collections::HashSet;

use super::config::{FieldKind, ScoreField, ScoringConfig, TierConfig};
use super::model::{AI_TOOLS, LIKERT5};

/// Validate scoring configuration at startup.
/// Returns all validation errors at once (not just the first).
pub fn validate_scoring(config: &ScoringConfig) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    match &config.fields {
        Some(fields) => validate_fields(fields, &mut errors),
        None => {
            if let Some(ref preset) = config.preset {
                if preset != LIKERT5 && preset != AI_TOOLS {
                    errors.push(format!(
                        "scoring.preset: unknown preset '{}' (expected '{}' or '{}')",
                        preset, LIKERT5, AI_TOOLS
                    ));
                }
            }
        }
    }

    if let Some(ref tiers) = config.tiers {
        validate_tiers(tiers, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_fields(fields: &[ScoreField], errors: &mut Vec<String>) {
    if fields.is_empty() {
        errors.push("scoring.fields: at least one field is required".to_string());
        return;
    }

    let mut seen = HashSet::new();
    for (i, field) in fields.iter().enumerate() {
        let at = format!("scoring.fields[{}]", i);

        if field.name.is_empty() {
            errors.push(format!("{}.name: must not be empty", at));
        } else if !field
            .name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            errors.push(format!(
                "{}.name: '{}' may only contain letters, digits, '_' and '-'",
                at, field.name
            ));
        }
        if !seen.insert(field.name.as_str()) {
            errors.push(format!("{}.name: duplicate field '{}'", at, field.name));
        }

        if field.min > field.max {
            errors.push(format!(
                "{}: min {} is greater than max {}",
                at, field.min, field.max
            ));
            continue;
        }

        let Some(levels) = field
            .max
            .checked_sub(field.min)
            .and_then(|span| span.checked_add(1))
            .and_then(|n| usize::try_from(n).ok())
        else {
            errors.push(format!(
                "{}: range {}-{} is too wide",
                at, field.min, field.max
            ));
            continue;
        };
        match field.kind {
            FieldKind::Boolean => {
                if field.min != 0 || field.max != 1 {
                    errors.push(format!("{}: boolean fields must range 0-1", at));
                }
                if field.in_total == Some(true) {
                    errors.push(format!(
                        "{}.in_total: boolean fields are reported as percentages, not summed",
                        at
                    ));
                }
            }
            FieldKind::Categorical if field.labels.is_empty() => {
                errors.push(format!("{}.labels: categorical fields need labels", at));
            }
            _ => {}
        }
        if !field.labels.is_empty() && field.labels.len() != levels {
            errors.push(format!(
                "{}.labels: {} labels for {} values ({}-{})",
                at,
                field.labels.len(),
                levels,
                field.min,
                field.max
            ));
        }
    }

    let mut totalled = fields.iter().filter(|f| f.counts_toward_total());
    match totalled.next() {
        None => errors.push("scoring.fields: at least one field must count toward the total".to_string()),
        Some(first) => {
            if let Some(other) = totalled.find(|f| (f.min, f.max) != (first.min, first.max)) {
                errors.push(format!(
                    "scoring.fields: fields counted in the total must share one scale, \
                     '{}' is {}-{} but '{}' is {}-{}",
                    first.name, first.min, first.max, other.name, other.min, other.max
                ));
            }
        }
    }

    let bounds = fields
        .iter()
        .filter(|f| f.counts_toward_total())
        .try_fold((0i64, 0i64), |(lo, hi), f| {
            Some((lo.checked_add(f.min)?, hi.checked_add(f.max)?))
        });
    if bounds.is_none() {
        errors.push("scoring.fields: total score range overflows".to_string());
    }
}

fn validate_tiers(tiers: &TierConfig, errors: &mut Vec<String>) {
    let values = [
        ("agentic_ace", tiers.agentic_ace),
        ("cognitive_crafter", tiers.cognitive_crafter),
        ("neural_novice", tiers.neural_novice),
    ];
    for (name, value) in values {
        if !value.is_finite() {
            errors.push(format!("scoring.tiers.{}: must be a finite number", name));
        }
    }
    if !(tiers.agentic_ace > tiers.cognitive_crafter && tiers.cognitive_crafter > tiers.neural_novice)
    {
        errors.push(
            "scoring.tiers: thresholds must decrease strictly from agentic_ace to neural_novice"
                .to_string(),
        );
    }
}
