use anyhow::Result;

use super::NarrativeSummarizer;
use crate::models::{ResultSet, SemanticType};
use crate::viz::ColumnProfile;

/// Deterministic narrative built from column profiles alone. Needs no model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProfileSummarizer;

impl NarrativeSummarizer for ProfileSummarizer {
    fn summarize(
        &self,
        question: &str,
        _sql: Option<&str>,
        result_set: &ResultSet,
        profiles: &[ColumnProfile],
    ) -> Result<String> {
        let question = question.trim();
        if result_set.is_empty() {
            return Ok(format!("No rows matched \"{question}\"."));
        }

        let mut lines = vec![format!(
            "{} {} returned for \"{question}\".",
            result_set.row_count(),
            if result_set.row_count() == 1 { "row" } else { "rows" }
        )];

        for profile in profiles {
            let Some(column) = result_set.columns().get(profile.index) else {
                continue;
            };
            let line = match profile.semantic_type {
                SemanticType::Numeric => {
                    let numbers = column
                        .values
                        .iter()
                        .filter_map(|value| value.as_f64())
                        .filter(|value| value.is_finite())
                        .collect::<Vec<_>>();
                    numeric_line(&profile.name, &numbers)
                }
                SemanticType::Temporal => {
                    let mut stamps = column
                        .values
                        .iter()
                        .filter(|value| !value.is_null())
                        .filter_map(|value| value.to_json().as_str().map(str::to_string))
                        .collect::<Vec<_>>();
                    stamps.sort();
                    match (stamps.first(), stamps.last()) {
                        (Some(first), Some(last)) => {
                            Some(format!("{}: from {first} to {last}", profile.name))
                        }
                        _ => None,
                    }
                }
                SemanticType::Categorical => profile.cardinality(result_set).map(|distinct| {
                    let suffix = if profile.ambiguous { " (mixed types)" } else { "" };
                    format!(
                        "{}: {distinct} distinct {}{suffix}",
                        profile.name,
                        if distinct == 1 { "value" } else { "values" }
                    )
                }),
            };
            lines.extend(line.map(|line| format!("- {line}")));
        }

        Ok(lines.join("\n"))
    }
}

fn numeric_line(name: &str, numbers: &[f64]) -> Option<String> {
    let first = *numbers.first()?;
    let (min, max, sum) = numbers
        .iter()
        .fold((first, first, 0.0), |(min, max, sum), value| {
            (min.min(*value), max.max(*value), sum + value)
        });
    let mean = sum / numbers.len() as f64;
    Some(format!(
        "{name}: min {}, max {}, mean {}",
        format_number(min),
        format_number(max),
        format_number(mean)
    ))
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}
