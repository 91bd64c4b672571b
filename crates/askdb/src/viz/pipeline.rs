use serde_json::{Value, json};

use super::classifier::{ColumnProfile, classify};
use super::renderer::{MalformedChartSpec, render};
use super::selector::{ChartSpec, ChartStrategy, select};
use crate::models::{DisplayArtifact, ResultSet};

pub const PREVIEW_ROWS: usize = 20;

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub preview: DisplayArtifact,
    pub profiles: Vec<ColumnProfile>,
    pub strategy: ChartStrategy,
    pub visual: DisplayArtifact,
    pub render_error: Option<MalformedChartSpec>,
}

impl PipelineOutput {
    #[must_use]
    pub fn ambiguous_columns(&self) -> Vec<&str> {
        self.profiles
            .iter()
            .filter(|profile| profile.ambiguous)
            .map(|profile| profile.name.as_str())
            .collect()
    }

    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "strategy": self.strategy,
            "profiles": self.profiles,
            "preview": self.preview,
            "visual": self.visual,
        })
    }
}

/// classify, select, render. Holds no state between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultPipeline {
    preview_rows: usize,
}

impl Default for ResultPipeline {
    fn default() -> Self {
        Self {
            preview_rows: PREVIEW_ROWS,
        }
    }
}

impl ResultPipeline {
    #[must_use]
    pub fn with_preview_rows(preview_rows: usize) -> Self {
        Self { preview_rows }
    }

    #[must_use]
    pub fn run(&self, result_set: &ResultSet) -> PipelineOutput {
        let preview = DisplayArtifact::table_preview(result_set, self.preview_rows);
        let profiles = classify(result_set);
        let spec = select(&profiles, result_set);

        let (visual, render_error) = visual_for(&spec);

        PipelineOutput {
            preview,
            profiles,
            strategy: spec.strategy,
            visual,
            render_error,
        }
    }
}

/// A spec that fails to render still yields an informational artifact; the
/// error itself is handed back so the caller can report it as a warning.
fn visual_for(spec: &ChartSpec) -> (DisplayArtifact, Option<MalformedChartSpec>) {
    match render(spec) {
        Ok(artifact) => (artifact, None),
        Err(error) => (
            DisplayArtifact::info(format!("chart unavailable: {error}")),
            Some(error),
        ),
    }
}

#[must_use]
pub fn run(result_set: &ResultSet) -> PipelineOutput {
    ResultPipeline::default().run(result_set)
}

#[cfg(test)]
mod tests {
    use super::{PREVIEW_ROWS, ResultPipeline, run, visual_for};
    use crate::models::{CellValue, ChartKind, Column, DisplayArtifact, ResultSet, TextTone};
    use crate::viz::selector::{ChartSpec, ChartStrategy};

    fn wide_result_set(rows: i64) -> ResultSet {
        ResultSet::new(vec![
            Column::new(
                "label",
                None,
                (0..rows)
                    .map(|row| CellValue::Text(format!("item-{row}")))
                    .collect(),
            ),
            Column::new("value", None, (0..rows).map(CellValue::Integer).collect()),
        ])
        .expect("result set should build")
    }

    #[test]
    fn preview_is_capped_at_twenty_rows() {
        let output = run(&wide_result_set(45));
        let DisplayArtifact::Table {
            rows,
            total_rows,
            truncated,
            ..
        } = &output.preview
        else {
            panic!("preview must be a table");
        };
        assert_eq!(rows.len(), PREVIEW_ROWS);
        assert_eq!(*total_rows, 45);
        assert!(truncated);
        assert!(matches!(
            output.visual,
            DisplayArtifact::Chart {
                chart: ChartKind::Bar,
                ..
            }
        ));
    }

    #[test]
    fn preview_rows_are_configurable() {
        let output = ResultPipeline::with_preview_rows(5).run(&wide_result_set(8));
        let DisplayArtifact::Table { rows, .. } = &output.preview else {
            panic!("preview must be a table");
        };
        assert_eq!(rows.len(), 5);
    }

    #[test]
    fn empty_result_still_previews_and_explains() {
        let output = run(&ResultSet::empty());
        assert!(matches!(output.preview, DisplayArtifact::Table { total_rows: 0, .. }));
        assert_eq!(
            output.visual,
            DisplayArtifact::Text {
                tone: TextTone::Info,
                message: "no rows".to_string()
            }
        );
        assert!(output.render_error.is_none());
    }

    #[test]
    fn reports_ambiguous_columns() {
        let result_set = ResultSet::new(vec![Column::new(
            "mixed",
            None,
            vec![CellValue::Integer(1), CellValue::Text("one".to_string())],
        )])
        .expect("result set should build");
        let output = run(&result_set);
        assert_eq!(output.ambiguous_columns(), vec!["mixed"]);
        assert_eq!(output.strategy.name(), "none");
    }

    #[test]
    fn render_failures_become_informational_text() {
        let spec = ChartSpec {
            strategy: ChartStrategy::Histogram {
                value: "revenue".to_string(),
            },
            data: wide_result_set(3),
        };

        let (visual, error) = visual_for(&spec);
        let error = error.expect("missing column must be reported");
        assert_eq!(error.column, "revenue");
        let DisplayArtifact::Text { tone, message } = visual else {
            panic!("render failure must fall back to text");
        };
        assert_eq!(tone, TextTone::Info);
        assert!(message.starts_with("chart unavailable: malformed histogram chart spec"));
    }
}
