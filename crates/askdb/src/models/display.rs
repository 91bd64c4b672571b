use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::result_set::ResultSet;

pub const DISPLAY_ARTIFACT_SCHEMA_VERSION: &str = "askdb.display-artifact.v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Bubble,
    Scatter,
    TimeSeries,
    Bar,
    Histogram,
}

impl ChartKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bubble => "bubble",
            Self::Scatter => "scatter",
            Self::TimeSeries => "time_series",
            Self::Bar => "bar",
            Self::Histogram => "histogram",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TextTone {
    Info,
    Error,
}

/// Renderer-agnostic output. A sink can show any variant without knowing
/// which query or chart rule produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DisplayArtifact {
    Table {
        columns: Vec<String>,
        rows: Vec<Value>,
        total_rows: usize,
        truncated: bool,
    },
    Chart {
        chart: ChartKind,
        spec: Value,
    },
    Text {
        tone: TextTone,
        message: String,
    },
}

impl DisplayArtifact {
    #[must_use]
    pub fn table_preview(result_set: &ResultSet, limit: usize) -> Self {
        let preview = result_set.head(limit);
        Self::Table {
            columns: result_set.column_names(),
            rows: preview.row_objects(),
            total_rows: result_set.row_count(),
            truncated: result_set.row_count() > preview.row_count(),
        }
    }

    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self::Text {
            tone: TextTone::Info,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Text {
            tone: TextTone::Error,
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Table { .. } => "table",
            Self::Chart { .. } => "chart",
            Self::Text { .. } => "text",
        }
    }
}

#[must_use]
pub fn json_schema() -> Value {
    let schema = schemars::schema_for!(DisplayArtifact);
    match serde_json::to_value(schema) {
        Ok(value) => value,
        Err(error) => {
            panic!("failed to serialize generated display artifact schema: {error}");
        }
    }
}
