//! Chart specs to Vega-Lite shaped descriptions.
//!
//! The renderer only binds columns to channels. Axis formatting, themes and
//! sizing are left to whatever sink finally draws the chart.

use std::fmt::{Display, Formatter};

use serde_json::{Map, Value, json};

use super::selector::{ChartSpec, ChartStrategy, ColorEncoding, TooltipField};
use crate::models::{ChartKind, DisplayArtifact, SemanticType};

pub const VEGA_LITE_SCHEMA_URL: &str = "https://vega.github.io/schema/vega-lite/v5.json";

/// Largest bubble marker diameter in pixels.
pub const BUBBLE_MAX_MARKER_SIZE: u32 = 60;

const SMALL_PALETTE_LIMIT: usize = 10;
const LARGE_PALETTE_LIMIT: usize = 20;

/// A chart spec referenced a column its data slice does not carry. This is
/// a selector defect rather than bad input, so it is never retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedChartSpec {
    pub chart: ChartKind,
    pub column: String,
}

impl Display for MalformedChartSpec {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "malformed {} chart spec: column `{}` is not present in the chart data",
            self.chart.as_str(),
            self.column
        )
    }
}

impl std::error::Error for MalformedChartSpec {}

pub fn render(spec: &ChartSpec) -> Result<DisplayArtifact, MalformedChartSpec> {
    let Some(chart) = spec.strategy.kind() else {
        return Ok(DisplayArtifact::info(describe(&spec.strategy)));
    };

    if let Some(missing) = spec
        .strategy
        .referenced_columns()
        .into_iter()
        .find(|name| spec.data.column(name).is_none())
    {
        return Err(MalformedChartSpec {
            chart,
            column: missing.to_string(),
        });
    }

    let (mark, encoding) = match &spec.strategy {
        ChartStrategy::Bubble {
            x,
            y,
            size,
            color,
            tooltip,
        } => bubble_encoding(x, y, size, color.as_ref(), tooltip),
        ChartStrategy::Scatter { x, y } => (
            json!({"type": "point"}),
            json!({
                "x": channel(x, SemanticType::Numeric),
                "y": channel(y, SemanticType::Numeric),
            }),
        ),
        ChartStrategy::TimeSeries { time, value } => (
            json!({"type": "line", "point": true}),
            json!({
                "x": channel(time, SemanticType::Temporal),
                "y": channel(value, SemanticType::Numeric),
                // keep the row order the query produced
                "order": {"value": null},
            }),
        ),
        ChartStrategy::Bar { category, value } => {
            let mut x = channel(category, SemanticType::Categorical);
            x.insert("sort".to_string(), Value::Null);
            (
                json!({"type": "bar"}),
                json!({
                    "x": x,
                    "y": channel(value, SemanticType::Numeric),
                }),
            )
        }
        ChartStrategy::Histogram { value } => {
            let mut x = channel(value, SemanticType::Numeric);
            x.insert("bin".to_string(), json!(true));
            (
                json!({"type": "bar"}),
                json!({
                    "x": x,
                    "y": {"aggregate": "count", "type": "quantitative", "title": "count"},
                }),
            )
        }
        ChartStrategy::None { .. } => return Ok(DisplayArtifact::info(describe(&spec.strategy))),
    };

    Ok(DisplayArtifact::Chart {
        chart,
        spec: json!({
            "$schema": VEGA_LITE_SCHEMA_URL,
            "description": describe(&spec.strategy),
            "data": {"values": spec.data.row_objects()},
            "mark": mark,
            "encoding": encoding,
        }),
    })
}

fn bubble_encoding(
    x: &str,
    y: &str,
    size: &str,
    color: Option<&ColorEncoding>,
    tooltip: &[TooltipField],
) -> (Value, Value) {
    let max_area = BUBBLE_MAX_MARKER_SIZE * BUBBLE_MAX_MARKER_SIZE;
    let mut size_channel = channel(size, SemanticType::Numeric);
    size_channel.insert("scale".to_string(), json!({"range": [0, max_area]}));

    let mut encoding = Map::new();
    encoding.insert("x".to_string(), Value::Object(channel(x, SemanticType::Numeric)));
    encoding.insert("y".to_string(), Value::Object(channel(y, SemanticType::Numeric)));
    encoding.insert("size".to_string(), Value::Object(size_channel));
    if let Some(color) = color {
        encoding.insert("color".to_string(), Value::Object(color_channel(color)));
    }
    encoding.insert(
        "tooltip".to_string(),
        Value::Array(
            tooltip
                .iter()
                .map(|field| Value::Object(channel(&field.column, field.semantic_type)))
                .collect(),
        ),
    );

    (
        json!({"type": "point", "filled": true, "opacity": 0.7}),
        Value::Object(encoding),
    )
}

fn color_channel(color: &ColorEncoding) -> Map<String, Value> {
    let mut channel = channel(&color.column, SemanticType::Categorical);
    let scheme = if color.cardinality <= SMALL_PALETTE_LIMIT {
        "category10"
    } else {
        "category20"
    };
    channel.insert("scale".to_string(), json!({"scheme": scheme}));
    if color.cardinality > LARGE_PALETTE_LIMIT {
        channel.insert("legend".to_string(), Value::Null);
    }
    channel
}

fn channel(column: &str, semantic_type: SemanticType) -> Map<String, Value> {
    let mut channel = Map::new();
    channel.insert("field".to_string(), json!(field_ref(column)));
    channel.insert("type".to_string(), json!(measure_type(semantic_type)));
    channel.insert("title".to_string(), json!(column));
    channel
}

const fn measure_type(semantic_type: SemanticType) -> &'static str {
    match semantic_type {
        SemanticType::Numeric => "quantitative",
        SemanticType::Temporal => "temporal",
        SemanticType::Categorical => "nominal",
    }
}

/// Vega-Lite reads `.` and `[]` in field names as nested access.
fn field_ref(column: &str) -> String {
    let mut escaped = String::with_capacity(column.len());
    for ch in column.chars() {
        if matches!(ch, '.' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn describe(strategy: &ChartStrategy) -> String {
    match strategy {
        ChartStrategy::Bubble { x, y, size, .. } => {
            format!("{y} against {x}, sized by {size}")
        }
        ChartStrategy::Scatter { x, y } => format!("{y} against {x}"),
        ChartStrategy::TimeSeries { time, value } => format!("{value} over {time}"),
        ChartStrategy::Bar { category, value } => format!("{value} by {category}"),
        ChartStrategy::Histogram { value } => format!("distribution of {value}"),
        ChartStrategy::None { reason } => reason.clone(),
    }
}
