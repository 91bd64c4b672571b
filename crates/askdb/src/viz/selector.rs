use serde::{Deserialize, Serialize};

use super::classifier::ColumnProfile;
use crate::models::{ChartKind, ResultSet, SemanticType};

pub const NO_ROWS_REASON: &str = "no rows";
pub const NO_SUITABLE_DATA_REASON: &str = "no suitable data for an automatic chart";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorEncoding {
    pub column: String,
    pub cardinality: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TooltipField {
    pub column: String,
    pub semantic_type: SemanticType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum ChartStrategy {
    Bubble {
        x: String,
        y: String,
        size: String,
        color: Option<ColorEncoding>,
        tooltip: Vec<TooltipField>,
    },
    Scatter {
        x: String,
        y: String,
    },
    TimeSeries {
        time: String,
        value: String,
    },
    Bar {
        category: String,
        value: String,
    },
    Histogram {
        value: String,
    },
    None {
        reason: String,
    },
}

impl ChartStrategy {
    #[must_use]
    pub const fn kind(&self) -> Option<ChartKind> {
        match self {
            Self::Bubble { .. } => Some(ChartKind::Bubble),
            Self::Scatter { .. } => Some(ChartKind::Scatter),
            Self::TimeSeries { .. } => Some(ChartKind::TimeSeries),
            Self::Bar { .. } => Some(ChartKind::Bar),
            Self::Histogram { .. } => Some(ChartKind::Histogram),
            Self::None { .. } => None,
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self.kind() {
            Some(kind) => kind.as_str(),
            None => "none",
        }
    }

    /// Columns the chart needs in its data slice, in encoding order.
    #[must_use]
    pub fn referenced_columns(&self) -> Vec<&str> {
        match self {
            Self::Bubble {
                x,
                y,
                size,
                color,
                tooltip,
            } => {
                let mut columns = vec![x.as_str(), y.as_str(), size.as_str()];
                columns.extend(color.as_ref().map(|color| color.column.as_str()));
                columns.extend(tooltip.iter().map(|field| field.column.as_str()));
                columns
            }
            Self::Scatter { x, y } => vec![x.as_str(), y.as_str()],
            Self::TimeSeries { time, value } => vec![time.as_str(), value.as_str()],
            Self::Bar { category, value } => vec![category.as_str(), value.as_str()],
            Self::Histogram { value } => vec![value.as_str()],
            Self::None { .. } => Vec::new(),
        }
    }
}

/// The chosen strategy plus the slice of the result set needed to draw it.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub strategy: ChartStrategy,
    pub data: ResultSet,
}

impl ChartSpec {
    #[must_use]
    pub fn none(reason: impl Into<String>) -> Self {
        Self {
            strategy: ChartStrategy::None {
                reason: reason.into(),
            },
            data: ResultSet::empty(),
        }
    }

    fn with_data(strategy: ChartStrategy, result_set: &ResultSet) -> Self {
        let data = result_set.select_columns(&strategy.referenced_columns());
        Self { strategy, data }
    }
}

/// Picks exactly one chart strategy. Rules are tried in order and the first
/// match wins:
///
/// 1. no rows: none
/// 2. three or more numeric columns: bubble
/// 3. two or more numeric columns and no temporal column: scatter
/// 4. a numeric and a temporal column: time series
/// 5. one numeric column out of two: bar
/// 6. one numeric column: histogram
/// 7. otherwise none
///
/// The temporal guard on rule 3 is what hands "two numeric plus a temporal"
/// to rule 4.
#[must_use]
pub fn select(profiles: &[ColumnProfile], result_set: &ResultSet) -> ChartSpec {
    if result_set.is_empty() {
        return ChartSpec::none(NO_ROWS_REASON);
    }

    let numeric = of_type(profiles, SemanticType::Numeric);
    let temporal = of_type(profiles, SemanticType::Temporal);
    let categorical = of_type(profiles, SemanticType::Categorical);

    let strategy = if let [x, y, size, ..] = numeric.as_slice() {
        ChartStrategy::Bubble {
            x: x.name.clone(),
            y: y.name.clone(),
            size: size.name.clone(),
            color: categorical.first().map(|profile| ColorEncoding {
                column: profile.name.clone(),
                cardinality: profile.cardinality(result_set).unwrap_or(0),
            }),
            tooltip: profiles
                .iter()
                .map(|profile| TooltipField {
                    column: profile.name.clone(),
                    semantic_type: profile.semantic_type,
                })
                .collect(),
        }
    } else if let ([x, y, ..], []) = (numeric.as_slice(), temporal.as_slice()) {
        ChartStrategy::Scatter {
            x: x.name.clone(),
            y: y.name.clone(),
        }
    } else if let (Some(value), Some(time)) = (numeric.first(), temporal.first()) {
        ChartStrategy::TimeSeries {
            time: time.name.clone(),
            value: value.name.clone(),
        }
    } else if let [value] = numeric.as_slice() {
        match profiles {
            [_, _] => {
                let category = profiles
                    .iter()
                    .find(|profile| !profile.is(SemanticType::Numeric))
                    .map_or_else(String::new, |profile| profile.name.clone());
                ChartStrategy::Bar {
                    category,
                    value: value.name.clone(),
                }
            }
            _ => ChartStrategy::Histogram {
                value: value.name.clone(),
            },
        }
    } else {
        return ChartSpec::none(NO_SUITABLE_DATA_REASON);
    };

    ChartSpec::with_data(strategy, result_set)
}

fn of_type(profiles: &[ColumnProfile], semantic_type: SemanticType) -> Vec<&ColumnProfile> {
    profiles
        .iter()
        .filter(|profile| profile.is(semantic_type))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{ChartStrategy, NO_ROWS_REASON, NO_SUITABLE_DATA_REASON, select};
    use crate::models::{CellValue, Column, ResultSet, SemanticType};
    use crate::viz::classifier::classify;

    fn numbers(name: &str) -> Column {
        Column::new(
            name,
            None,
            vec![CellValue::Integer(1), CellValue::Real(2.0)],
        )
    }

    fn dates(name: &str) -> Column {
        Column::new(
            name,
            None,
            vec![
                CellValue::Text("2024-01-01".to_string()),
                CellValue::Text("2024-01-02".to_string()),
            ],
        )
    }

    fn labels(name: &str) -> Column {
        Column::new(
            name,
            None,
            vec![
                CellValue::Text("north".to_string()),
                CellValue::Text("south".to_string()),
            ],
        )
    }

    fn choose(columns: Vec<Column>) -> ChartStrategy {
        let result_set = ResultSet::new(columns).expect("result set should build");
        select(&classify(&result_set), &result_set).strategy
    }

    #[test]
    fn two_numeric_and_temporal_is_a_time_series_not_a_scatter() {
        assert_eq!(
            choose(vec![numbers("a"), numbers("b"), dates("t")]),
            ChartStrategy::TimeSeries {
                time: "t".to_string(),
                value: "a".to_string(),
            }
        );
    }

    #[test]
    fn three_numeric_wins_over_temporal() {
        let strategy = choose(vec![dates("t"), numbers("a"), numbers("b"), numbers("c")]);
        let ChartStrategy::Bubble {
            x,
            y,
            size,
            color,
            tooltip,
        } = strategy
        else {
            panic!("expected bubble, got {strategy:?}");
        };
        assert_eq!((x.as_str(), y.as_str(), size.as_str()), ("a", "b", "c"));
        assert!(color.is_none());
        assert_eq!(tooltip.len(), 4);
        assert_eq!(tooltip[0].semantic_type, SemanticType::Temporal);
    }

    #[test]
    fn bubble_color_carries_categorical_cardinality() {
        let strategy = choose(vec![
            labels("region"),
            numbers("a"),
            numbers("b"),
            numbers("c"),
            labels("segment"),
        ]);
        let ChartStrategy::Bubble { color, .. } = strategy else {
            panic!("expected bubble");
        };
        let color = color.expect("first categorical column should color the bubbles");
        assert_eq!(color.column, "region");
        assert_eq!(color.cardinality, 2);
    }

    #[test]
    fn lone_numeric_with_lone_temporal_prefers_time_series_over_bar() {
        assert_eq!(
            choose(vec![dates("day"), numbers("total")]),
            ChartStrategy::TimeSeries {
                time: "day".to_string(),
                value: "total".to_string(),
            }
        );
    }

    #[test]
    fn one_numeric_with_two_labels_is_a_histogram() {
        assert_eq!(
            choose(vec![labels("a"), labels("b"), numbers("n")]),
            ChartStrategy::Histogram {
                value: "n".to_string()
            }
        );
    }

    #[test]
    fn lone_numeric_column_is_a_histogram() {
        assert_eq!(
            choose(vec![numbers("n")]),
            ChartStrategy::Histogram {
                value: "n".to_string()
            }
        );
    }

    #[test]
    fn no_numeric_columns_yield_none() {
        assert_eq!(
            choose(vec![labels("a"), dates("t")]),
            ChartStrategy::None {
                reason: NO_SUITABLE_DATA_REASON.to_string()
            }
        );
    }

    #[test]
    fn zero_rows_yield_none_even_with_numeric_columns() {
        let result_set = ResultSet::new(vec![
            Column::new("a", Some(SemanticType::Numeric), Vec::new()),
            Column::new("b", Some(SemanticType::Numeric), Vec::new()),
        ])
        .expect("result set should build");
        let spec = select(&classify(&result_set), &result_set);
        assert_eq!(
            spec.strategy,
            ChartStrategy::None {
                reason: NO_ROWS_REASON.to_string()
            }
        );
        assert!(spec.data.columns().is_empty());
    }

    #[test]
    fn data_slice_keeps_only_referenced_columns() {
        let result_set = ResultSet::new(vec![labels("region"), numbers("x"), numbers("y")])
            .expect("result set should build");
        let spec = select(&classify(&result_set), &result_set);
        assert_eq!(spec.strategy.name(), "scatter");
        assert_eq!(spec.data.column_names(), vec!["x", "y"]);
        assert_eq!(spec.data.row_count(), 2);
    }
}
