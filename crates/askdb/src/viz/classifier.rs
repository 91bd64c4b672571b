use std::cell::OnceCell;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::models::{CellValue, Column, ResultSet, SemanticType};
use crate::utils::time::parse_temporal_text;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub name: String,
    pub index: usize,
    pub semantic_type: SemanticType,

    /// Values disagreed about their type; the column fell back to categorical.
    pub ambiguous: bool,

    #[serde(skip)]
    cardinality: OnceCell<usize>,
}

impl PartialEq for ColumnProfile {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.index == other.index
            && self.semantic_type == other.semantic_type
            && self.ambiguous == other.ambiguous
    }
}

impl ColumnProfile {
    #[must_use]
    pub fn is(&self, semantic_type: SemanticType) -> bool {
        self.semantic_type == semantic_type
    }

    /// Distinct non-null value count for categorical columns, computed on
    /// first use. `result_set` must be the one the profile was built from.
    #[must_use]
    pub fn cardinality(&self, result_set: &ResultSet) -> Option<usize> {
        if self.semantic_type != SemanticType::Categorical {
            return None;
        }
        let column = result_set.columns().get(self.index)?;
        Some(*self.cardinality.get_or_init(|| distinct_count(column)))
    }
}

#[must_use]
pub fn classify(result_set: &ResultSet) -> Vec<ColumnProfile> {
    result_set
        .columns()
        .iter()
        .enumerate()
        .map(|(index, column)| {
            let (semantic_type, ambiguous) = classify_column(column);
            ColumnProfile {
                name: column.name.clone(),
                index,
                semantic_type,
                ambiguous,
                cardinality: OnceCell::new(),
            }
        })
        .collect()
}

fn classify_column(column: &Column) -> (SemanticType, bool) {
    let observed = column
        .values
        .iter()
        .filter_map(observe_value)
        .collect::<BTreeSet<_>>();

    let mut kinds = observed.into_iter();
    match (kinds.next(), kinds.next()) {
        (None, _) => (
            column.declared_type.unwrap_or(SemanticType::Categorical),
            false,
        ),
        (Some(only), None) => (only, false),
        (Some(_), Some(_)) => (SemanticType::Categorical, true),
    }
}

fn observe_value(value: &CellValue) -> Option<SemanticType> {
    match value {
        CellValue::Null => None,
        CellValue::Integer(_) | CellValue::Real(_) => Some(SemanticType::Numeric),
        CellValue::Date(_) | CellValue::DateTime(_) => Some(SemanticType::Temporal),
        CellValue::Text(text) if parse_temporal_text(text).is_some() => {
            Some(SemanticType::Temporal)
        }
        CellValue::Text(_) | CellValue::Boolean(_) => Some(SemanticType::Categorical),
    }
}

fn distinct_count(column: &Column) -> usize {
    column
        .values
        .iter()
        .filter(|value| !value.is_null())
        .map(CellValue::distinct_key)
        .collect::<BTreeSet<_>>()
        .len()
}
