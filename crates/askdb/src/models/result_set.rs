use std::collections::BTreeSet;

use anyhow::{Context, Result, bail};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use time::{Date, OffsetDateTime};

use crate::utils::time::{format_date, format_datetime};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum SemanticType {
    Numeric,
    Temporal,
    Categorical,
}

impl SemanticType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Numeric => "numeric",
            Self::Temporal => "temporal",
            Self::Categorical => "categorical",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    Text(String),
    Date(Date),
    DateTime(OffsetDateTime),
}

impl CellValue {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(value) => Some(*value as f64),
            Self::Real(value) => Some(*value),
            _ => None,
        }
    }

    /// Temporal cells become ISO-8601 strings; non-finite reals become null.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Boolean(flag) => json!(flag),
            Self::Integer(value) => json!(value),
            Self::Real(value) => json!(value),
            Self::Text(text) => json!(text),
            Self::Date(date) => json!(format_date(*date)),
            Self::DateTime(value) => json!(format_datetime(*value)),
        }
    }

    pub fn from_json(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(Self::Null),
            Value::Bool(flag) => Ok(Self::Boolean(*flag)),
            Value::Number(number) => {
                if let Some(integer) = number.as_i64() {
                    Ok(Self::Integer(integer))
                } else if let Some(real) = number.as_f64() {
                    Ok(Self::Real(real))
                } else {
                    bail!("unsupported numeric cell value: {number}")
                }
            }
            Value::String(text) => Ok(Self::Text(text.clone())),
            Value::Array(_) | Value::Object(_) => bail!("cell values must be scalar JSON values"),
        }
    }

    /// Stable key used for distinct-value counting.
    #[must_use]
    pub fn distinct_key(&self) -> String {
        match self {
            Self::Text(text) => format!("s:{text}"),
            other => format!("v:{}", other.to_json()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub declared_type: Option<SemanticType>,
    pub values: Vec<CellValue>,
}

impl Column {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        declared_type: Option<SemanticType>,
        values: Vec<CellValue>,
    ) -> Self {
        Self {
            name: name.into(),
            declared_type,
            values,
        }
    }
}

/// Tabular query output. Construction checks that column names are unique
/// and every column carries the same number of rows; the value is immutable
/// afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet {
    columns: Vec<Column>,
    row_count: usize,
}

impl ResultSet {
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let mut seen = BTreeSet::new();
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                bail!("duplicate column name `{}` in result set", column.name);
            }
        }

        let row_count = columns.first().map_or(0, |column| column.values.len());
        if let Some(mismatch) = columns
            .iter()
            .find(|column| column.values.len() != row_count)
        {
            bail!(
                "column `{}` has {} rows but `{}` has {row_count}",
                mismatch.name,
                mismatch.values.len(),
                columns[0].name
            );
        }

        Ok(Self { columns, row_count })
    }

    #[must_use]
    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            row_count: 0,
        }
    }

    #[must_use]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|column| column.name.clone()).collect()
    }

    #[must_use]
    pub const fn row_count(&self) -> usize {
        self.row_count
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.row_count == 0
    }

    #[must_use]
    pub fn head(&self, limit: usize) -> Self {
        let row_count = self.row_count.min(limit);
        Self {
            columns: self
                .columns
                .iter()
                .map(|column| Column {
                    name: column.name.clone(),
                    declared_type: column.declared_type,
                    values: column.values[..row_count].to_vec(),
                })
                .collect(),
            row_count,
        }
    }

    /// Keeps the named columns that exist, in the order given. Names that
    /// are absent or repeated are skipped, so callers that need every name
    /// present must check the result.
    #[must_use]
    pub fn select_columns(&self, names: &[&str]) -> Self {
        let mut kept = BTreeSet::new();
        let columns = names
            .iter()
            .filter(|name| kept.insert(**name))
            .filter_map(|name| self.column(name).cloned())
            .collect::<Vec<_>>();
        let row_count = if columns.is_empty() { 0 } else { self.row_count };
        Self { columns, row_count }
    }

    #[must_use]
    pub fn row_objects(&self) -> Vec<Value> {
        (0..self.row_count)
            .map(|row| {
                let mut record = Map::new();
                for column in &self.columns {
                    record.insert(column.name.clone(), column.values[row].to_json());
                }
                Value::Object(record)
            })
            .collect()
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let document: ResultSetDocument =
            serde_json::from_str(raw).context("result set document must be valid JSON")?;
        document.into_result_set()
    }

    #[must_use]
    pub fn to_json_document(&self) -> Value {
        json!({
            "columns": self
                .columns
                .iter()
                .map(|column| {
                    json!({
                        "name": column.name,
                        "type": column.declared_type,
                        "values": column.values.iter().map(CellValue::to_json).collect::<Vec<_>>(),
                    })
                })
                .collect::<Vec<_>>(),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ResultSetDocument {
    Columnar {
        columns: Vec<ColumnDocument>,
    },
    RowWise {
        columns: Vec<String>,
        rows: Vec<Vec<Value>>,
    },
}

#[derive(Debug, Deserialize)]
struct ColumnDocument {
    name: String,

    #[serde(default, rename = "type")]
    declared_type: Option<SemanticType>,

    #[serde(default)]
    values: Vec<Value>,
}

impl ResultSetDocument {
    fn into_result_set(self) -> Result<ResultSet> {
        match self {
            Self::Columnar { columns } => {
                let columns = columns
                    .into_iter()
                    .map(|column| {
                        let values = column
                            .values
                            .iter()
                            .map(CellValue::from_json)
                            .collect::<Result<Vec<_>>>()
                            .with_context(|| format!("invalid value in column `{}`", column.name))?;
                        Ok(Column::new(column.name, column.declared_type, values))
                    })
                    .collect::<Result<Vec<_>>>()?;
                ResultSet::new(columns)
            }
            Self::RowWise { columns, rows } => {
                let mut values = vec![Vec::with_capacity(rows.len()); columns.len()];
                for (index, row) in rows.iter().enumerate() {
                    if row.len() != columns.len() {
                        bail!(
                            "row {} has {} values but {} columns are declared",
                            index + 1,
                            row.len(),
                            columns.len()
                        );
                    }
                    for (slot, cell) in values.iter_mut().zip(row) {
                        slot.push(
                            CellValue::from_json(cell)
                                .with_context(|| format!("invalid value in row {}", index + 1))?,
                        );
                    }
                }

                ResultSet::new(
                    columns
                        .into_iter()
                        .zip(values)
                        .map(|(name, values)| Column::new(name, None, values))
                        .collect(),
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{CellValue, Column, ResultSet, SemanticType};

    fn integers(values: &[i64]) -> Vec<CellValue> {
        values.iter().copied().map(CellValue::Integer).collect()
    }

    #[test]
    fn rejects_duplicate_column_names() {
        let err = ResultSet::new(vec![
            Column::new("a", None, integers(&[1])),
            Column::new("a", None, integers(&[2])),
        ])
        .expect_err("duplicate names must fail");
        assert!(err.to_string().contains("duplicate column name `a`"));
    }

    #[test]
    fn rejects_ragged_columns() {
        let err = ResultSet::new(vec![
            Column::new("a", None, integers(&[1, 2, 3])),
            Column::new("b", None, integers(&[1])),
        ])
        .expect_err("ragged columns must fail");
        assert!(
            err.to_string().contains("`b` has 1 rows"),
            "unexpected error: {err}"
        );
    }

    #[test]
    fn head_and_select_columns_slice_the_table() {
        let result_set = ResultSet::new(vec![
            Column::new("a", Some(SemanticType::Numeric), integers(&[1, 2, 3])),
            Column::new("b", None, integers(&[4, 5, 6])),
        ])
        .expect("result set should build");

        let head = result_set.head(2);
        assert_eq!(head.row_count(), 2);
        assert_eq!(head.columns()[0].values, integers(&[1, 2]));

        let selected = result_set.select_columns(&["b", "missing", "a", "b"]);
        assert_eq!(selected.column_names(), vec!["b", "a"]);
        assert_eq!(selected.row_count(), 3);
        assert!(result_set.select_columns(&["missing"]).is_empty());
    }

    #[test]
    fn loads_columnar_and_row_wise_documents() {
        let columnar = ResultSet::from_json_str(
            &json!({
                "columns": [
                    {"name": "region", "values": ["north", "south"]},
                    {"name": "sales", "type": "numeric", "values": [10, 12.5]}
                ]
            })
            .to_string(),
        )
        .expect("columnar document should load");
        assert_eq!(columnar.row_count(), 2);
        assert_eq!(
            columnar.columns()[1].declared_type,
            Some(SemanticType::Numeric)
        );
        assert_eq!(columnar.columns()[1].values[1], CellValue::Real(12.5));

        let row_wise = ResultSet::from_json_str(
            &json!({
                "columns": ["region", "sales"],
                "rows": [["north", 10], ["south", null]]
            })
            .to_string(),
        )
        .expect("row-wise document should load");
        assert_eq!(row_wise.column_names(), vec!["region", "sales"]);
        assert_eq!(row_wise.columns()[1].values[1], CellValue::Null);
    }

    #[test]
    fn row_wise_document_rejects_short_rows() {
        let err = ResultSet::from_json_str(r#"{"columns":["a","b"],"rows":[[1]]}"#)
            .expect_err("short row must fail");
        assert!(format!("{err:#}").contains("row 1 has 1 values"));
    }

    #[test]
    fn row_objects_key_values_by_column() {
        let result_set = ResultSet::new(vec![
            Column::new("name", None, vec![CellValue::Text("x".to_string())]),
            Column::new("flag", None, vec![CellValue::Boolean(true)]),
        ])
        .expect("result set should build");
        assert_eq!(
            result_set.row_objects(),
            vec![json!({"name": "x", "flag": true})]
        );
    }
}
