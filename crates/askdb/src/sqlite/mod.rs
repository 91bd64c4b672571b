pub mod guardrail;
pub mod schema;

use std::collections::HashSet;
use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Error, Result, bail};
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OpenFlags, params_from_iter};
use serde_json::Value;

use crate::models::{CellValue, Column, ResultSet, SemanticType};
use crate::utils::time::{TemporalText, parse_temporal_text};

pub use guardrail::{
    SqlGuardrailViolation, SqlShape, analyze_sql_shape, strip_trailing_semicolons,
    validate_read_only_sql,
};
pub use schema::{
    PROMPT_SAMPLE_ROWS, SchemaColumnDescriptor, SchemaObjectDescriptor, SchemaSnapshot,
    attach_sample_rows, load_schema,
};

pub const DEFAULT_ROW_CAP: usize = 1_000;

#[derive(Debug, Clone, PartialEq)]
pub struct QueryExecution {
    pub result_set: ResultSet,
    pub truncated: bool,
}

/// A statement that passed the read-only guardrail, with its result.
#[derive(Debug, Clone, PartialEq)]
pub struct GuardedQuery {
    pub sql: String,
    pub shape: SqlShape,
    pub execution: QueryExecution,
    pub duration_ms: u64,
}

impl GuardedQuery {
    #[must_use]
    pub fn diagnostics(&self, row_cap: usize) -> Value {
        self.shape
            .diagnostics(self.duration_ms, row_cap, self.execution.result_set.row_count())
    }
}

/// Opens an existing database file read-only. Never creates the file.
pub fn open_sqlite_connection(path: &Path) -> Result<Connection> {
    if !path.is_file() {
        bail!("sqlite database not found: {}", path.display());
    }

    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .with_context(|| format!("failed to open sqlite database: {}", path.display()))
}

/// Runs one statement and collects at most `row_cap` rows into a
/// [`ResultSet`]. Column declared types come from the statement's decltypes
/// when SQLite can report them (table columns, not expressions). Repeated
/// column names, as in `SELECT a.id, b.id`, are made unique with
/// [`unique_column_names`].
pub fn execute_query(
    connection: &Connection,
    sql: &str,
    params: &[SqlValue],
    row_cap: usize,
) -> Result<QueryExecution> {
    let mut statement = connection
        .prepare(sql)
        .map_err(|error| Error::new(error).context("failed to prepare query"))?;

    let declared = statement.columns();
    let names = unique_column_names(declared.iter().map(|column| column.name()));
    let headers = names
        .into_iter()
        .zip(
            declared
                .iter()
                .map(|column| column.decl_type().map(str::to_ascii_uppercase)),
        )
        .collect::<Vec<_>>();

    let mut values = vec![Vec::new(); headers.len()];
    let mut truncated = false;
    let mut fetched = 0_usize;
    let mut rows = statement
        .query(params_from_iter(params.iter()))
        .map_err(|error| Error::new(error).context("failed to execute query"))?;
    while let Some(row) = rows
        .next()
        .map_err(|error| Error::new(error).context("failed to fetch query row"))?
    {
        if fetched >= row_cap {
            truncated = true;
            break;
        }
        fetched += 1;

        for (index, (_, decl_type)) in headers.iter().enumerate() {
            let value = row
                .get::<usize, SqlValue>(index)
                .map_err(|error| Error::new(error).context("failed to decode query column"))?;
            values[index].push(cell_value_from_sql(value, decl_type.as_deref()));
        }
    }

    let columns = headers
        .into_iter()
        .zip(values)
        .map(|((name, decl_type), values)| {
            Column::new(
                name,
                decl_type.as_deref().map(semantic_type_from_decl),
                values,
            )
        })
        .collect();

    Ok(QueryExecution {
        result_set: ResultSet::new(columns).context("query returned an invalid result set")?,
        truncated,
    })
}

/// The first occurrence of a name keeps it; later ones get `_2`, `_3`, ...
/// skipping any suffix another column already uses.
#[must_use]
pub fn unique_column_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let names = names.into_iter().collect::<Vec<_>>();
    let mut taken = names
        .iter()
        .map(|name| (*name).to_string())
        .collect::<HashSet<_>>();
    let mut seen = HashSet::new();
    let mut unique = Vec::with_capacity(names.len());

    for name in names {
        if seen.insert(name) {
            unique.push(name.to_string());
            continue;
        }

        let mut suffix = 2_usize;
        let renamed = loop {
            let candidate = format!("{name}_{suffix}");
            if !taken.contains(&candidate) {
                break candidate;
            }
            suffix += 1;
        };
        taken.insert(renamed.clone());
        unique.push(renamed);
    }
    unique
}

/// Guardrail check, then [`execute_query`]. A rejected statement fails with
/// a [`SqlGuardrailViolation`] inside the returned error.
pub fn run_guarded_query(
    connection: &Connection,
    raw_sql: &str,
    params: &[SqlValue],
    row_cap: usize,
) -> Result<GuardedQuery> {
    validate_read_only_sql(raw_sql)?;
    let sql = strip_trailing_semicolons(raw_sql).to_string();
    let shape = analyze_sql_shape(&sql);

    let started = Instant::now();
    let execution = execute_query(connection, &sql, params, row_cap)?;
    let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    Ok(GuardedQuery {
        sql,
        shape,
        execution,
        duration_ms,
    })
}

/// Maps a SQLite declared column type to a semantic type, following the
/// affinity rules with date, time and boolean names pulled out first.
#[must_use]
pub fn semantic_type_from_decl(decl_type: &str) -> SemanticType {
    let upper = decl_type.to_ascii_uppercase();
    if upper.contains("BOOL") {
        SemanticType::Categorical
    } else if upper.contains("DATE") || upper.contains("TIME") {
        SemanticType::Temporal
    } else if upper.contains("INT") {
        SemanticType::Numeric
    } else if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
        SemanticType::Categorical
    } else if ["REAL", "FLOA", "DOUB", "NUM", "DEC"]
        .iter()
        .any(|needle| upper.contains(needle))
    {
        SemanticType::Numeric
    } else {
        SemanticType::Categorical
    }
}

fn cell_value_from_sql(value: SqlValue, decl_type: Option<&str>) -> CellValue {
    let declared = decl_type.map(semantic_type_from_decl);
    let boolean_column = decl_type.is_some_and(|decl| decl.contains("BOOL"));
    match value {
        SqlValue::Null => CellValue::Null,
        SqlValue::Integer(flag) if boolean_column && (flag == 0 || flag == 1) => {
            CellValue::Boolean(flag == 1)
        }
        SqlValue::Integer(value) => CellValue::Integer(value),
        SqlValue::Real(value) => CellValue::Real(value),
        SqlValue::Text(text) if declared == Some(SemanticType::Temporal) => {
            match parse_temporal_text(&text) {
                Some(TemporalText::Date(date)) => CellValue::Date(date),
                Some(TemporalText::DateTime(value)) => CellValue::DateTime(value),
                None => CellValue::Text(text),
            }
        }
        SqlValue::Text(text) => CellValue::Text(text),
        SqlValue::Blob(bytes) => CellValue::Text(encode_blob_hex(&bytes)),
    }
}

/// Positional parameters from a JSON scalar or array of scalars.
pub fn parse_query_params(params_json: Option<&str>) -> Result<Vec<SqlValue>> {
    let Some(raw) = params_json else {
        return Ok(Vec::new());
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let parsed =
        serde_json::from_str::<Value>(trimmed).context("params must be valid JSON if provided")?;
    match parsed {
        Value::Null => Ok(Vec::new()),
        Value::Array(values) => values
            .into_iter()
            .map(sql_value_from_json)
            .collect::<Result<Vec<_>>>(),
        value => Ok(vec![sql_value_from_json(value)?]),
    }
}

fn sql_value_from_json(value: Value) -> Result<SqlValue> {
    match value {
        Value::Null => Ok(SqlValue::Null),
        Value::Bool(flag) => Ok(SqlValue::Integer(i64::from(flag))),
        Value::Number(number) => {
            if let Some(integer) = number.as_i64() {
                Ok(SqlValue::Integer(integer))
            } else if let Some(unsigned) = number.as_u64() {
                i64::try_from(unsigned)
                    .map(SqlValue::Integer)
                    .map_err(|_| Error::msg("params integer exceeds sqlite INTEGER range"))
            } else if let Some(real) = number.as_f64() {
                Ok(SqlValue::Real(real))
            } else {
                Err(Error::msg("unsupported numeric param value"))
            }
        }
        Value::String(text) => Ok(SqlValue::Text(text)),
        Value::Array(_) | Value::Object(_) => {
            Err(Error::msg("params entries must be scalar JSON values"))
        }
    }
}

fn encode_blob_hex(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut output = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        output.push(HEX[(byte >> 4) as usize] as char);
        output.push(HEX[(byte & 0x0f) as usize] as char);
    }
    output
}
