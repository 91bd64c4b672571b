use anyhow::{Context, Result};
use rusqlite::Connection;
use rusqlite::types::ValueRef;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

pub const PROMPT_SAMPLE_ROWS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaColumnDescriptor {
    pub ordinal: i64,
    pub name: String,
    pub declared_type: Option<String>,
    pub nullable: bool,
    pub default_value_sql: Option<String>,
    pub primary_key_position: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaObjectDescriptor {
    pub name: String,
    pub kind: String,
    pub internal: bool,
    pub columns: Vec<SchemaColumnDescriptor>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sample_rows: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    pub tables: Vec<SchemaObjectDescriptor>,
    pub views: Vec<SchemaObjectDescriptor>,
}

impl SchemaSnapshot {
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.tables.len() + self.views.len()
    }

    /// One `name(column TYPE, ...)` line per table and view, for prompts,
    /// each followed by its sample rows when they were attached.
    #[must_use]
    pub fn prompt_context(&self) -> String {
        self.tables
            .iter()
            .chain(&self.views)
            .map(|object| {
                let columns = object
                    .columns
                    .iter()
                    .map(|column| match &column.declared_type {
                        Some(declared) if !declared.is_empty() => {
                            format!("{} {declared}", column.name)
                        }
                        _ => column.name.clone(),
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                let mut line = format!("{}({columns})", object.name);
                for sample in &object.sample_rows {
                    line.push_str(&format!("\n  sample: {sample}"));
                }
                line
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub fn load_schema(connection: &Connection, include_internal: bool) -> Result<SchemaSnapshot> {
    let mut statement = connection
        .prepare(
            "SELECT name, type
             FROM sqlite_schema
             WHERE type IN ('table', 'view')
             ORDER BY CASE type WHEN 'table' THEN 0 ELSE 1 END, name ASC",
        )
        .context("failed to prepare sqlite_schema introspection query")?;

    let object_rows = statement
        .query_map([], |row| {
            Ok((row.get::<usize, String>(0)?, row.get::<usize, String>(1)?))
        })
        .context("failed to execute sqlite_schema introspection query")?;

    let mut snapshot = SchemaSnapshot::default();
    for row in object_rows {
        let (name, kind) = row.context("failed to decode sqlite_schema row")?;
        let internal = is_internal_schema_object(&name);
        if !include_internal && internal {
            continue;
        }
        let columns = load_schema_columns(connection, &name)?;
        let object = SchemaObjectDescriptor {
            name,
            kind,
            internal,
            columns,
            sample_rows: Vec::new(),
        };
        if object.kind == "table" {
            snapshot.tables.push(object);
        } else {
            snapshot.views.push(object);
        }
    }

    Ok(snapshot)
}

/// Fills `sample_rows` with up to `limit` rows per object, as JSON objects.
pub fn attach_sample_rows(
    connection: &Connection,
    snapshot: &mut SchemaSnapshot,
    limit: usize,
) -> Result<()> {
    for object in snapshot.tables.iter_mut().chain(snapshot.views.iter_mut()) {
        object.sample_rows = load_sample_rows(connection, &object.name, limit)?;
    }
    Ok(())
}

fn load_sample_rows(connection: &Connection, object_name: &str, limit: usize) -> Result<Vec<Value>> {
    let sql = format!(
        "SELECT * FROM {} LIMIT {limit}",
        sqlite_double_quoted(object_name)
    );
    let mut statement = connection
        .prepare(&sql)
        .with_context(|| format!("failed to prepare sample query for `{object_name}`"))?;
    let column_names = statement
        .column_names()
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>();

    let mut rows = statement
        .query([])
        .with_context(|| format!("failed to sample rows from `{object_name}`"))?;
    let mut samples = Vec::new();
    while let Some(row) = rows.next().context("failed to fetch sample row")? {
        let mut record = Map::new();
        for (index, name) in column_names.iter().enumerate() {
            let value = match row
                .get_ref(index)
                .context("failed to decode sample column")?
            {
                ValueRef::Null => Value::Null,
                ValueRef::Integer(value) => json!(value),
                ValueRef::Real(value) => json!(value),
                ValueRef::Text(text) => json!(String::from_utf8_lossy(text)),
                ValueRef::Blob(bytes) => json!(format!("<{} bytes>", bytes.len())),
            };
            record.insert(name.clone(), value);
        }
        samples.push(Value::Object(record));
    }
    Ok(samples)
}

fn load_schema_columns(
    connection: &Connection,
    object_name: &str,
) -> Result<Vec<SchemaColumnDescriptor>> {
    let pragma_sql = format!("PRAGMA table_info({})", sqlite_single_quoted(object_name));
    let mut statement = connection
        .prepare(&pragma_sql)
        .with_context(|| format!("failed to prepare column introspection for `{object_name}`"))?;

    let column_rows = statement
        .query_map([], |row| {
            Ok(SchemaColumnDescriptor {
                ordinal: row.get::<usize, i64>(0)?,
                name: row.get::<usize, String>(1)?,
                declared_type: row.get::<usize, Option<String>>(2)?,
                nullable: row.get::<usize, i64>(3)? == 0,
                default_value_sql: row.get::<usize, Option<String>>(4)?,
                primary_key_position: row.get::<usize, i64>(5)?,
            })
        })
        .with_context(|| format!("failed to execute column introspection for `{object_name}`"))?;

    column_rows
        .map(|row| row.context("failed to decode schema column row"))
        .collect()
}

fn is_internal_schema_object(object_name: &str) -> bool {
    object_name.starts_with("sqlite_")
}

fn sqlite_double_quoted(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

fn sqlite_single_quoted(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use super::{attach_sample_rows, load_schema};

    fn fixture() -> Connection {
        let connection = Connection::open_in_memory().expect("in-memory db should open");
        connection
            .execute_batch(
                "CREATE TABLE customers (id INTEGER PRIMARY KEY, name TEXT NOT NULL, joined DATE);
                 CREATE TABLE orders (id INTEGER PRIMARY KEY, customer_id INTEGER, total REAL);
                 INSERT INTO customers VALUES (1, 'Ada', '2024-01-05'), (2, 'Lin', NULL), (3, 'Sam', NULL);
                 CREATE VIEW v_totals AS SELECT customer_id, SUM(total) AS spent FROM orders GROUP BY customer_id;",
            )
            .expect("fixture schema should apply");
        connection
    }

    #[test]
    fn lists_tables_then_views_with_columns() {
        let snapshot = load_schema(&fixture(), false).expect("schema should load");
        let tables = snapshot
            .tables
            .iter()
            .map(|object| object.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(tables, vec!["customers", "orders"]);
        assert_eq!(snapshot.views.len(), 1);
        assert_eq!(snapshot.object_count(), 3);

        let customers = &snapshot.tables[0];
        assert_eq!(customers.columns.len(), 3);
        assert_eq!(customers.columns[0].primary_key_position, 1);
        assert!(!customers.columns[1].nullable);
        assert_eq!(customers.columns[2].declared_type.as_deref(), Some("DATE"));
    }

    #[test]
    fn prompt_context_lists_columns_with_types() {
        let snapshot = load_schema(&fixture(), false).expect("schema should load");
        let context = snapshot.prompt_context();
        assert!(context.contains("customers(id INTEGER, name TEXT, joined DATE)"));
        assert!(context.contains("v_totals(customer_id INTEGER, spent)"));
    }

    #[test]
    fn sample_rows_are_capped_and_rendered_in_prompt_context() {
        let connection = fixture();
        let mut snapshot = load_schema(&connection, false).expect("schema should load");
        attach_sample_rows(&connection, &mut snapshot, 2).expect("samples should load");

        let customers = &snapshot.tables[0];
        assert_eq!(customers.sample_rows.len(), 2);
        assert_eq!(customers.sample_rows[0]["name"], "Ada");
        assert!(snapshot.tables[1].sample_rows.is_empty());
        assert!(
            snapshot
                .prompt_context()
                .contains(r#"  sample: {"id":1,"joined":"2024-01-05","name":"Ada"}"#)
        );
    }
}
