use serde_json::Value;

use crate::models::ResultSet;

pub const NARRATIVE_PREVIEW_ROWS: usize = 20;

/// Instruction text for SQL generation. The reply format is part of the
/// prompt so a well-behaved model satisfies `extract_sql_block`.
#[must_use]
pub fn build_sql_prompt(question: &str, schema_context: &str, dialect: &str) -> String {
    format!(
        "You translate questions into a single read-only {dialect} query.\n\
         \n\
         Database schema:\n\
         {schema_context}\n\
         \n\
         Rules:\n\
         - Use only the tables and columns listed above.\n\
         - Write exactly one SELECT statement (CTEs are fine). Never modify data.\n\
         - Reply with exactly one fenced code block tagged sql and nothing else inside it.\n\
         \n\
         Question: {}\n",
        question.trim()
    )
}

#[must_use]
pub fn build_narrative_prompt(question: &str, sql: Option<&str>, result_set: &ResultSet) -> String {
    let preview = result_set.head(NARRATIVE_PREVIEW_ROWS).row_objects();
    let rows = preview
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join("\n");

    let mut prompt = format!(
        "Summarize the query result below in two or three sentences for a business reader.\n\
         \n\
         Question: {}\n",
        question.trim()
    );
    if let Some(sql) = sql {
        prompt.push_str(&format!("SQL: {}\n", sql.trim()));
    }
    prompt.push_str(&format!(
        "Rows returned: {} (first {} shown)\n{rows}\n",
        result_set.row_count(),
        preview.len()
    ));
    prompt
}
