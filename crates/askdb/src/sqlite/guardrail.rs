use std::fmt::{Display, Formatter};

use serde_json::{Value, json};

const MUTATING_KEYWORDS: &[&str] = &[
    "insert", "update", "delete", "create", "alter", "drop", "replace", "truncate", "attach",
    "detach", "pragma", "vacuum", "reindex", "analyze", "begin", "commit", "rollback", "grant",
    "revoke", "merge", "upsert",
];

/// A generated or user supplied statement that the read-only executor
/// refuses to run.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlGuardrailViolation {
    pub message: String,
    pub details: Value,
}

impl Display for SqlGuardrailViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for SqlGuardrailViolation {}

pub fn validate_read_only_sql(raw_sql: &str) -> Result<(), SqlGuardrailViolation> {
    let candidate = strip_trailing_semicolons(raw_sql);
    if candidate.is_empty() {
        return Err(guardrail_violation(
            "SQL query is empty; provide a SELECT/CTE/EXPLAIN-SELECT statement",
            json!({"reason": "empty_statement"}),
        ));
    }

    if candidate.contains(';') {
        return Err(guardrail_violation(
            "Multi-statement SQL is not allowed; submit exactly one read-only statement",
            json!({"reason": "multi_statement"}),
        ));
    }

    let normalized = normalize_whitespace(&candidate.to_ascii_lowercase());
    if let Some(keyword) = first_mutating_keyword(&normalized) {
        return Err(guardrail_violation(
            format!("Mutating SQL keyword `{keyword}` is not allowed"),
            json!({"reason": "mutating_statement", "detected_keyword": keyword}),
        ));
    }

    if statement_kind(&normalized) == StatementKind::Other {
        return Err(guardrail_violation(
            "Only SELECT, WITH ... SELECT, and EXPLAIN ... SELECT statements are allowed",
            json!({
                "reason": "unsupported_statement",
                "leading_keyword": leading_keyword(&normalized),
            }),
        ));
    }

    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    WithSelect,
    ExplainSelect,
    ExplainQueryPlanSelect,
    Other,
}

impl StatementKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Select => "select",
            Self::WithSelect => "with_select",
            Self::ExplainSelect => "explain_select",
            Self::ExplainQueryPlanSelect => "explain_query_plan_select",
            Self::Other => "other",
        }
    }
}

/// Shape hints reported next to query results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlShape {
    pub statement_kind: StatementKind,
    pub has_where: bool,
    pub has_group_by: bool,
    pub has_order_by: bool,
    pub has_limit: bool,
    pub sql_length_bytes: usize,
}

impl SqlShape {
    #[must_use]
    pub fn likely_full_scan(&self) -> bool {
        matches!(
            self.statement_kind,
            StatementKind::Select | StatementKind::WithSelect
        ) && !self.has_where
            && !self.has_limit
    }

    #[must_use]
    pub fn diagnostics(&self, duration_ms: u64, row_cap: usize, returned_rows: usize) -> Value {
        json!({
            "statement_kind": self.statement_kind.as_str(),
            "latency_bucket": classify_latency_bucket(duration_ms),
            "has_where": self.has_where,
            "has_group_by": self.has_group_by,
            "has_order_by": self.has_order_by,
            "has_limit": self.has_limit,
            "likely_full_scan": self.likely_full_scan(),
            "sql_length_bytes": self.sql_length_bytes,
            "returned_rows": returned_rows,
            "row_cap": row_cap,
        })
    }
}

#[must_use]
pub fn analyze_sql_shape(raw_sql: &str) -> SqlShape {
    let trimmed = strip_trailing_semicolons(raw_sql);
    let normalized = normalize_whitespace(&trimmed.to_ascii_lowercase());

    SqlShape {
        statement_kind: statement_kind(&normalized),
        has_where: normalized.contains(" where "),
        has_group_by: normalized.contains(" group by "),
        has_order_by: normalized.contains(" order by "),
        has_limit: normalized.contains(" limit "),
        sql_length_bytes: trimmed.len(),
    }
}

fn statement_kind(normalized: &str) -> StatementKind {
    if normalized.starts_with("explain query plan select") {
        StatementKind::ExplainQueryPlanSelect
    } else if normalized.starts_with("explain select") {
        StatementKind::ExplainSelect
    } else if normalized.starts_with("with") {
        StatementKind::WithSelect
    } else if normalized.starts_with("select") {
        StatementKind::Select
    } else {
        StatementKind::Other
    }
}

fn classify_latency_bucket(duration_ms: u64) -> &'static str {
    match duration_ms {
        0..=250 => "fast",
        251..=1_500 => "moderate",
        1_501..=10_000 => "slow",
        _ => "very_slow",
    }
}

/// The statement text handed to the executor: trimmed, trailing `;` removed.
#[must_use]
pub fn strip_trailing_semicolons(raw_sql: &str) -> &str {
    let mut candidate = raw_sql.trim();
    while let Some(stripped) = candidate.strip_suffix(';') {
        candidate = stripped.trim_end();
    }
    candidate
}

fn normalize_whitespace(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn first_mutating_keyword(normalized_sql: &str) -> Option<String> {
    normalized_sql
        .split(|ch: char| !ch.is_ascii_alphanumeric() && ch != '_')
        .find_map(|token| {
            MUTATING_KEYWORDS
                .contains(&token)
                .then_some(token.to_string())
        })
}

fn leading_keyword(normalized_sql: &str) -> String {
    normalized_sql
        .split(|ch: char| !ch.is_ascii_alphanumeric() && ch != '_')
        .find(|token| !token.is_empty())
        .unwrap_or("unknown")
        .to_string()
}

fn guardrail_violation(message: impl Into<String>, details: Value) -> SqlGuardrailViolation {
    SqlGuardrailViolation {
        message: message.into(),
        details: json!({
            "allowed_forms": [
                "SELECT ...",
                "WITH ... SELECT ...",
                "EXPLAIN SELECT ...",
                "EXPLAIN QUERY PLAN SELECT ..."
            ],
            "guardrail": "read_only_sql_single_statement",
            "violation": details
        }),
    }
}
