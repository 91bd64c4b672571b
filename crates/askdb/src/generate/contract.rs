use std::fmt::{Display, Formatter};
use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Value, json};

use crate::utils::redaction::{DEFAULT_EXCERPT_MAX_CHARS, redact_text, truncate_deterministic};

const ACCEPTED_FENCE_LANGUAGES: &[&str] = &["", "sql", "sqlite"];

/// A model reply that does not carry exactly one fenced SQL block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseContractViolation {
    pub message: String,
    pub block_count: usize,
    pub reply_excerpt: String,
}

impl ResponseContractViolation {
    #[must_use]
    pub fn details(&self) -> Value {
        json!({
            "contract": "single_fenced_sql_block",
            "block_count": self.block_count,
            "reply_excerpt": self.reply_excerpt,
        })
    }
}

impl Display for ResponseContractViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ResponseContractViolation {}

/// Pulls the SQL out of a reply shaped like
///
/// ````text
/// ```sql
/// SELECT ...
/// ```
/// ````
///
/// Text around the block is ignored. Zero blocks, several blocks, a block
/// tagged with another language, or an empty block all violate the contract.
pub fn extract_sql_block(reply: &str) -> Result<String, ResponseContractViolation> {
    let blocks = fenced_block_regex()
        .captures_iter(reply)
        .map(|captures| {
            (
                captures.get(1).map_or("", |m| m.as_str()).to_ascii_lowercase(),
                captures.get(2).map_or("", |m| m.as_str()).trim().to_string(),
            )
        })
        .collect::<Vec<_>>();

    let [(language, body)] = blocks.as_slice() else {
        return Err(violation(
            format!(
                "model reply must contain exactly one fenced SQL block, found {}",
                blocks.len()
            ),
            blocks.len(),
            reply,
        ));
    };

    if !ACCEPTED_FENCE_LANGUAGES.contains(&language.as_str()) {
        return Err(violation(
            format!("model reply fenced a `{language}` block; expected `sql`"),
            1,
            reply,
        ));
    }
    if body.is_empty() {
        return Err(violation("model reply fenced an empty SQL block", 1, reply));
    }

    Ok(body.clone())
}

fn violation(message: impl Into<String>, block_count: usize, reply: &str) -> ResponseContractViolation {
    let (reply_excerpt, _) = truncate_deterministic(&redact_text(reply), DEFAULT_EXCERPT_MAX_CHARS);
    ResponseContractViolation {
        message: message.into(),
        block_count,
        reply_excerpt,
    }
}

fn fenced_block_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        Regex::new(r"(?s)```[ \t]*([A-Za-z0-9_+\-]*)[ \t]*\r?\n(.*?)```")
            .expect("fenced block regex should compile")
    })
}
