//! Model-facing collaborators: SQL generation from a question and narrative
//! summaries of a result. Both sit behind traits; the shipped
//! implementations bridge to an external command or work offline.

pub mod command;
pub mod contract;
pub mod profile;
pub mod prompt;
pub mod session;

use anyhow::Result;
use clap::ValueEnum;

use crate::models::ResultSet;
use crate::viz::ColumnProfile;

pub use command::{
    CommandQueryGenerator, CommandSummarizer, DEFAULT_MAX_TOKENS, DEFAULT_MODEL,
    DEFAULT_MODEL_BASE_URL, DEFAULT_TEMPERATURE, ModelCommand, ModelParameters,
};
pub use contract::{ResponseContractViolation, extract_sql_block};
pub use profile::ProfileSummarizer;
pub use prompt::{build_narrative_prompt, build_sql_prompt};
pub use session::{AskOutcome, Session};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub question: String,
    pub schema_context: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedQuery {
    pub sql: String,
    pub reply: String,
}

pub trait QueryGenerator {
    fn generate(&self, request: &GenerationRequest) -> Result<GeneratedQuery>;
}

pub trait NarrativeSummarizer {
    fn summarize(
        &self,
        question: &str,
        sql: Option<&str>,
        result_set: &ResultSet,
        profiles: &[ColumnProfile],
    ) -> Result<String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NarrativeMode {
    /// Row count and per-column ranges, computed locally.
    Offline,
    /// Ask the model command for a prose summary.
    Model,
    Off,
}

impl NarrativeMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Offline => "offline",
            Self::Model => "model",
            Self::Off => "off",
        }
    }
}
