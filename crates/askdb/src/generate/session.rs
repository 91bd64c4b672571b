use anyhow::{Result, bail};

use super::{GeneratedQuery, GenerationRequest, NarrativeSummarizer, QueryGenerator};
use crate::connection::ConnectionHandle;
use crate::models::ResultSet;
use crate::sqlite::{
    DEFAULT_ROW_CAP, GuardedQuery, PROMPT_SAMPLE_ROWS, SchemaSnapshot, attach_sample_rows,
    load_schema, run_guarded_query,
};
use crate::utils::redaction::redact_text;
use crate::viz::{PipelineOutput, ResultPipeline};

/// Everything one `ask` flow needs, passed explicitly: the open connection,
/// the generator and an optional summarizer.
pub struct Session {
    handle: ConnectionHandle,
    generator: Box<dyn QueryGenerator>,
    summarizer: Option<Box<dyn NarrativeSummarizer>>,
    pipeline: ResultPipeline,
    row_cap: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AskOutcome {
    pub question: String,
    pub generated: GeneratedQuery,
    pub query: GuardedQuery,
    pub output: PipelineOutput,
    pub narrative: Option<String>,
    pub narrative_error: Option<String>,
}

impl AskOutcome {
    #[must_use]
    pub const fn result_set(&self) -> &ResultSet {
        &self.query.execution.result_set
    }
}

impl Session {
    #[must_use]
    pub fn new(handle: ConnectionHandle, generator: Box<dyn QueryGenerator>) -> Self {
        Self {
            handle,
            generator,
            summarizer: None,
            pipeline: ResultPipeline::default(),
            row_cap: DEFAULT_ROW_CAP,
        }
    }

    #[must_use]
    pub fn with_summarizer(mut self, summarizer: Box<dyn NarrativeSummarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    #[must_use]
    pub const fn with_row_cap(mut self, row_cap: usize) -> Self {
        self.row_cap = row_cap;
        self
    }

    #[must_use]
    pub const fn with_pipeline(mut self, pipeline: ResultPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    #[must_use]
    pub const fn handle(&self) -> &ConnectionHandle {
        &self.handle
    }

    #[must_use]
    pub const fn row_cap(&self) -> usize {
        self.row_cap
    }

    /// Schema with a couple of sample rows per object, as sent to the model.
    pub fn schema(&self) -> Result<SchemaSnapshot> {
        let connection = self.handle.connection();
        let mut snapshot = load_schema(connection, false)?;
        attach_sample_rows(connection, &mut snapshot, PROMPT_SAMPLE_ROWS)?;
        Ok(snapshot)
    }

    /// question → SQL → guarded execution → pipeline → narrative.
    ///
    /// A failing summarizer does not fail the flow; its error is kept on
    /// [`AskOutcome::narrative_error`].
    pub fn ask(&self, question: &str) -> Result<AskOutcome> {
        let question = question.trim();
        if question.is_empty() {
            bail!("question must not be empty");
        }

        let schema = self.schema()?;
        let generated = self.generator.generate(&GenerationRequest {
            question: question.to_string(),
            schema_context: schema.prompt_context(),
        })?;

        let query = run_guarded_query(self.handle.connection(), &generated.sql, &[], self.row_cap)?;
        let output = self.pipeline.run(&query.execution.result_set);

        let (narrative, narrative_error) = match &self.summarizer {
            None => (None, None),
            Some(summarizer) => match summarizer.summarize(
                question,
                Some(&query.sql),
                &query.execution.result_set,
                &output.profiles,
            ) {
                Ok(narrative) => (Some(narrative), None),
                Err(error) => (None, Some(redact_text(&format!("{error:#}")))),
            },
        };

        Ok(AskOutcome {
            question: question.to_string(),
            generated,
            query,
            output,
            narrative,
            narrative_error,
        })
    }
}
