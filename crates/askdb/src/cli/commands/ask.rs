use anyhow::Result;
use clap::Args;
use serde_json::json;

use super::{
    CommandReport, ConnectionArgs, OutputArgs, cause_details, command_failure, emit_report,
    open_connection, progress, query_failure,
};
use crate::config::RuntimePaths;
use crate::generate::{
    CommandQueryGenerator, CommandSummarizer, DEFAULT_MAX_TOKENS, DEFAULT_MODEL,
    DEFAULT_MODEL_BASE_URL, DEFAULT_TEMPERATURE, ModelCommand, ModelParameters, NarrativeMode,
    ProfileSummarizer, ResponseContractViolation, Session,
};
use crate::models::{FailureCode, Warning, WarningCode};
use crate::sqlite::{DEFAULT_ROW_CAP, SqlGuardrailViolation};

const SQLITE_DIALECT: &str = "SQLite";

#[derive(Debug, Clone, Args)]
pub struct AskArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[arg(value_name = "QUESTION")]
    pub question: String,

    /// Program that reads a prompt on stdin and prints the model reply.
    ///
    /// It should send one chat completion request with the prompt as the
    /// user message to `$ASKDB_MODEL_BASE_URL/chat/completions`, using
    /// `$ASKDB_MODEL`, `$ASKDB_TEMPERATURE` and `$ASKDB_MAX_TOKENS`, and
    /// print the reply text. askdb sets those variables from the flags
    /// below; the API key stays in the program's own environment.
    #[arg(long, env = "ASKDB_MODEL_CMD", value_name = "PROGRAM", verbatim_doc_comment)]
    pub model_cmd: String,

    /// Extra argument for the model program; repeat for several.
    #[arg(long = "model-arg", value_name = "ARG", allow_hyphen_values = true)]
    pub model_args: Vec<String>,

    #[arg(long, env = "ASKDB_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    #[arg(long, env = "ASKDB_MODEL_BASE_URL", default_value = DEFAULT_MODEL_BASE_URL)]
    pub model_base_url: String,

    #[arg(long, env = "ASKDB_TEMPERATURE", default_value_t = DEFAULT_TEMPERATURE)]
    pub temperature: f64,

    #[arg(long, env = "ASKDB_MAX_TOKENS", default_value_t = DEFAULT_MAX_TOKENS)]
    pub max_tokens: u32,

    #[arg(long, value_enum, default_value_t = NarrativeMode::Offline)]
    pub narrative: NarrativeMode,

    #[arg(long, default_value_t = DEFAULT_ROW_CAP)]
    pub row_cap: usize,

    #[command(flatten)]
    pub output: OutputArgs,
}

impl AskArgs {
    #[must_use]
    pub fn model_parameters(&self) -> ModelParameters {
        ModelParameters {
            model: self.model.clone(),
            base_url: self.model_base_url.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

pub fn run(args: &AskArgs, runtime_paths: &RuntimePaths) -> Result<()> {
    if args.row_cap == 0 {
        return Err(command_failure(
            "ask",
            FailureCode::RowCapInvalid,
            "row_cap must be greater than zero",
            json!({ "row_cap": args.row_cap }),
        ));
    }
    if args.question.trim().is_empty() {
        return Err(command_failure(
            "ask",
            FailureCode::InputInvalid,
            "question must not be empty",
            json!({}),
        ));
    }

    let handle = open_connection("ask", &args.connection, runtime_paths)?;
    progress(
        args.output.json,
        &format!(
            "ask: start db_type={} url={} model_cmd={} model={} narrative={}",
            handle.kind.as_str(),
            handle.redacted_url,
            args.model_cmd,
            args.model,
            args.narrative.as_str()
        ),
    );

    let command = ModelCommand::new(args.model_cmd.clone(), args.model_args.clone())
        .with_parameters(args.model_parameters());
    let generator = CommandQueryGenerator::new(command.clone(), SQLITE_DIALECT);
    let mut session = Session::new(handle, Box::new(generator)).with_row_cap(args.row_cap);
    session = match args.narrative {
        NarrativeMode::Offline => session.with_summarizer(Box::new(ProfileSummarizer)),
        NarrativeMode::Model => session.with_summarizer(Box::new(CommandSummarizer::new(command))),
        NarrativeMode::Off => session,
    };

    let outcome = session.ask(&args.question).map_err(|error| {
        if let Some(violation) = error.downcast_ref::<ResponseContractViolation>() {
            command_failure(
                "ask",
                FailureCode::ResponseContractViolation,
                &violation.message,
                violation.details(),
            )
        } else if error.downcast_ref::<SqlGuardrailViolation>().is_some() {
            query_failure("ask", &error)
        } else {
            command_failure(
                "ask",
                FailureCode::AskFailed,
                "question could not be answered",
                cause_details(&error),
            )
        }
    })?;

    let result_set = outcome.result_set();
    progress(
        args.output.json,
        &format!(
            "ask: checkpoint query_complete rows={} columns={} truncated={} duration_ms={} strategy={}",
            result_set.row_count(),
            result_set.columns().len(),
            outcome.query.execution.truncated,
            outcome.query.duration_ms,
            outcome.output.strategy.name()
        ),
    );

    let mut report =
        CommandReport::from_pipeline("ask", &outcome.output, outcome.query.execution.truncated);
    report.data.question = Some(outcome.question.clone());
    report.data.sql = Some(outcome.query.sql.clone());
    report.data.narrative = outcome.narrative.clone();
    if let Some(error) = &outcome.narrative_error {
        report
            .warnings
            .push(Warning::new(WarningCode::NarrativeFailed, error.clone()));
    }
    report.insert_meta("db_type", json!(session.handle().kind.as_str()));
    report.insert_meta("url", json!(session.handle().redacted_url));
    report.insert_meta("row_count", json!(result_set.row_count()));
    report.insert_meta("truncated", json!(outcome.query.execution.truncated));
    report.insert_meta("row_cap", json!(session.row_cap()));
    report.insert_meta("duration_ms", json!(outcome.query.duration_ms));
    report.insert_meta("diagnostics", outcome.query.diagnostics(session.row_cap()));

    if !args.output.json {
        println!("sql: {}", outcome.query.sql);
    }
    emit_report(report, &args.output, runtime_paths)
}
