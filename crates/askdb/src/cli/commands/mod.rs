pub mod artifact_schema;
pub mod ask;
pub mod chart;
pub mod render;
pub mod schema;

use std::path::PathBuf;

use anyhow::{Context, Error, Result};
use clap::Args;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::config::{ArtifactFile, RuntimePaths};
use crate::connection::ConnectionSettings;
use crate::display::{DisplaySink, TerminalSink};
use crate::generate::ResponseContractViolation;
use crate::models::{
    CommandFailure, DisplayArtifact, FailureCode, Response, ResponseMeta, Warning, WarningCode,
};
use crate::sqlite::SqlGuardrailViolation;
use crate::utils::redaction::redact_text;
use crate::viz::{ChartStrategy, ColumnProfile, PipelineOutput};

#[derive(Debug, Clone, Args)]
pub struct ConnectionArgs {
    /// SQLite database file, relative to --cwd or starting with `~/`.
    #[arg(long, value_name = "PATH")]
    pub database: String,
}

impl ConnectionArgs {
    #[must_use]
    pub fn settings(&self) -> ConnectionSettings {
        ConnectionSettings::sqlite(self.database.clone())
    }
}

#[derive(Debug, Clone, Args)]
pub struct OutputArgs {
    /// Print one JSON response on stdout; progress moves to stderr.
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Also write preview.json, chart.json and narrative.txt under --out-dir.
    #[arg(long, default_value_t = false)]
    pub save: bool,
}

/// Progress lines go to stdout unless stdout is reserved for JSON.
pub fn progress(json: bool, line: &str) {
    if json {
        eprintln!("{line}");
    } else {
        println!("{line}");
    }
}

pub(crate) fn command_failure(
    command: &str,
    code: FailureCode,
    message: &str,
    details: Value,
) -> Error {
    Error::new(CommandFailure::new(command, code, message, details))
}

pub(crate) fn cause_details(error: &Error) -> Value {
    json!({ "cause": redact_text(&format!("{error:#}")) })
}

/// Opens the connection or fails with a response naming what went wrong.
pub(crate) fn open_connection(
    command: &str,
    args: &ConnectionArgs,
    runtime_paths: &RuntimePaths,
) -> Result<crate::connection::ConnectionHandle> {
    let settings = args.settings();
    if let Err(error) = settings.validate() {
        return Err(command_failure(
            command,
            FailureCode::ConnectionSettingsInvalid,
            &error.to_string(),
            json!({ "db_type": settings.kind.as_str() }),
        ));
    }

    settings.open(runtime_paths).map_err(|error| {
        command_failure(
            command,
            FailureCode::ConnectionFailed,
            "unable to open database connection",
            json!({
                "db_type": settings.kind.as_str(),
                "url": settings.redacted_url(),
                "cause": redact_text(&format!("{error:#}")),
            }),
        )
    })
}

/// Maps a guarded query error to the failure code that describes it.
pub(crate) fn query_failure(command: &str, error: &Error) -> Error {
    if let Some(violation) = error.downcast_ref::<SqlGuardrailViolation>() {
        command_failure(
            command,
            FailureCode::SqlGuardrailViolation,
            &violation.message,
            violation.details.clone(),
        )
    } else {
        command_failure(
            command,
            FailureCode::QueryExecutionFailed,
            "query execution failed",
            cause_details(error),
        )
    }
}

#[must_use]
pub fn pipeline_warnings(output: &PipelineOutput, truncated: bool) -> Vec<Warning> {
    let mut warnings = Vec::new();
    let ambiguous = output.ambiguous_columns();
    if !ambiguous.is_empty() {
        warnings.push(
            Warning::new(
                WarningCode::AmbiguousColumnType,
                format!(
                    "columns with mixed value types were treated as categorical: {}",
                    ambiguous.join(", ")
                ),
            )
            .with_details(json!({ "columns": ambiguous })),
        );
    }
    if truncated {
        warnings.push(Warning::new(
            WarningCode::ResultTruncated,
            "row cap reached; the chart covers only the fetched rows",
        ));
    }
    if let Some(error) = &output.render_error {
        warnings.push(
            Warning::new(WarningCode::ChartUnavailable, error.to_string())
                .with_details(json!({ "chart": error.chart.as_str(), "column": error.column })),
        );
    }
    warnings
}

/// `data` of a `chart`, `render` or `ask` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,

    pub strategy: ChartStrategy,
    pub profiles: Vec<ColumnProfile>,

    /// Preview table first, then the chart or the text explaining its absence.
    pub artifacts: Vec<DisplayArtifact>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narrative: Option<String>,
}

impl ChartData {
    #[must_use]
    pub fn from_pipeline(output: &PipelineOutput) -> Self {
        Self {
            question: None,
            sql: None,
            strategy: output.strategy.clone(),
            profiles: output.profiles.clone(),
            artifacts: vec![output.preview.clone(), output.visual.clone()],
            narrative: None,
        }
    }
}

/// Everything a charting command shows or prints.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandReport {
    pub command: String,
    pub data: ChartData,
    pub meta: ResponseMeta,
    pub warnings: Vec<Warning>,
}

impl CommandReport {
    #[must_use]
    pub fn from_pipeline(command: &str, output: &PipelineOutput, truncated: bool) -> Self {
        Self {
            command: command.to_string(),
            data: ChartData::from_pipeline(output),
            meta: ResponseMeta::new(),
            warnings: pipeline_warnings(output, truncated),
        }
    }

    pub fn insert_meta(&mut self, key: &str, value: Value) {
        self.meta.insert(key.to_string(), value);
    }

    #[must_use]
    pub fn into_response(self, saved: &[PathBuf]) -> Response<ChartData> {
        let artifact_count = self.data.artifacts.len();
        let mut response = Response::success(self.command, self.data)
            .with_meta("artifact_count", json!(artifact_count))
            .with_warnings(self.warnings);
        response.meta.extend(self.meta);
        if !saved.is_empty() {
            response = response.with_meta(
                "saved_artifacts",
                json!(
                    saved
                        .iter()
                        .map(|path| path.display().to_string())
                        .collect::<Vec<_>>()
                ),
            );
        }
        response
    }
}

/// Prints one `--json` response on stdout.
pub(crate) fn print_response<D: Serialize>(response: &Response<D>) -> Result<()> {
    let encoded = serde_json::to_string(response).map_err(|error| {
        command_failure(
            &response.command,
            FailureCode::ResponseEncodeFailed,
            "failed to encode response",
            json!({ "cause": error.to_string() }),
        )
    })?;
    println!("{encoded}");
    Ok(())
}

/// Saves (when asked) and then shows a report, either as text on stdout or
/// as one JSON response.
pub(crate) fn emit_report(
    report: CommandReport,
    output: &OutputArgs,
    runtime_paths: &RuntimePaths,
) -> Result<()> {
    let saved = if output.save {
        let paths = save_report_artifacts(&report.data, runtime_paths)?;
        for path in &paths {
            progress(
                output.json,
                &format!("{}: checkpoint artifact_written {}", report.command, path.display()),
            );
        }
        paths
    } else {
        Vec::new()
    };

    if output.json {
        return print_response(&report.into_response(&saved));
    }

    let stdout = std::io::stdout();
    let mut sink = TerminalSink::new(stdout.lock());
    sink.show_all(&report.data.artifacts)?;
    if let Some(narrative) = &report.data.narrative {
        sink.show(&DisplayArtifact::info(narrative.clone()))?;
    }
    for warning in &report.warnings {
        println!("warning: {} {}", warning.code.as_str(), warning.message);
    }
    Ok(())
}

fn save_report_artifacts(data: &ChartData, runtime_paths: &RuntimePaths) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();
    for (file, artifact) in [ArtifactFile::Preview, ArtifactFile::Chart]
        .into_iter()
        .zip(&data.artifacts)
    {
        let encoded = serde_json::to_string_pretty(artifact)
            .with_context(|| format!("failed to encode {}", file.file_name()))?;
        written.push(runtime_paths.write_artifact(file, &format!("{encoded}\n"))?);
    }

    if let Some(narrative) = &data.narrative {
        written.push(
            runtime_paths.write_artifact(ArtifactFile::Narrative, &format!("{narrative}\n"))?,
        );
    }

    Ok(written)
}

/// True when the error means the input was refused (exit code 2).
#[must_use]
pub fn is_rejected_input(error: &Error) -> bool {
    if error.downcast_ref::<SqlGuardrailViolation>().is_some()
        || error.downcast_ref::<ResponseContractViolation>().is_some()
    {
        return true;
    }

    error
        .downcast_ref::<CommandFailure>()
        .is_some_and(|failure| failure.code().is_rejected_input())
}
