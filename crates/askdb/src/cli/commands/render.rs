use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde_json::json;

use super::{CommandReport, OutputArgs, cause_details, command_failure, emit_report, progress};
use crate::config::RuntimePaths;
use crate::models::{FailureCode, ResultSet};
use crate::viz::ResultPipeline;

#[derive(Debug, Clone, Args)]
pub struct RenderArgs {
    /// JSON result set: `{"columns": [{"name", "type"?, "values"}]}` or
    /// `{"columns": [names], "rows": [[...]]}`.
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    #[command(flatten)]
    pub output: OutputArgs,
}

pub fn run(args: &RenderArgs, runtime_paths: &RuntimePaths) -> Result<()> {
    let input_path = if args.input.is_absolute() {
        args.input.clone()
    } else {
        runtime_paths.cwd.join(&args.input)
    };
    progress(
        args.output.json,
        &format!("render: start input={}", input_path.display()),
    );

    let raw = std::fs::read_to_string(&input_path).map_err(|error| {
        command_failure(
            "render",
            FailureCode::InputUnreadable,
            "unable to read result set input",
            json!({
                "input": input_path.display().to_string(),
                "cause": error.to_string(),
            }),
        )
    })?;
    let result_set = ResultSet::from_json_str(&raw).map_err(|error| {
        command_failure(
            "render",
            FailureCode::InputInvalid,
            "input is not a valid result set document",
            cause_details(&error),
        )
    })?;

    let output = ResultPipeline::default().run(&result_set);
    progress(
        args.output.json,
        &format!(
            "render: checkpoint rows={} columns={} strategy={}",
            result_set.row_count(),
            result_set.columns().len(),
            output.strategy.name()
        ),
    );

    let mut report = CommandReport::from_pipeline("render", &output, false);
    report.insert_meta("input", json!(input_path.display().to_string()));
    report.insert_meta("row_count", json!(result_set.row_count()));
    emit_report(report, &args.output, runtime_paths)
}
