use anyhow::Result;
use clap::Args;
use serde_json::json;

use super::{
    CommandReport, ConnectionArgs, OutputArgs, cause_details, command_failure, emit_report,
    open_connection, progress, query_failure,
};
use crate::config::RuntimePaths;
use crate::models::FailureCode;
use crate::sqlite::{DEFAULT_ROW_CAP, parse_query_params, run_guarded_query};
use crate::viz::ResultPipeline;

#[derive(Debug, Clone, Args)]
pub struct ChartArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[arg(value_name = "SQL")]
    pub sql: String,

    /// Positional parameters as a JSON scalar or array.
    #[arg(long, value_name = "JSON")]
    pub params: Option<String>,

    #[arg(long, default_value_t = DEFAULT_ROW_CAP)]
    pub row_cap: usize,

    #[command(flatten)]
    pub output: OutputArgs,
}

pub fn run(args: &ChartArgs, runtime_paths: &RuntimePaths) -> Result<()> {
    if args.row_cap == 0 {
        return Err(command_failure(
            "chart",
            FailureCode::RowCapInvalid,
            "row_cap must be greater than zero",
            json!({ "row_cap": args.row_cap }),
        ));
    }

    let params = parse_query_params(args.params.as_deref()).map_err(|error| {
        command_failure(
            "chart",
            FailureCode::ParamsInvalid,
            "invalid query params",
            cause_details(&error),
        )
    })?;

    let handle = open_connection("chart", &args.connection, runtime_paths)?;
    progress(
        args.output.json,
        &format!(
            "chart: start db_type={} url={} row_cap={} params={}",
            handle.kind.as_str(),
            handle.redacted_url,
            args.row_cap,
            params.len()
        ),
    );

    let query = run_guarded_query(handle.connection(), &args.sql, &params, args.row_cap)
        .map_err(|error| query_failure("chart", &error))?;
    let result_set = &query.execution.result_set;
    progress(
        args.output.json,
        &format!(
            "chart: checkpoint query_complete rows={} columns={} truncated={} duration_ms={}",
            result_set.row_count(),
            result_set.columns().len(),
            query.execution.truncated,
            query.duration_ms
        ),
    );

    let output = ResultPipeline::default().run(result_set);
    progress(
        args.output.json,
        &format!("chart: checkpoint strategy={}", output.strategy.name()),
    );

    let mut report = CommandReport::from_pipeline("chart", &output, query.execution.truncated);
    report.data.sql = Some(query.sql.clone());
    report.insert_meta("db_type", json!(handle.kind.as_str()));
    report.insert_meta("url", json!(handle.redacted_url));
    report.insert_meta("row_count", json!(result_set.row_count()));
    report.insert_meta("truncated", json!(query.execution.truncated));
    report.insert_meta("row_cap", json!(args.row_cap));
    report.insert_meta("params_count", json!(params.len()));
    report.insert_meta("duration_ms", json!(query.duration_ms));
    report.insert_meta("diagnostics", query.diagnostics(args.row_cap));

    emit_report(report, &args.output, runtime_paths)
}
