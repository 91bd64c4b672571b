use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use super::commands::{
    artifact_schema::ArtifactSchemaArgs, ask::AskArgs, chart::ChartArgs, render::RenderArgs,
    schema::SchemaArgs,
};

#[derive(Debug, Parser)]
#[command(
    name = "askdb",
    version,
    about = "Ask questions of a SQL database and get tables, charts and summaries"
)]
pub struct Cli {
    #[command(flatten)]
    pub runtime: RuntimeArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Args)]
pub struct RuntimeArgs {
    #[arg(long, global = true, value_name = "PATH")]
    pub home_dir: Option<PathBuf>,

    #[arg(long, global = true, value_name = "PATH")]
    pub cwd: Option<PathBuf>,

    #[arg(long, global = true, value_name = "PATH")]
    pub out_dir: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List tables, views and their columns.
    Schema(SchemaArgs),
    /// Run one read-only SQL statement and chart the result.
    Chart(ChartArgs),
    /// Chart a result set stored as JSON.
    Render(RenderArgs),
    /// Turn a question into SQL with a model command, then chart and summarize.
    Ask(AskArgs),
    /// Print the JSON schema of display artifacts.
    ArtifactSchema(ArtifactSchemaArgs),
}

impl Command {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Schema(_) => "schema",
            Self::Chart(_) => "chart",
            Self::Render(_) => "render",
            Self::Ask(_) => "ask",
            Self::ArtifactSchema(_) => "artifact-schema",
        }
    }

    /// Commands whose stdout must stay a single JSON document.
    #[must_use]
    pub const fn json_output(&self) -> bool {
        match self {
            Self::Schema(args) => args.json,
            Self::Chart(args) => args.output.json,
            Self::Render(args) => args.output.json,
            Self::Ask(args) => args.output.json,
            Self::ArtifactSchema(_) => true,
        }
    }
}
