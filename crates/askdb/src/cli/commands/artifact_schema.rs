use anyhow::{Context, Result};
use clap::Args;

use crate::models::json_schema;

#[derive(Debug, Clone, Args)]
pub struct ArtifactSchemaArgs {
    /// Single-line JSON instead of pretty printed.
    #[arg(long, default_value_t = false)]
    pub compact: bool,
}

pub fn run(args: &ArtifactSchemaArgs) -> Result<()> {
    let schema = json_schema();
    let encoded = if args.compact {
        serde_json::to_string(&schema)
    } else {
        serde_json::to_string_pretty(&schema)
    }
    .context("failed to encode display artifact schema")?;
    println!("{encoded}");
    Ok(())
}
