use anyhow::Result;
use clap::Args;
use serde_json::json;

use super::{
    ConnectionArgs, cause_details, command_failure, open_connection, print_response, progress,
};
use crate::config::RuntimePaths;
use crate::models::{FailureCode, Response};
use crate::sqlite::{SchemaObjectDescriptor, load_schema};

#[derive(Debug, Clone, Args)]
pub struct SchemaArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[arg(long, default_value_t = false)]
    pub include_internal: bool,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

pub fn run(args: &SchemaArgs, runtime_paths: &RuntimePaths) -> Result<()> {
    let handle = open_connection("schema", &args.connection, runtime_paths)?;
    progress(
        args.json,
        &format!(
            "schema: start db_type={} url={} include_internal={}",
            handle.kind.as_str(),
            handle.redacted_url,
            args.include_internal
        ),
    );

    let snapshot = load_schema(handle.connection(), args.include_internal).map_err(|error| {
        command_failure(
            "schema",
            FailureCode::SchemaIntrospectionFailed,
            "failed to introspect database schema",
            cause_details(&error),
        )
    })?;
    progress(
        args.json,
        &format!(
            "schema: complete tables={} views={}",
            snapshot.tables.len(),
            snapshot.views.len()
        ),
    );

    if args.json {
        let table_count = snapshot.tables.len();
        let view_count = snapshot.views.len();
        let object_count = snapshot.object_count();
        let response = Response::success("schema", snapshot)
            .with_meta("db_type", json!(handle.kind.as_str()))
            .with_meta("url", json!(handle.redacted_url))
            .with_meta("include_internal", json!(args.include_internal))
            .with_meta("table_count", json!(table_count))
            .with_meta("view_count", json!(view_count))
            .with_meta("object_count", json!(object_count));
        return print_response(&response);
    }

    for object in snapshot.tables.iter().chain(&snapshot.views) {
        print_object(object);
    }
    Ok(())
}

fn print_object(object: &SchemaObjectDescriptor) {
    println!("{} {}", object.kind, object.name);
    for column in &object.columns {
        let mut line = format!(
            "  {} {}",
            column.name,
            column.declared_type.as_deref().unwrap_or("ANY")
        );
        if column.primary_key_position > 0 {
            line.push_str(" PRIMARY KEY");
        }
        if !column.nullable {
            line.push_str(" NOT NULL");
        }
        println!("{}", line.trim_end());
    }
}
