#![forbid(unsafe_code)]

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use askdb::cli::app::{Cli, Command, RuntimeArgs};
use askdb::cli::commands::{self, progress};
use askdb::config::RuntimePaths;
use askdb::models::CommandFailure;
use clap::Parser;
use clap::error::ErrorKind;

const EXIT_SUCCESS: i32 = 0;
const EXIT_RUNTIME_FAILURE: i32 = 1;
const EXIT_VALIDATION_FAILURE: i32 = 2;
const EXIT_USAGE_ERROR: i32 = 64;

fn main() {
    std::process::exit(run());
}

fn run() -> i32 {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => return exit_code_for_parse_error(error),
    };
    let command_name = cli.command.name();
    let json_output = cli.command.json_output();
    progress(json_output, &format!("askdb: starting `{command_name}`"));

    match execute(cli) {
        Ok(()) => {
            progress(
                json_output,
                &format!("askdb: completed `{command_name}` (exit_code={EXIT_SUCCESS})"),
            );
            EXIT_SUCCESS
        }
        Err(error) => {
            let exit_code = classify_runtime_error(&error);
            eprintln!("askdb: failed `{command_name}` (exit_code={exit_code})");
            match error.downcast_ref::<CommandFailure>() {
                Some(failure) if json_output => println!("{failure}"),
                _ => eprintln!("{error:#}"),
            }
            exit_code
        }
    }
}

fn execute(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Schema(args) => {
            let runtime_paths = resolve_runtime_paths(&cli.runtime)?;
            commands::schema::run(&args, &runtime_paths)
        }
        Command::Chart(args) => {
            let runtime_paths = resolve_runtime_paths(&cli.runtime)?;
            commands::chart::run(&args, &runtime_paths)
        }
        Command::Render(args) => {
            let runtime_paths = resolve_runtime_paths(&cli.runtime)?;
            commands::render::run(&args, &runtime_paths)
        }
        Command::Ask(args) => {
            let runtime_paths = resolve_runtime_paths(&cli.runtime)?;
            commands::ask::run(&args, &runtime_paths)
        }
        Command::ArtifactSchema(args) => commands::artifact_schema::run(&args),
    }
}

fn classify_runtime_error(error: &anyhow::Error) -> i32 {
    if commands::is_rejected_input(error) {
        EXIT_VALIDATION_FAILURE
    } else {
        EXIT_RUNTIME_FAILURE
    }
}

fn exit_code_for_parse_error(error: clap::Error) -> i32 {
    match error.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
            let _ = error.print();
            EXIT_SUCCESS
        }
        _ => {
            let _ = error.print();
            EXIT_USAGE_ERROR
        }
    }
}

fn resolve_runtime_paths(args: &RuntimeArgs) -> Result<RuntimePaths> {
    let home_dir = match &args.home_dir {
        Some(path) => path.clone(),
        None => std::env::var_os("HOME")
            .map(PathBuf::from)
            .ok_or_else(|| anyhow!("HOME is not set; pass --home-dir"))?,
    };

    let cwd = match &args.cwd {
        Some(path) => path.clone(),
        None => std::env::current_dir()?,
    };

    RuntimePaths::resolve(&home_dir, &cwd, args.out_dir.as_deref())
}
