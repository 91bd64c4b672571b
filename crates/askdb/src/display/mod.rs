use std::io::Write;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::models::{DisplayArtifact, TextTone};

const MAX_CELL_WIDTH: usize = 40;

pub trait DisplaySink {
    fn show(&mut self, artifact: &DisplayArtifact) -> Result<()>;

    fn show_all(&mut self, artifacts: &[DisplayArtifact]) -> Result<()> {
        artifacts.iter().try_for_each(|artifact| self.show(artifact))
    }
}

/// Plain text for a terminal: aligned tables, chart specs as pretty JSON.
#[derive(Debug)]
pub struct TerminalSink<W: Write> {
    out: W,
}

impl<W: Write> TerminalSink<W> {
    pub const fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_table(
        &mut self,
        columns: &[String],
        rows: &[Value],
        total_rows: usize,
        truncated: bool,
    ) -> Result<()> {
        if columns.is_empty() {
            writeln!(self.out, "(no columns)")?;
            return Ok(());
        }

        let cells = rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .map(|column| format_cell(row.get(column).unwrap_or(&Value::Null)))
                    .collect::<Vec<_>>()
            })
            .collect::<Vec<_>>();
        let widths = columns
            .iter()
            .enumerate()
            .map(|(index, column)| {
                cells
                    .iter()
                    .map(|row| row[index].chars().count())
                    .chain(std::iter::once(column.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect::<Vec<_>>();

        writeln!(self.out, "{}", pad_row(columns, &widths))?;
        writeln!(
            self.out,
            "{}",
            widths
                .iter()
                .map(|width| "-".repeat(*width))
                .collect::<Vec<_>>()
                .join("-+-")
        )?;
        for row in &cells {
            writeln!(self.out, "{}", pad_row(row, &widths))?;
        }

        if truncated {
            writeln!(self.out, "({} of {total_rows} rows shown)", rows.len())?;
        } else {
            writeln!(
                self.out,
                "({total_rows} {})",
                if total_rows == 1 { "row" } else { "rows" }
            )?;
        }
        Ok(())
    }
}

impl<W: Write> DisplaySink for TerminalSink<W> {
    fn show(&mut self, artifact: &DisplayArtifact) -> Result<()> {
        match artifact {
            DisplayArtifact::Table {
                columns,
                rows,
                total_rows,
                truncated,
            } => self.write_table(columns, rows, *total_rows, *truncated)?,
            DisplayArtifact::Chart { chart, spec } => {
                let pretty = serde_json::to_string_pretty(spec)
                    .context("failed to encode chart spec for terminal output")?;
                writeln!(self.out, "chart: {}", chart.as_str())?;
                writeln!(self.out, "{pretty}")?;
            }
            DisplayArtifact::Text { tone, message } => {
                let prefix = match tone {
                    TextTone::Info => "info",
                    TextTone::Error => "error",
                };
                writeln!(self.out, "{prefix}: {message}")?;
            }
        }
        self.out.flush().context("failed to flush terminal output")
    }
}

fn format_cell(value: &Value) -> String {
    let text = match value {
        Value::Null => "NULL".to_string(),
        Value::String(text) => text.clone(),
        other => other.to_string(),
    };
    let text = text.replace(['\n', '\r', '\t'], " ");
    if text.chars().count() > MAX_CELL_WIDTH {
        let prefix = text.chars().take(MAX_CELL_WIDTH - 3).collect::<String>();
        format!("{prefix}...")
    } else {
        text
    }
}

fn pad_row(cells: &[String], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join(" | ")
        .trim_end()
        .to_string()
}
