use std::io::{ErrorKind, Write};
use std::process::{Command, Stdio};
use std::thread;

use anyhow::{Context, Error, Result, anyhow, bail};

use super::contract::extract_sql_block;
use super::prompt::{build_narrative_prompt, build_sql_prompt};
use super::{GeneratedQuery, GenerationRequest, NarrativeSummarizer, QueryGenerator};
use crate::models::ResultSet;
use crate::utils::redaction::{DEFAULT_EXCERPT_MAX_CHARS, redact_text, truncate_deterministic};
use crate::viz::ColumnProfile;

pub const DEFAULT_MODEL: &str = "mistralai/codestral-2508";
pub const DEFAULT_MODEL_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_TEMPERATURE: f64 = 0.0;
pub const DEFAULT_MAX_TOKENS: u32 = 512;

pub const MODEL_ENV: &str = "ASKDB_MODEL";
pub const MODEL_BASE_URL_ENV: &str = "ASKDB_MODEL_BASE_URL";
pub const TEMPERATURE_ENV: &str = "ASKDB_TEMPERATURE";
pub const MAX_TOKENS_ENV: &str = "ASKDB_MAX_TOKENS";

/// Request settings for the chat completion the model command performs.
/// They reach the command as environment variables; the command owns the
/// API key and the HTTP call.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelParameters {
    pub model: String,
    pub base_url: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for ModelParameters {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_MODEL_BASE_URL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl ModelParameters {
    #[must_use]
    pub fn env_vars(&self) -> [(&'static str, String); 4] {
        [
            (MODEL_ENV, self.model.clone()),
            (MODEL_BASE_URL_ENV, self.base_url.clone()),
            (TEMPERATURE_ENV, self.temperature.to_string()),
            (MAX_TOKENS_ENV, self.max_tokens.to_string()),
        ]
    }
}

/// An operator supplied program that reads a prompt on stdin and writes the
/// model reply to stdout.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelCommand {
    pub program: String,
    pub args: Vec<String>,
    pub parameters: ModelParameters,
}

impl ModelCommand {
    #[must_use]
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            parameters: ModelParameters::default(),
        }
    }

    #[must_use]
    pub fn with_parameters(mut self, parameters: ModelParameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn complete(&self, prompt: &str) -> Result<String> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .envs(self.parameters.env_vars())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to start model command `{}`", self.program))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow!("model command stdin was not captured"))?;
        let prompt = prompt.to_string();
        let writer = thread::spawn(move || stdin.write_all(prompt.as_bytes()));

        let output = child
            .wait_with_output()
            .with_context(|| format!("failed to wait for model command `{}`", self.program))?;
        let written = writer
            .join()
            .map_err(|_| anyhow!("prompt writer for model command `{}` panicked", self.program))?;
        match written {
            // The command may exit without reading all of its input.
            Err(error) if error.kind() == ErrorKind::BrokenPipe => {}
            Err(error) => {
                return Err(Error::new(error).context(format!(
                    "failed to write prompt to model command `{}`",
                    self.program
                )));
            }
            Ok(()) => {}
        }

        if !output.status.success() {
            let stderr = redact_text(String::from_utf8_lossy(&output.stderr).trim());
            let (stderr_excerpt, _) = truncate_deterministic(&stderr, DEFAULT_EXCERPT_MAX_CHARS);
            bail!(
                "model command `{}` exited with {}: {stderr_excerpt}",
                self.program,
                output.status
            );
        }

        String::from_utf8(output.stdout)
            .with_context(|| format!("model command `{}` wrote non UTF-8 output", self.program))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommandQueryGenerator {
    command: ModelCommand,
    dialect: String,
}

impl CommandQueryGenerator {
    #[must_use]
    pub fn new(command: ModelCommand, dialect: impl Into<String>) -> Self {
        Self {
            command,
            dialect: dialect.into(),
        }
    }
}

impl QueryGenerator for CommandQueryGenerator {
    fn generate(&self, request: &GenerationRequest) -> Result<GeneratedQuery> {
        let prompt = build_sql_prompt(&request.question, &request.schema_context, &self.dialect);
        let reply = self.command.complete(&prompt)?;
        let sql = extract_sql_block(&reply)?;
        Ok(GeneratedQuery { sql, reply })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommandSummarizer {
    command: ModelCommand,
}

impl CommandSummarizer {
    #[must_use]
    pub const fn new(command: ModelCommand) -> Self {
        Self { command }
    }
}

impl NarrativeSummarizer for CommandSummarizer {
    fn summarize(
        &self,
        question: &str,
        sql: Option<&str>,
        result_set: &ResultSet,
        _profiles: &[ColumnProfile],
    ) -> Result<String> {
        let reply = self
            .command
            .complete(&build_narrative_prompt(question, sql, result_set))?;
        let narrative = reply.trim();
        if narrative.is_empty() {
            bail!("model command `{}` returned an empty narrative", self.command.program);
        }
        Ok(narrative.to_string())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::{CommandQueryGenerator, ModelCommand, ModelParameters};
    use crate::generate::contract::ResponseContractViolation;
    use crate::generate::{GenerationRequest, QueryGenerator};

    fn shell(script: &str) -> ModelCommand {
        ModelCommand::new("sh", vec!["-c".to_string(), script.to_string()])
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            question: "total by region".to_string(),
            schema_context: "orders(region TEXT, total REAL)".to_string(),
        }
    }

    #[test]
    fn prompt_reaches_the_command_on_stdin() {
        let reply = shell("cat").complete("hello model").expect("cat should echo");
        assert_eq!(reply, "hello model");
    }

    #[test]
    fn generator_extracts_sql_from_command_reply() {
        let generator = CommandQueryGenerator::new(
            shell("cat >/dev/null; printf '```sql\\nSELECT region FROM orders\\n```\\n'"),
            "SQLite",
        );
        let generated = generator.generate(&request()).expect("reply is well formed");
        assert_eq!(generated.sql, "SELECT region FROM orders");
    }

    #[test]
    fn malformed_reply_surfaces_contract_violation() {
        let generator =
            CommandQueryGenerator::new(shell("cat >/dev/null; echo SELECT 1"), "SQLite");
        let err = generator.generate(&request()).expect_err("bare SQL breaks the contract");
        assert!(err.downcast_ref::<ResponseContractViolation>().is_some());
    }

    #[test]
    fn failing_command_reports_redacted_stderr() {
        let err = shell("cat >/dev/null; echo 'token=abc123secret' >&2; exit 3")
            .complete("prompt")
            .expect_err("non-zero exit must fail");
        let message = err.to_string();
        assert!(message.contains("exited with"), "unexpected error: {message}");
        assert!(!message.contains("abc123secret"));
    }

    #[test]
    fn commands_that_skip_their_input_still_succeed() {
        let prompt = "x".repeat(1 << 20);
        let reply = shell("printf done").complete(&prompt).expect("early exit is fine");
        assert_eq!(reply, "done");
    }

    #[test]
    fn request_settings_reach_the_command_environment() {
        let script = r#"cat >/dev/null; printf '%s|%s|%s|%s' "$ASKDB_MODEL" "$ASKDB_MODEL_BASE_URL" "$ASKDB_TEMPERATURE" "$ASKDB_MAX_TOKENS""#;

        let defaults = shell(script).complete("prompt").expect("defaults should export");
        assert_eq!(
            defaults,
            "mistralai/codestral-2508|https://openrouter.ai/api/v1|0|512"
        );

        let tuned = shell(script)
            .with_parameters(ModelParameters {
                model: "local/sqlcoder".to_string(),
                base_url: "http://127.0.0.1:8080/v1".to_string(),
                temperature: 0.2,
                max_tokens: 256,
            })
            .complete("prompt")
            .expect("overrides should export");
        assert_eq!(tuned, "local/sqlcoder|http://127.0.0.1:8080/v1|0.2|256");
    }
}
