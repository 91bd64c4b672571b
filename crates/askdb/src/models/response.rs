//! The one JSON document a command prints when `--json` is set.
//!
//! `data` is typed per command: [`ChartData`](crate::cli::commands::ChartData)
//! for `chart`, `render` and `ask`, [`SchemaSnapshot`](crate::sqlite::SchemaSnapshot)
//! for `schema`. Failures carry a [`FailureCode`] whose
//! [`is_rejected_input`](FailureCode::is_rejected_input) decides exit code 2.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::utils::time::{format_unix_ms, unix_timestamp_millis};

pub const RESPONSE_SCHEMA_VERSION: &str = "askdb.response.v1";

pub type ResponseMeta = BTreeMap<String, Value>;

/// Why a command stopped before producing data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCode {
    SqlGuardrailViolation,
    ResponseContractViolation,
    RowCapInvalid,
    ParamsInvalid,
    ConnectionSettingsInvalid,
    InputInvalid,
    InputUnreadable,
    ConnectionFailed,
    QueryExecutionFailed,
    SchemaIntrospectionFailed,
    AskFailed,
    ResponseEncodeFailed,
}

impl FailureCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SqlGuardrailViolation => "sql_guardrail_violation",
            Self::ResponseContractViolation => "response_contract_violation",
            Self::RowCapInvalid => "row_cap_invalid",
            Self::ParamsInvalid => "params_invalid",
            Self::ConnectionSettingsInvalid => "connection_settings_invalid",
            Self::InputInvalid => "input_invalid",
            Self::InputUnreadable => "input_unreadable",
            Self::ConnectionFailed => "connection_failed",
            Self::QueryExecutionFailed => "query_execution_failed",
            Self::SchemaIntrospectionFailed => "schema_introspection_failed",
            Self::AskFailed => "ask_failed",
            Self::ResponseEncodeFailed => "response_encode_failed",
        }
    }

    /// The input was refused, as opposed to the command breaking while it ran.
    #[must_use]
    pub const fn is_rejected_input(self) -> bool {
        matches!(
            self,
            Self::SqlGuardrailViolation
                | Self::ResponseContractViolation
                | Self::RowCapInvalid
                | Self::ParamsInvalid
                | Self::ConnectionSettingsInvalid
                | Self::InputInvalid
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningCode {
    AmbiguousColumnType,
    ResultTruncated,
    ChartUnavailable,
    NarrativeFailed,
}

impl WarningCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AmbiguousColumnType => "ambiguous_column_type",
            Self::ResultTruncated => "result_truncated",
            Self::ChartUnavailable => "chart_unavailable",
            Self::NarrativeFailed => "narrative_failed",
        }
    }
}

/// Something the caller should know about a run that still succeeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    pub code: WarningCode,
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl Warning {
    #[must_use]
    pub fn new(code: WarningCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Failure {
    pub code: FailureCode,
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response<D> {
    pub ok: bool,
    pub command: String,
    pub generated_at_utc: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<D>,

    pub meta: ResponseMeta,

    #[serde(default)]
    pub warnings: Vec<Warning>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Failure>,
}

/// What a failed command prints. It never carries data.
pub type FailureResponse = Response<()>;

impl<D> Response<D> {
    #[must_use]
    pub fn success(command: impl Into<String>, data: D) -> Self {
        let mut response = Self::stamped(command, true);
        response.data = Some(data);
        response
    }

    #[must_use]
    pub fn failure(command: impl Into<String>, failure: Failure) -> Self {
        let mut response = Self::stamped(command, false);
        response.error = Some(failure);
        response
    }

    fn stamped(command: impl Into<String>, ok: bool) -> Self {
        Self {
            ok,
            command: command.into(),
            generated_at_utc: format_unix_ms(unix_timestamp_millis()),
            data: None,
            meta: ResponseMeta::from([(
                "schema_version".to_string(),
                json!(RESPONSE_SCHEMA_VERSION),
            )]),
            warnings: Vec::new(),
            error: None,
        }
    }

    #[must_use]
    pub fn with_meta(mut self, key: impl Into<String>, value: Value) -> Self {
        self.meta.insert(key.into(), value);
        self
    }

    #[must_use]
    pub fn with_warnings(mut self, warnings: impl IntoIterator<Item = Warning>) -> Self {
        self.warnings.extend(warnings);
        self
    }
}

/// A command that stopped early. Displays as the JSON [`FailureResponse`]
/// the command prints in `--json` mode.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandFailure {
    command: String,
    failure: Failure,
}

impl CommandFailure {
    #[must_use]
    pub fn new(
        command: impl Into<String>,
        code: FailureCode,
        message: impl Into<String>,
        details: Value,
    ) -> Self {
        Self {
            command: command.into(),
            failure: Failure {
                code,
                message: message.into(),
                details: (!is_empty_details(&details)).then_some(details),
            },
        }
    }

    #[must_use]
    pub const fn code(&self) -> FailureCode {
        self.failure.code
    }

    #[must_use]
    pub fn response(&self) -> FailureResponse {
        Response::failure(self.command.clone(), self.failure.clone())
    }
}

impl Display for CommandFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match serde_json::to_string(&self.response()) {
            Ok(encoded) => f.write_str(&encoded),
            Err(_) => write!(f, "{} failed: {}", self.command, self.failure.message),
        }
    }
}

impl std::error::Error for CommandFailure {}

fn is_empty_details(details: &Value) -> bool {
    match details {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}
