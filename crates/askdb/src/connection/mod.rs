use std::path::PathBuf;

use anyhow::{Result, bail};
use rusqlite::Connection;
use serde::Serialize;

use crate::config::RuntimePaths;
use crate::sqlite::open_sqlite_connection;
use crate::utils::redaction::redact_secret;

pub const MISSING_FIELDS_MESSAGE: &str = "fill out all connection fields";

/// Server kinds are described here so an external connection provider can
/// validate settings and build its engine URL. askdb itself opens SQLite
/// files only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DatabaseKind {
    Sqlite,
    Postgresql,
    Mysql,
}

impl DatabaseKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sqlite => "sqlite",
            Self::Postgresql => "postgresql",
            Self::Mysql => "mysql",
        }
    }

    #[must_use]
    pub const fn is_server(self) -> bool {
        !matches!(self, Self::Sqlite)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub kind: DatabaseKind,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
}

impl ConnectionSettings {
    #[must_use]
    pub fn sqlite(database: impl Into<String>) -> Self {
        Self {
            kind: DatabaseKind::Sqlite,
            database: database.into(),
            username: None,
            password: None,
            host: None,
            port: None,
        }
    }

    /// SQLite needs only a database file. Server databases need every field.
    pub fn validate(&self) -> Result<()> {
        if self.database.trim().is_empty() {
            bail!("{MISSING_FIELDS_MESSAGE}: database is required");
        }
        if !self.kind.is_server() {
            return Ok(());
        }

        let missing = [
            ("username", is_blank(self.username.as_deref())),
            ("password", is_blank(self.password.as_deref())),
            ("host", is_blank(self.host.as_deref())),
            ("port", self.port.is_none()),
        ]
        .into_iter()
        .filter_map(|(field, missing)| missing.then_some(field))
        .collect::<Vec<_>>();
        if !missing.is_empty() {
            bail!(
                "{MISSING_FIELDS_MESSAGE}: missing {} for {}",
                missing.join(", "),
                self.kind.as_str()
            );
        }

        Ok(())
    }

    pub fn engine_url(&self) -> Result<String> {
        self.validate()?;
        Ok(self.build_url(self.password.as_deref().map(percent_encode_userinfo)))
    }

    /// Same shape as [`Self::engine_url`] with the password masked. Safe to
    /// print and to put in response metadata.
    #[must_use]
    pub fn redacted_url(&self) -> String {
        self.build_url(self.password.as_deref().map(redact_secret))
    }

    fn build_url(&self, password: Option<String>) -> String {
        let userinfo = format!(
            "{}:{}",
            percent_encode_userinfo(self.username.as_deref().unwrap_or_default()),
            password.unwrap_or_default()
        );
        let host = self.host.as_deref().unwrap_or_default();
        let port = self.port.map(|port| port.to_string()).unwrap_or_default();

        match self.kind {
            DatabaseKind::Sqlite => format!("sqlite:///{}", self.database),
            DatabaseKind::Postgresql => format!(
                "postgresql://{userinfo}@{host}:{port}/{}?sslmode=require",
                self.database
            ),
            DatabaseKind::Mysql => {
                format!("mysql+pymysql://{userinfo}@{host}:{port}/{}", self.database)
            }
        }
    }

    pub fn open(&self, paths: &RuntimePaths) -> Result<ConnectionHandle> {
        self.validate()?;
        match self.kind {
            DatabaseKind::Sqlite => {
                let path = paths.resolve_database_path(&self.database)?;
                let connection = open_sqlite_connection(&path)?;
                Ok(ConnectionHandle {
                    kind: self.kind,
                    redacted_url: format!("sqlite:///{}", path.display()),
                    path,
                    connection,
                })
            }
            kind => bail!(
                "askdb opens sqlite files only; hand these {} settings to a connection provider ({})",
                kind.as_str(),
                self.redacted_url()
            ),
        }
    }
}

/// An open read-only connection plus what is safe to report about it.
#[derive(Debug)]
pub struct ConnectionHandle {
    pub kind: DatabaseKind,
    pub path: PathBuf,
    pub redacted_url: String,
    connection: Connection,
}

impl ConnectionHandle {
    #[must_use]
    pub const fn connection(&self) -> &Connection {
        &self.connection
    }
}

fn is_blank(value: Option<&str>) -> bool {
    value.is_none_or(|value| value.trim().is_empty())
}

fn percent_encode_userinfo(value: &str) -> String {
    let mut encoded = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '-' | '.' | '_' | '~' => encoded.push(ch),
            other => {
                let mut buffer = [0_u8; 4];
                for byte in other.encode_utf8(&mut buffer).bytes() {
                    encoded.push_str(&format!("%{byte:02X}"));
                }
            }
        }
    }
    encoded
}
