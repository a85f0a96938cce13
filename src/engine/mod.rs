//! Database Engine Traits and Core Types
//!
//! This module defines the executor boundary of the pipeline.
//! Each engine (`PostgreSQL`, `SQLite`) implements the `DatabaseEngine` trait.
//!
//! # Connection Lifecycle
//! Engines hold only their `ConnectionConfig`. Every call opens a connection,
//! forces it read-only, does its work, and closes it. Nothing is pooled or
//! reused across question cycles.
//!
//! # Engine Isolation
//! Each engine implementation is completely independent.
//! No shared SQL helpers or cross-engine abstractions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::capability::ValidatedQuery;
use crate::error::Result;
use crate::schema::SchemaDescription;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "postgres")]
pub mod postgres;

/// Supported database engine types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    /// `PostgreSQL` database
    Postgres,
    /// `SQLite` database
    SQLite,
}

impl DatabaseType {
    /// Get the engine name as a string
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::SQLite => "sqlite",
        }
    }

    /// SQL dialect name used in generation prompts
    #[must_use]
    pub const fn dialect(&self) -> &'static str {
        match self {
            Self::Postgres => "PostgreSQL",
            Self::SQLite => "SQLite",
        }
    }
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for DatabaseType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "sqlite" => Ok(Self::SQLite),
            other => Err(format!("Unknown database engine '{other}' (expected postgres or sqlite)")),
        }
    }
}

/// Connection configuration for database engines
///
/// This struct contains all parameters needed to establish a database connection.
/// Fields are engine-specific (e.g., `file` only applies to `SQLite`).
#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Database engine type
    pub engine: DatabaseType,

    /// Hostname (for postgres)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Port number (for postgres)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Username (for postgres)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// Password (for postgres)
    /// WARNING: Sensitive data, do not log or include in error messages
    #[serde(skip_serializing)]
    pub password: Option<String>,

    /// Database name (for postgres)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,

    /// Database file path (for sqlite)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

// Manual impl so the password never reaches a log line
impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("engine", &self.engine)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("database", &self.database)
            .field("file", &self.file)
            .finish()
    }
}

impl ConnectionConfig {
    /// Create a new `PostgreSQL` connection config
    #[must_use]
    pub const fn postgres(
        host: String,
        port: u16,
        user: String,
        password: String,
        database: String,
    ) -> Self {
        Self {
            engine: DatabaseType::Postgres,
            host: Some(host),
            port: Some(port),
            user: Some(user),
            password: Some(password),
            database: Some(database),
            file: None,
        }
    }

    /// Create a new `SQLite` connection config
    #[must_use]
    pub const fn sqlite(file: PathBuf) -> Self {
        Self {
            engine: DatabaseType::SQLite,
            host: None,
            port: None,
            user: None,
            password: None,
            database: None,
            file: Some(file),
        }
    }
}

/// Limits applied while collecting query results
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct QueryLimits {
    /// Maximum number of rows to collect (None means no limit)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_rows: Option<usize>,
}

/// Tabular query result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultSet {
    /// Column names as returned by the database (duplicates possible)
    pub columns: Vec<String>,

    /// Rows, each aligned positionally with `columns`
    pub rows: Vec<Vec<serde_json::Value>>,
}

/// Database engine trait
///
/// The pipeline's only way to touch a database.
pub trait DatabaseEngine {
    /// Engine type, used for dialect naming and output envelopes
    fn database_type(&self) -> DatabaseType;

    /// Introspect the default schema
    ///
    /// This method:
    /// 1. Opens a connection and forces it read-only
    /// 2. Lists tables ordered by name, columns ordered by position
    /// 3. Closes the connection
    ///
    /// Any failure is reported as `ConnectionFailed`.
    fn introspect(&self) -> impl std::future::Future<Output = Result<SchemaDescription>> + Send;

    /// Execute a validated query
    ///
    /// This method:
    /// 1. Opens a connection and forces it read-only
    /// 2. Runs the query text unmodified
    /// 3. Closes the connection
    ///
    /// No retry is attempted.
    fn execute(
        &self,
        query: &ValidatedQuery,
    ) -> impl std::future::Future<Output = Result<ResultSet>> + Send;
}
