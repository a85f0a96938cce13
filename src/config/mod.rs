//! Configuration Management
//!
//! This module resolves the immutable `AppConfig` that is built once at
//! startup and handed to the pipeline. Nothing downstream reads the
//! environment.
//!
//! # Configuration Locations
//! - Local: `.askql/config.json` (team-shareable, per-project)
//! - Global: `~/.config/askql/config.json` (per-user)
//!
//! # Resolution Precedence
//! 1. Environment variables (highest priority)
//! 2. Local config file (`.askql/config.json`)
//! 3. Global config file (`~/.config/askql/config.json`)
//! 4. Built-in defaults
//!
//! # Secrets
//! Config files never hold secrets. The API key comes from `OPENAI_API_KEY`;
//! the database password from `PG_PASSWORD` or the variable named by
//! `password_env`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::engine::{ConnectionConfig, DatabaseType, QueryLimits};
use crate::error::{AskqlError, Result};
use crate::oracle::openai::DEFAULT_BASE_URL;

/// Default model for SQL generation
pub const DEFAULT_SQL_MODEL: &str = "gpt-4o";

/// Default model for answer generation
pub const DEFAULT_ANSWER_MODEL: &str = "gpt-4";

/// Default output ceiling for both generation calls
pub const DEFAULT_MAX_TOKENS: u32 = 500;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 5432;
pub const DEFAULT_DATABASE: &str = "queue";

/// Settings stored in a config file
///
/// Every field is optional; missing fields fall through to the next source.
/// Example:
/// ```json
/// {
///   "engine": "postgres",
///   "host": "db.internal",
///   "database": "queue",
///   "user": "readonly",
///   "password_env": "QUEUE_DB_PASSWORD",
///   "few_shot": true
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<DatabaseType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// Environment variable name holding the database password
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,

    /// `SQLite` database file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,

    /// Oracle API root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql_model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer_model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Cap on rows collected per query
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_rows: Option<usize>,

    /// Enable schema-derived few-shot examples
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub few_shot: Option<bool>,
}

impl FileConfig {
    /// Layer `overrides` on top of `self`, field by field
    #[must_use]
    pub fn merge(self, overrides: Self) -> Self {
        Self {
            engine: overrides.engine.or(self.engine),
            host: overrides.host.or(self.host),
            port: overrides.port.or(self.port),
            database: overrides.database.or(self.database),
            user: overrides.user.or(self.user),
            password_env: overrides.password_env.or(self.password_env),
            file: overrides.file.or(self.file),
            base_url: overrides.base_url.or(self.base_url),
            sql_model: overrides.sql_model.or(self.sql_model),
            answer_model: overrides.answer_model.or(self.answer_model),
            max_tokens: overrides.max_tokens.or(self.max_tokens),
            max_rows: overrides.max_rows.or(self.max_rows),
            few_shot: overrides.few_shot.or(self.few_shot),
        }
    }
}

/// Oracle connection and generation settings
#[derive(Clone, PartialEq)]
pub struct OracleConfig {
    /// WARNING: Sensitive data, do not log or include in error messages
    pub api_key: String,
    pub base_url: String,
    pub sql_model: String,
    pub answer_model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl std::fmt::Debug for OracleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleConfig")
            .field("api_key", &"***")
            .field("base_url", &self.base_url)
            .field("sql_model", &self.sql_model)
            .field("answer_model", &self.answer_model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .finish()
    }
}

/// Fully resolved application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub connection: ConnectionConfig,
    pub oracle: OracleConfig,
    pub few_shot: bool,
    pub limits: QueryLimits,
}

impl AppConfig {
    /// Resolve configuration from file settings and an environment lookup
    ///
    /// Empty environment values count as missing.
    pub fn resolve<F>(file: &FileConfig, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |key: &str| env(key).filter(|value| !value.trim().is_empty());

        let api_key = env("OPENAI_API_KEY").ok_or_else(|| {
            AskqlError::config_error("OPENAI_API_KEY environment variable is not set")
        })?;

        let engine = match env("DB_ENGINE") {
            Some(raw) => raw.parse::<DatabaseType>().map_err(AskqlError::config_error)?,
            None => file.engine.unwrap_or(DatabaseType::Postgres),
        };

        let connection = match engine {
            DatabaseType::Postgres => resolve_postgres(file, &env)?,
            DatabaseType::SQLite => {
                let path = env("DB_FILE")
                    .map(PathBuf::from)
                    .or_else(|| file.file.clone())
                    .ok_or_else(|| {
                        AskqlError::config_error("SQLite requires DB_FILE or 'file' in config")
                    })?;
                ConnectionConfig::sqlite(path)
            }
        };

        let max_rows = match env("ASKQL_MAX_ROWS") {
            Some(raw) => Some(parse_number::<usize>("ASKQL_MAX_ROWS", &raw)?),
            None => file.max_rows,
        };

        let oracle = OracleConfig {
            api_key,
            base_url: env("OPENAI_BASE_URL")
                .or_else(|| file.base_url.clone())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            sql_model: env("ASKQL_SQL_MODEL")
                .or_else(|| file.sql_model.clone())
                .unwrap_or_else(|| DEFAULT_SQL_MODEL.to_string()),
            answer_model: env("ASKQL_ANSWER_MODEL")
                .or_else(|| file.answer_model.clone())
                .unwrap_or_else(|| DEFAULT_ANSWER_MODEL.to_string()),
            max_tokens: file.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: 0.0,
        };

        Ok(Self {
            connection,
            oracle,
            few_shot: file.few_shot.unwrap_or(false),
            limits: QueryLimits { max_rows },
        })
    }

    /// Load config files and resolve against the process environment
    pub fn load() -> Result<Self> {
        let file = load_with_precedence()?;
        Self::resolve(&file, |key| std::env::var(key).ok())
    }
}

fn resolve_postgres<F>(file: &FileConfig, env: &F) -> Result<ConnectionConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let host = env("DB_HOST")
        .or_else(|| file.host.clone())
        .unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = match env("DB_PORT") {
        Some(raw) => parse_number::<u16>("DB_PORT", &raw)?,
        None => file.port.unwrap_or(DEFAULT_PORT),
    };

    let database = env("DB_NAME")
        .or_else(|| file.database.clone())
        .unwrap_or_else(|| DEFAULT_DATABASE.to_string());

    let user = env("PG_USER")
        .or_else(|| file.user.clone())
        .ok_or_else(|| AskqlError::config_error("PG_USER environment variable is not set"))?;

    let password = match env("PG_PASSWORD") {
        Some(password) => password,
        None => match &file.password_env {
            Some(var) => env(var.as_str()).ok_or_else(|| {
                AskqlError::config_error(format!(
                    "Environment variable {var} not found for password"
                ))
            })?,
            None => {
                return Err(AskqlError::config_error(
                    "PG_PASSWORD environment variable is not set",
                ))
            }
        },
    };

    Ok(ConnectionConfig::postgres(host, port, user, password, database))
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| AskqlError::config_error(format!("{key} must be a number, got '{raw}'")))
}

/// Get path to local config file (`.askql/config.json`)
pub fn local_config_path() -> Result<PathBuf> {
    let current_dir = std::env::current_dir().map_err(|e| {
        AskqlError::config_error(format!("Could not determine current directory: {e}"))
    })?;

    Ok(current_dir.join(".askql").join("config.json"))
}

/// Get path to global config file (`~/.config/askql/config.json`)
pub fn global_config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or_else(|| AskqlError::config_error("Could not determine user config directory"))?;

    Ok(config_dir.join("askql").join("config.json"))
}

/// Load a config file; a missing file is an empty config
pub fn load_file(path: &Path) -> Result<FileConfig> {
    if !path.exists() {
        return Ok(FileConfig::default());
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        AskqlError::config_error(format!("Could not read config file {}: {e}", path.display()))
    })?;

    serde_json::from_str(&contents).map_err(|e| {
        AskqlError::config_error(format!("Invalid config file {}: {e}", path.display()))
    })
}

/// Load global and local config files, local taking precedence
pub fn load_with_precedence() -> Result<FileConfig> {
    let global = load_file(&global_config_path()?)?;
    let local = load_file(&local_config_path()?)?;

    tracing::debug!(?global, ?local, "loaded config files");
    Ok(global.merge(local))
}
