//! Error Handling Infrastructure
//!
//! This module defines all error types used throughout askql.
//! All errors are structured and map to specific error codes for JSON output.
//!
//! # Error Categories
//! - `ConfigError`: Missing credential or connection parameter (fatal at startup)
//! - `ConnectionFailed`: Database unreachable or metadata query failed
//! - `GenerationFailed`: The generation oracle failed or returned nothing usable
//! - `UnsafeQuery`: Generated SQL did not pass the read-only gate
//! - `QueryFailed`: The database rejected or failed to run the query
//! - `InvalidInput`: Malformed input or missing required parameters
//!
//! Only `ConfigError` ends the process. Every other error ends the current
//! question cycle and the interactive loop keeps going.

use thiserror::Error;

/// Main error type for askql operations
#[derive(Error, Debug)]
pub enum AskqlError {
    /// Required credential or connection parameter missing or malformed
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Database connection or schema introspection failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Generation oracle call failed or returned unusable content
    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    /// Generated SQL was rejected by the read-only gate
    #[error("Only SELECT queries are allowed. Rejected query: {query}")]
    UnsafeQuery { query: String },

    /// Query execution failed
    #[error("Query execution failed: {0}")]
    QueryFailed(String),

    /// Invalid input or missing required parameters
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl AskqlError {
    /// Convert error to error code string for JSON output
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::ConfigError(_) => "CONFIG_ERROR",
            Self::ConnectionFailed(_) => "CONNECTION_FAILED",
            Self::GenerationFailed(_) => "GENERATION_FAILED",
            Self::UnsafeQuery { .. } => "UNSAFE_QUERY",
            Self::QueryFailed(_) => "QUERY_FAILED",
            Self::InvalidInput(_) => "INVALID_INPUT",
        }
    }

    /// Get human-readable error message (no credentials)
    #[must_use]
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Whether this error must terminate the process rather than one question cycle
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::ConfigError(_))
    }

    /// The rejected query text, for `UnsafeQuery` errors
    #[must_use]
    pub fn rejected_query(&self) -> Option<&str> {
        match self {
            Self::UnsafeQuery { query } => Some(query),
            _ => None,
        }
    }

    /// Create a configuration error
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }

    /// Create a connection failed error
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed(message.into())
    }

    /// Create a generation failed error
    pub fn generation_failed(message: impl Into<String>) -> Self {
        Self::GenerationFailed(message.into())
    }

    /// Create an unsafe query error carrying the rejected text
    pub fn unsafe_query(query: impl Into<String>) -> Self {
        Self::UnsafeQuery { query: query.into() }
    }

    /// Create a query failed error
    pub fn query_failed(message: impl Into<String>) -> Self {
        Self::QueryFailed(message.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }
}

/// Result type alias for askql operations
pub type Result<T> = std::result::Result<T, AskqlError>;
