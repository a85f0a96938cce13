//! Read-Only Query Gate
//!
//! This module decides whether sanitized SQL may reach the database.
//! A `ValidatedQuery` can only be produced here, and `DatabaseEngine::execute`
//! accepts nothing else.
//!
//! # Validation Strategy
//! - Upper-case and trim the query text
//! - Accept if and only if it begins with `SELECT`
//!
//! # Known Limitations
//! This is a prefix check, not a parser. It does not detect statement
//! chaining (`SELECT 1; DROP TABLE t`), and it rejects read-only statements
//! that start with another keyword (`WITH ...`, `EXPLAIN ...`). Engines
//! independently force their sessions read-only, so a chained write still
//! fails at the database.

use std::fmt;

use crate::error::{AskqlError, Result};
use crate::sanitize::SanitizedQuery;

const READ_ONLY_PREFIX: &str = "SELECT";

/// A query that passed the read-only gate. Text is unchanged from the sanitized input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedQuery {
    sql: String,
}

impl ValidatedQuery {
    /// The query text, exactly as sanitized
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.sql
    }
}

impl fmt::Display for ValidatedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

/// Check that sanitized SQL is a read-only statement
///
/// # Returns
/// * `Ok(ValidatedQuery)` carrying the unchanged text
/// * `Err(AskqlError::UnsafeQuery)` carrying the rejected text
pub fn validate_query(query: &SanitizedQuery) -> Result<ValidatedQuery> {
    if is_read_only(query.as_str()) {
        Ok(ValidatedQuery { sql: query.as_str().to_string() })
    } else {
        Err(AskqlError::unsafe_query(query.as_str()))
    }
}

/// Prefix check used by `validate_query`
#[must_use]
pub fn is_read_only(sql: &str) -> bool {
    sql.trim().to_uppercase().starts_with(READ_ONLY_PREFIX)
}
