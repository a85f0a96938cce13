//! askql - Natural-Language Questions over a Relational Database
//!
//! askql turns a question into a single read-only SQL query, runs it, and
//! phrases the result as an answer.
//!
//! # Core Principles
//! - Read-only by construction (validated SELECT text, read-only sessions)
//! - Fresh schema every question (no caching)
//! - One sequential pipeline; the oracle and the database are opaque boundaries
//!
//! # Module Organization
//! - [`error`] - Error types and handling
//! - [`config`] - Configuration resolution (env, local and global files)
//! - [`schema`] - Schema model and its prompt rendering
//! - [`engine`] - Database engine trait and implementations
//! - [`fewshot`] - Example selection strategies
//! - [`prompt`] - SQL and answer prompt construction
//! - [`sanitize`] - Cleanup of generated SQL text
//! - [`capability`] - Read-only validation gate
//! - [`format`] - Result rendering
//! - [`oracle`] - Text-generation boundary and the OpenAI-compatible client
//! - [`pipeline`] - The question cycle
//! - [`output`] - JSON output envelopes

pub mod capability;
pub mod config;
pub mod engine;
pub mod error;
pub mod fewshot;
pub mod format;
pub mod oracle;
pub mod output;
pub mod pipeline;
pub mod prompt;
pub mod sanitize;
pub mod schema;

pub use capability::{validate_query, ValidatedQuery};
pub use config::{AppConfig, FileConfig, OracleConfig};
pub use engine::{ConnectionConfig, DatabaseEngine, DatabaseType, QueryLimits, ResultSet};
pub use error::{AskqlError, Result};
pub use fewshot::{Example, ExampleSet, ExampleStrategy, SchemaExamples};
pub use format::format_results;
pub use oracle::{GenerationOracle, GenerationRequest};
pub use output::{AskData, ErrorEnvelope, ErrorInfo, Metadata, SuccessEnvelope};
pub use pipeline::{Answer, GenerationSettings, Pipeline, Stage};
pub use prompt::PromptContext;
pub use sanitize::{sanitize, SanitizedQuery};
pub use schema::{ColumnDescriptor, SchemaDescription, TableDescriptor};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_api_exports() {
        let _engine_type = DatabaseType::Postgres;
        let _limits = QueryLimits::default();
        let _settings = GenerationSettings::default();
        let _schema = SchemaDescription::default();
    }

    #[test]
    fn test_gate_reachable_from_root() {
        let query = validate_query(&sanitize("```sql\nselect 1;\n```")).unwrap();
        assert_eq!(query.as_str(), "select 1;");
        assert!(validate_query(&sanitize("DELETE FROM t;")).is_err());
    }
}
