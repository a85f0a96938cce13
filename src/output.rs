//! JSON Output Envelope Types
//!
//! Machine-readable output for `--json` mode. Every question produces exactly
//! one envelope on stdout.
//!
//! # Output Contract
//! - Success: `{"ok": true, "engine": "...", "command": "ask", "data": {...}, "meta": {...}}`
//! - Error: `{"ok": false, "engine": "...", "command": "ask", "error": {"code": "...", "message": "...", "query": "..."}}`
//!
//! `error.query` is present only when the generated SQL was rejected.

use serde::{Deserialize, Serialize};

use crate::error::AskqlError;
use crate::pipeline::Answer;

/// Command name carried in every envelope
pub const ASK_COMMAND: &str = "ask";

/// Success envelope for operation results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessEnvelope<T> {
    /// Always true for success envelopes
    pub ok: bool,

    /// Database engine used (postgres, sqlite)
    pub engine: String,

    pub command: String,

    pub data: T,

    pub meta: Metadata,
}

impl<T> SuccessEnvelope<T> {
    pub fn new(engine: impl Into<String>, command: impl Into<String>, data: T, meta: Metadata) -> Self {
        Self { ok: true, engine: engine.into(), command: command.into(), data, meta }
    }
}

/// Payload of a successful `ask`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskData {
    pub question: String,
    pub sql: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
    pub answer: String,
}

impl SuccessEnvelope<AskData> {
    /// Build the envelope for a completed question cycle
    pub fn from_answer(engine: impl Into<String>, answer: Answer) -> Self {
        let meta = Metadata::with_rows(answer.execution_ms, answer.results.rows.len());
        let data = AskData {
            question: answer.question,
            sql: answer.sql,
            columns: answer.results.columns,
            rows: answer.results.rows,
            answer: answer.answer,
        };
        Self::new(engine, ASK_COMMAND, data, meta)
    }
}

/// Error envelope for operation failures
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Always false for error envelopes
    pub ok: bool,

    /// Database engine (empty string if the failure precedes engine selection)
    pub engine: String,

    pub command: String,

    pub error: ErrorInfo,
}

impl ErrorEnvelope {
    pub fn new(engine: impl Into<String>, command: impl Into<String>, error: ErrorInfo) -> Self {
        Self { ok: false, engine: engine.into(), command: command.into(), error }
    }

    /// Create error envelope from `AskqlError`
    pub fn from_error(engine: impl Into<String>, command: impl Into<String>, err: &AskqlError) -> Self {
        Self::new(engine, command, ErrorInfo::from(err))
    }
}

/// Error information structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable error code (e.g., "UNSAFE_QUERY", "CONNECTION_FAILED")
    pub code: String,

    /// Human-readable error message (no credentials)
    pub message: String,

    /// Rejected SQL text, for `UNSAFE_QUERY` only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
}

impl ErrorInfo {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { code: code.into(), message: message.into(), query: None }
    }
}

impl From<&AskqlError> for ErrorInfo {
    fn from(err: &AskqlError) -> Self {
        Self {
            code: err.error_code().to_string(),
            message: err.message(),
            query: err.rejected_query().map(str::to_string),
        }
    }
}

/// Execution metadata included in all success responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    /// Wall-clock time for the whole cycle in milliseconds
    pub execution_ms: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_returned: Option<usize>,
}

impl Metadata {
    pub const fn new(execution_ms: u64) -> Self {
        Self { execution_ms, rows_returned: None }
    }

    pub const fn with_rows(execution_ms: u64, rows_returned: usize) -> Self {
        Self { execution_ms, rows_returned: Some(rows_returned) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ResultSet;
    use serde_json::json;

    fn answer() -> Answer {
        Answer {
            question: "How many orders?".to_string(),
            sql: "SELECT COUNT(*) FROM orders;".to_string(),
            results: ResultSet { columns: vec!["count".to_string()], rows: vec![vec![json!(42)]] },
            formatted: "count: 42".to_string(),
            answer: "There are 42 orders.".to_string(),
            execution_ms: 17,
        }
    }

    #[test]
    fn test_success_envelope_shape() {
        let envelope = SuccessEnvelope::from_answer("postgres", answer());
        let value = serde_json::to_value(&envelope).unwrap();

        assert_eq!(
            value,
            json!({
                "ok": true,
                "engine": "postgres",
                "command": "ask",
                "data": {
                    "question": "How many orders?",
                    "sql": "SELECT COUNT(*) FROM orders;",
                    "columns": ["count"],
                    "rows": [[42]],
                    "answer": "There are 42 orders."
                },
                "meta": { "execution_ms": 17, "rows_returned": 1 }
            })
        );
    }

    #[test]
    fn test_error_envelope_without_query() {
        let err = AskqlError::query_failed("relation \"orderz\" does not exist");
        let value = serde_json::to_value(ErrorEnvelope::from_error("postgres", ASK_COMMAND, &err)).unwrap();

        assert_eq!(value["ok"], false);
        assert_eq!(value["error"]["code"], "QUERY_FAILED");
        assert!(value["error"].get("query").is_none());
    }

    #[test]
    fn test_error_envelope_carries_rejected_query() {
        let err = AskqlError::unsafe_query("DROP TABLE orders;");
        let value = serde_json::to_value(ErrorEnvelope::from_error("sqlite", ASK_COMMAND, &err)).unwrap();

        assert_eq!(value["error"]["code"], "UNSAFE_QUERY");
        assert_eq!(value["error"]["query"], "DROP TABLE orders;");
    }

    #[test]
    fn test_metadata_without_rows() {
        let json = serde_json::to_string(&Metadata::new(5)).unwrap();
        assert_eq!(json, r#"{"execution_ms":5}"#);
    }

    #[test]
    fn test_error_envelope_deserialization() {
        let json = r#"{"ok":false,"engine":"","command":"ask","error":{"code":"CONFIG_ERROR","message":"missing"}}"#;
        let envelope: ErrorEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.error, ErrorInfo::new("CONFIG_ERROR", "missing"));
    }
}
