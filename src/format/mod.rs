//! Result Formatting
//!
//! Renders a `ResultSet` as plain text for the answer prompt and the console.
//! Each row becomes a block of `column: value` lines; blocks are separated by
//! a blank line.

use serde_json::Value;

use crate::engine::ResultSet;

/// Text used when the query returned no rows
pub const NO_RESULTS: &str = "No results found.";

/// Render rows as `column: value` blocks
#[must_use]
pub fn format_results(result: &ResultSet) -> String {
    if result.rows.is_empty() {
        return NO_RESULTS.to_string();
    }

    result
        .rows
        .iter()
        .map(|row| {
            result
                .columns
                .iter()
                .zip(row)
                .map(|(column, value)| format!("{column}: {}", display_value(value)))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Natural text for a single value: bare strings, `NULL`, JSON text otherwise
#[must_use]
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
