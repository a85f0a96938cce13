//! `SQLite` Database Engine Implementation
//!
//! This module implements the `DatabaseEngine` trait for `SQLite` databases.
//!
//! # Features
//! - File-based connections (`/path/to/db.sqlite`)
//! - Schema introspection via `sqlite_master` and `PRAGMA table_info`
//! - Read-only open flags plus `PRAGMA query_only` on every connection
//!
//! # Implementation Notes
//! - Uses `rusqlite` (synchronous driver, no async needed)
//! - BLOB data is Base64-encoded for JSON safety
//! - Row limits enforced in application code

use rusqlite::{Connection, OpenFlags, Row};
use std::path::Path;
use std::time::Instant;

use crate::capability::ValidatedQuery;
use crate::engine::{ConnectionConfig, DatabaseEngine, DatabaseType, QueryLimits, ResultSet};
use crate::error::{AskqlError, Result};
use crate::schema::{ColumnDescriptor, SchemaDescription, TableDescriptor};

/// `SQLite` database engine implementation
#[derive(Debug, Clone)]
pub struct SqliteEngine {
    config: ConnectionConfig,
    limits: QueryLimits,
}

impl SqliteEngine {
    /// Create an engine, validating the connection parameters up front
    pub fn new(config: ConnectionConfig, limits: QueryLimits) -> Result<Self> {
        if config.engine != DatabaseType::SQLite {
            return Err(AskqlError::invalid_input(format!(
                "Expected SQLite engine, got {}",
                config.engine
            )));
        }

        if config.file.is_none() {
            return Err(AskqlError::invalid_input("SQLite requires 'file' parameter"));
        }

        Ok(Self { config, limits })
    }

    fn open(&self) -> Result<Connection> {
        let file_path = self
            .config
            .file
            .as_deref()
            .ok_or_else(|| AskqlError::invalid_input("SQLite requires 'file' parameter"))?;

        open_read_only(file_path)
    }
}

impl DatabaseEngine for SqliteEngine {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::SQLite
    }

    async fn introspect(&self) -> Result<SchemaDescription> {
        let conn = self.open()?;

        let mut stmt = conn
            .prepare(
                "SELECT name FROM sqlite_master
                 WHERE type IN ('table', 'view')
                 AND name NOT LIKE 'sqlite_%'
                 ORDER BY name",
            )
            .map_err(|e| AskqlError::connection_failed(format!("Failed to query tables: {e}")))?;

        let table_names: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .map_err(|e| {
                AskqlError::connection_failed(format!("Failed to fetch table names: {e}"))
            })?
            .collect::<std::result::Result<Vec<String>, _>>()
            .map_err(|e| {
                AskqlError::connection_failed(format!("Failed to collect table names: {e}"))
            })?;

        let mut tables = Vec::with_capacity(table_names.len());
        for table_name in table_names {
            let columns = introspect_columns(&conn, &table_name)?;
            tables.push(TableDescriptor { name: table_name, columns });
        }

        tracing::debug!(tables = tables.len(), "introspected SQLite schema");
        Ok(SchemaDescription::new(tables))
    }

    async fn execute(&self, query: &ValidatedQuery) -> Result<ResultSet> {
        let conn = self.open()?;

        let start = Instant::now();
        let result = execute_query(&conn, query.as_str(), &self.limits)?;
        tracing::debug!(
            rows = result.rows.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "executed query on SQLite"
        );

        Ok(result)
    }
}

/// Open `SQLite` connection that cannot write
fn open_read_only(path: &Path) -> Result<Connection> {
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY).map_err(|e| {
        AskqlError::connection_failed(format!("Failed to open SQLite database: {e}"))
    })?;

    conn.pragma_update(None, "query_only", true).map_err(|e| {
        AskqlError::connection_failed(format!("Failed to set session read-only: {e}"))
    })?;

    Ok(conn)
}

/// Introspect columns of a single table via `PRAGMA table_info`
fn introspect_columns(conn: &Connection, table_name: &str) -> Result<Vec<ColumnDescriptor>> {
    let quoted = table_name.replace('"', "\"\"");
    let mut stmt = conn.prepare(&format!("PRAGMA table_info(\"{quoted}\")")).map_err(|e| {
        AskqlError::connection_failed(format!("Failed to prepare table_info for {table_name}: {e}"))
    })?;

    let columns = stmt
        .query_map([], |row| {
            Ok(ColumnDescriptor {
                name: row.get::<_, String>(1)?,
                data_type: row.get::<_, String>(2)?,
                nullable: row.get::<_, i32>(3)? == 0, // notnull column: 0 = nullable, 1 = not null
            })
        })
        .map_err(|e| {
            AskqlError::connection_failed(format!("Failed to query columns for {table_name}: {e}"))
        })?
        .collect::<std::result::Result<Vec<ColumnDescriptor>, _>>()
        .map_err(|e| {
            AskqlError::connection_failed(format!(
                "Failed to collect columns for {table_name}: {e}"
            ))
        })?;

    Ok(columns)
}

/// Execute query and return `ResultSet`
fn execute_query(conn: &Connection, query: &str, limits: &QueryLimits) -> Result<ResultSet> {
    let mut stmt = conn
        .prepare(query)
        .map_err(|e| AskqlError::query_failed(format!("Failed to prepare query: {e}")))?;

    let columns: Vec<String> = stmt.column_names().iter().map(|s| (*s).to_string()).collect();
    let width = columns.len();

    let rows = stmt
        .query([])
        .map_err(|e| AskqlError::query_failed(format!("Failed to execute query: {e}")))?;

    let row_limit = limits.max_rows.unwrap_or(usize::MAX);
    let rows = rows
        .mapped(|row| row_to_json(width, row))
        .take(row_limit)
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| AskqlError::query_failed(format!("Failed to fetch row: {e}")))?;

    Ok(ResultSet { columns, rows })
}

/// Convert a `SQLite` row to a JSON-safe `Vec`
fn row_to_json(width: usize, row: &Row) -> std::result::Result<Vec<serde_json::Value>, rusqlite::Error> {
    (0..width).map(|idx| sqlite_value_to_json(row, idx)).collect()
}

/// Convert `SQLite` value to JSON value
fn sqlite_value_to_json(
    row: &Row,
    idx: usize,
) -> std::result::Result<serde_json::Value, rusqlite::Error> {
    use rusqlite::types::ValueRef;

    let value_ref = row.get_ref(idx)?;

    Ok(match value_ref {
        ValueRef::Null => serde_json::Value::Null,
        ValueRef::Integer(i) => serde_json::Value::Number(i.into()),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map_or(serde_json::Value::Null, serde_json::Value::Number), // Handle NaN/Infinity as null
        ValueRef::Text(s) => {
            let text = std::str::from_utf8(s).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    idx,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;
            serde_json::Value::String(text.to_string())
        }
        ValueRef::Blob(b) => {
            use base64::Engine;
            let encoded = base64::engine::general_purpose::STANDARD.encode(b);
            serde_json::Value::String(encoded)
        }
    })
}
