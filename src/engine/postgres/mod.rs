//! `PostgreSQL` Database Engine Implementation
//!
//! This module implements the `DatabaseEngine` trait for `PostgreSQL` databases.
//!
//! # Features
//! - Client-server connections via TCP
//! - Schema introspection via `information_schema` (schema `public`)
//! - Read-only sessions (`default_transaction_read_only`) set before any query
//! - Rich type support (JSON/JSONB, timestamps, UUID, NUMERIC, arrays)
//!
//! # Implementation Notes
//! - Uses `tokio-postgres` (async driver, requires tokio runtime)
//! - One connection per call, closed when the client is dropped
//! - JSON/JSONB preserved as nested JSON
//! - BYTEA data is Base64-encoded for JSON safety
//! - NUMERIC decoded to its exact decimal text
//! - Row limits enforced in application code

use std::fmt::Write;
use std::time::Instant;

use serde_json::Value;
use tokio_postgres::types::{FromSql, Kind, Type};
use tokio_postgres::{Client, Config, NoTls, Row};

use crate::capability::ValidatedQuery;
use crate::engine::{ConnectionConfig, DatabaseEngine, DatabaseType, QueryLimits, ResultSet};
use crate::error::{AskqlError, Result};
use crate::schema::{ColumnDescriptor, SchemaDescription, TableDescriptor};

/// Schema introspected for generation prompts
const DEFAULT_SCHEMA: &str = "public";

/// `PostgreSQL` database engine implementation
#[derive(Debug, Clone)]
pub struct PostgresEngine {
    config: ConnectionConfig,
    limits: QueryLimits,
}

impl PostgresEngine {
    /// Create an engine, validating the connection parameters up front
    pub fn new(config: ConnectionConfig, limits: QueryLimits) -> Result<Self> {
        if config.engine != DatabaseType::Postgres {
            return Err(AskqlError::invalid_input(format!(
                "Expected PostgreSQL engine, got {}",
                config.engine
            )));
        }

        build_pg_config(&config)?;

        Ok(Self { config, limits })
    }
}

impl DatabaseEngine for PostgresEngine {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::Postgres
    }

    async fn introspect(&self) -> Result<SchemaDescription> {
        let client = connect_read_only(&self.config).await?;

        let table_names = list_tables(&client, DEFAULT_SCHEMA).await?;

        let mut tables = Vec::with_capacity(table_names.len());
        for name in table_names {
            let columns = introspect_columns(&client, DEFAULT_SCHEMA, &name).await?;
            tables.push(TableDescriptor { name, columns });
        }

        tracing::debug!(tables = tables.len(), "introspected PostgreSQL schema");
        Ok(SchemaDescription::new(tables))
    }

    async fn execute(&self, query: &ValidatedQuery) -> Result<ResultSet> {
        let client = connect_read_only(&self.config).await?;

        let start = Instant::now();
        let result = execute_query(&client, query.as_str(), &self.limits).await?;
        tracing::debug!(
            rows = result.rows.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "executed query on PostgreSQL"
        );

        Ok(result)
    }
}

/// Build `PostgreSQL` connection config from `ConnectionConfig`
fn build_pg_config(config: &ConnectionConfig) -> Result<Config> {
    let host = config
        .host
        .as_ref()
        .ok_or_else(|| AskqlError::invalid_input("PostgreSQL requires 'host' parameter"))?;

    let port = config
        .port
        .ok_or_else(|| AskqlError::invalid_input("PostgreSQL requires 'port' parameter"))?;

    let user = config
        .user
        .as_ref()
        .ok_or_else(|| AskqlError::invalid_input("PostgreSQL requires 'user' parameter"))?;

    let password = config
        .password
        .as_ref()
        .ok_or_else(|| AskqlError::invalid_input("PostgreSQL requires 'password' parameter"))?;

    let database = config
        .database
        .as_ref()
        .ok_or_else(|| AskqlError::invalid_input("PostgreSQL requires 'database' parameter"))?;

    let mut pg_config = Config::new();
    pg_config.host(host).port(port).user(user).password(password).dbname(database);

    Ok(pg_config)
}

/// Connect and force the session read-only before anything else runs
async fn connect_read_only(config: &ConnectionConfig) -> Result<Client> {
    let pg_config = build_pg_config(config)?;

    let (client, connection) = pg_config.connect(NoTls).await.map_err(|e| {
        AskqlError::connection_failed(format!("Failed to connect to PostgreSQL: {e}"))
    })?;

    // Note: Connection errors are not logged to prevent credential leakage
    tokio::spawn(async move {
        let _ = connection.await;
    });

    client.batch_execute("SET default_transaction_read_only = ON").await.map_err(|e| {
        AskqlError::connection_failed(format!("Failed to set session read-only: {e}"))
    })?;

    Ok(client)
}

/// List tables and views in the schema, ordered by name
async fn list_tables(client: &Client, schema: &str) -> Result<Vec<String>> {
    let query = "
        SELECT table_name::text
        FROM information_schema.tables
        WHERE table_schema = $1
        ORDER BY table_name";

    let rows = client.query(query, &[&schema]).await.map_err(|e| {
        AskqlError::connection_failed(format!("Failed to list tables in schema '{schema}': {e}"))
    })?;

    Ok(rows.iter().map(|row| row.get(0)).collect())
}

/// Introspect table columns in physical order
async fn introspect_columns(
    client: &Client,
    schema: &str,
    table_name: &str,
) -> Result<Vec<ColumnDescriptor>> {
    let query = "
        SELECT column_name::text, data_type::text, is_nullable::text
        FROM information_schema.columns
        WHERE table_schema = $1 AND table_name = $2
        ORDER BY ordinal_position";

    let rows = client.query(query, &[&schema, &table_name]).await.map_err(|e| {
        AskqlError::connection_failed(format!(
            "Failed to query columns for {schema}.{table_name}: {e}"
        ))
    })?;

    let columns = rows
        .iter()
        .map(|row| {
            let is_nullable: String = row.get(2);
            ColumnDescriptor { name: row.get(0), data_type: row.get(1), nullable: is_nullable == "YES" }
        })
        .collect();

    Ok(columns)
}

/// Execute query and return `ResultSet`
async fn execute_query(client: &Client, query: &str, limits: &QueryLimits) -> Result<ResultSet> {
    let stmt = client
        .prepare(query)
        .await
        .map_err(|e| AskqlError::query_failed(format!("Failed to prepare query: {e}")))?;

    let rows = client
        .query(&stmt, &[])
        .await
        .map_err(|e| AskqlError::query_failed(format!("Failed to execute query: {e}")))?;

    let columns: Vec<String> = stmt.columns().iter().map(|c| c.name().to_string()).collect();

    let row_limit = limits.max_rows.unwrap_or(usize::MAX);
    let rows = rows
        .iter()
        .take(row_limit)
        .map(|row| row_to_json(columns.len(), row))
        .collect::<Result<Vec<_>>>()?;

    Ok(ResultSet { columns, rows })
}

/// Convert a `PostgreSQL` row to a JSON-safe `Vec`
fn row_to_json(width: usize, row: &Row) -> Result<Vec<Value>> {
    (0..width).map(|idx| postgres_value_to_json(row, idx)).collect()
}

/// Read a nullable value, mapping driver errors to `QueryFailed`
fn get<'a, T: FromSql<'a>>(row: &'a Row, idx: usize, what: &str) -> Result<Option<T>> {
    row.try_get::<_, Option<T>>(idx)
        .map_err(|e| AskqlError::query_failed(format!("Failed to get {what} value: {e}")))
}

/// Convert `PostgreSQL` value to JSON value
fn postgres_value_to_json(row: &Row, idx: usize) -> Result<Value> {
    use base64::Engine;
    use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

    let col_type = row.columns()[idx].type_();

    let value = match *col_type {
        Type::BOOL => get::<bool>(row, idx, "boolean")?.map(Value::Bool),

        Type::INT2 => get::<i16>(row, idx, "i16")?.map(Value::from),
        Type::INT4 => get::<i32>(row, idx, "i32")?.map(Value::from),
        Type::INT8 => get::<i64>(row, idx, "i64")?.map(Value::from),
        Type::OID => get::<u32>(row, idx, "oid")?.map(Value::from),

        // NaN/Infinity become null
        Type::FLOAT4 => get::<f32>(row, idx, "f32")?.map(|v| float_to_json(f64::from(v))),
        Type::FLOAT8 => get::<f64>(row, idx, "f64")?.map(float_to_json),

        Type::NUMERIC => get::<PgNumeric>(row, idx, "numeric")?.map(|n| Value::String(n.0)),

        Type::VARCHAR | Type::TEXT | Type::BPCHAR | Type::NAME => {
            get::<String>(row, idx, "string")?.map(Value::String)
        }

        // SQL NULL and JSON null both map to null
        Type::JSON | Type::JSONB => get::<Value>(row, idx, "JSON")?,

        Type::BYTEA => get::<Vec<u8>>(row, idx, "bytea")?
            .map(|v| Value::String(base64::engine::general_purpose::STANDARD.encode(v))),

        Type::TIMESTAMP => get::<NaiveDateTime>(row, idx, "timestamp")?
            .map(|v| Value::String(v.format("%Y-%m-%dT%H:%M:%S").to_string())),
        Type::TIMESTAMPTZ => {
            get::<DateTime<Utc>>(row, idx, "timestamptz")?.map(|v| Value::String(v.to_rfc3339()))
        }
        Type::DATE => get::<NaiveDate>(row, idx, "date")?
            .map(|v| Value::String(v.format("%Y-%m-%d").to_string())),
        Type::TIME => get::<NaiveTime>(row, idx, "time")?
            .map(|v| Value::String(v.format("%H:%M:%S").to_string())),

        Type::UUID => get::<uuid::Uuid>(row, idx, "UUID")?.map(|v| Value::String(v.to_string())),

        Type::TEXT_ARRAY | Type::VARCHAR_ARRAY => {
            get::<Vec<Option<String>>>(row, idx, "text array")?.map(Value::from)
        }
        Type::INT4_ARRAY => get::<Vec<Option<i32>>>(row, idx, "integer array")?.map(Value::from),
        Type::INT8_ARRAY => get::<Vec<Option<i64>>>(row, idx, "bigint array")?.map(Value::from),

        _ if matches!(col_type.kind(), Kind::Enum(_)) => {
            get::<EnumLabel>(row, idx, "enum")?.map(|label| Value::String(label.0))
        }

        // Default: try to get as string (citext and friends)
        _ => row
            .try_get::<_, Option<String>>(idx)
            .map_err(|e| {
                AskqlError::query_failed(format!(
                    "Failed to convert PostgreSQL type '{}' to JSON: {e}",
                    col_type.name()
                ))
            })?
            .map(Value::String),
    };

    Ok(value.unwrap_or(Value::Null))
}

fn float_to_json(v: f64) -> Value {
    serde_json::Number::from_f64(v).map_or(Value::Null, Value::Number)
}

/// NUMERIC as exact decimal text
struct PgNumeric(String);

impl<'a> FromSql<'a> for PgNumeric {
    fn from_sql(
        _ty: &Type,
        raw: &'a [u8],
    ) -> std::result::Result<Self, Box<dyn std::error::Error + Sync + Send>> {
        decode_numeric(raw).map(Self)
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::NUMERIC
    }
}

/// Enum label (binary format of an enum is its label text)
struct EnumLabel(String);

impl<'a> FromSql<'a> for EnumLabel {
    fn from_sql(
        _ty: &Type,
        raw: &'a [u8],
    ) -> std::result::Result<Self, Box<dyn std::error::Error + Sync + Send>> {
        Ok(Self(std::str::from_utf8(raw)?.to_string()))
    }

    fn accepts(ty: &Type) -> bool {
        matches!(ty.kind(), Kind::Enum(_))
    }
}

const NUMERIC_POS: u16 = 0x0000;
const NUMERIC_NEG: u16 = 0x4000;
const NUMERIC_NAN: u16 = 0xC000;
const NUMERIC_PINF: u16 = 0xD000;
const NUMERIC_NINF: u16 = 0xF000;

/// Decode the binary NUMERIC wire format
///
/// Layout: ndigits, weight, sign, dscale (all 16-bit big-endian), then
/// `ndigits` base-10000 digits. Digit `i` has exponent `weight - i`.
fn decode_numeric(raw: &[u8]) -> std::result::Result<String, Box<dyn std::error::Error + Sync + Send>> {
    if raw.len() < 8 {
        return Err("numeric value too short".into());
    }

    let read = |offset: usize| u16::from_be_bytes([raw[offset], raw[offset + 1]]);

    let ndigits = usize::from(read(0));
    let weight = i32::from(read(2) as i16);
    let sign = read(4);
    let dscale = usize::from(read(6));

    if raw.len() != 8 + ndigits * 2 {
        return Err("numeric value has inconsistent length".into());
    }

    match sign {
        NUMERIC_NAN => return Ok("NaN".to_string()),
        NUMERIC_PINF => return Ok("Infinity".to_string()),
        NUMERIC_NINF => return Ok("-Infinity".to_string()),
        NUMERIC_POS | NUMERIC_NEG => {}
        other => return Err(format!("invalid numeric sign 0x{other:04X}").into()),
    }

    let digits: Vec<u16> = (0..ndigits).map(|i| read(8 + i * 2)).collect();
    let digit_at = |index: i32| -> u16 {
        usize::try_from(index).ok().and_then(|i| digits.get(i).copied()).unwrap_or(0)
    };

    let mut out = String::new();
    if sign == NUMERIC_NEG {
        out.push('-');
    }

    if weight < 0 {
        out.push('0');
    } else {
        for index in 0..=weight {
            if index == 0 {
                let _ = write!(out, "{}", digit_at(index));
            } else {
                let _ = write!(out, "{:04}", digit_at(index));
            }
        }
    }

    if dscale > 0 {
        let mut fraction = String::with_capacity(dscale + 4);
        let mut index = weight + 1;
        while fraction.len() < dscale {
            let _ = write!(fraction, "{:04}", digit_at(index));
            index += 1;
        }
        fraction.truncate(dscale);
        out.push('.');
        out.push_str(&fraction);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Note: Tests marked #[ignore] require a running PostgreSQL instance
    // cargo test --features postgres -- --ignored

    fn local_config() -> ConnectionConfig {
        ConnectionConfig::postgres(
            "localhost".to_string(),
            5432,
            "postgres".to_string(),
            "postgres".to_string(),
            "postgres".to_string(),
        )
    }

    fn numeric_bytes(weight: i16, sign: u16, dscale: u16, digits: &[u16]) -> Vec<u8> {
        let mut raw = Vec::new();
        raw.extend_from_slice(&(digits.len() as u16).to_be_bytes());
        raw.extend_from_slice(&weight.to_be_bytes());
        raw.extend_from_slice(&sign.to_be_bytes());
        raw.extend_from_slice(&dscale.to_be_bytes());
        for d in digits {
            raw.extend_from_slice(&d.to_be_bytes());
        }
        raw
    }

    #[test]
    fn test_build_config() {
        assert!(build_pg_config(&local_config()).is_ok());
    }

    #[test]
    fn test_missing_password_error() {
        let mut config = local_config();
        config.password = None;

        let error = build_pg_config(&config).unwrap_err();
        assert!(error.message().contains("PostgreSQL requires 'password' parameter"));
    }

    #[test]
    fn test_missing_database_error() {
        let mut config = local_config();
        config.database = None;

        let error = build_pg_config(&config).unwrap_err();
        assert!(error.message().contains("PostgreSQL requires 'database' parameter"));
    }

    #[test]
    fn test_new_rejects_wrong_engine() {
        let mut config = local_config();
        config.engine = DatabaseType::SQLite;

        let error = PostgresEngine::new(config, QueryLimits::default()).unwrap_err();
        assert!(error.message().contains("Expected PostgreSQL engine"));
    }

    #[test]
    fn test_decode_numeric_fraction() {
        // 12.50
        let raw = numeric_bytes(0, NUMERIC_POS, 2, &[12, 5000]);
        assert_eq!(decode_numeric(&raw).unwrap(), "12.50");
    }

    #[test]
    fn test_decode_numeric_large_integer() {
        // 1234567
        let raw = numeric_bytes(1, NUMERIC_POS, 0, &[123, 4567]);
        assert_eq!(decode_numeric(&raw).unwrap(), "1234567");

        // 10000 (trailing zero groups are omitted on the wire)
        let raw = numeric_bytes(1, NUMERIC_POS, 0, &[1]);
        assert_eq!(decode_numeric(&raw).unwrap(), "10000");
    }

    #[test]
    fn test_decode_numeric_small_fraction() {
        // -0.0005
        let raw = numeric_bytes(-1, NUMERIC_NEG, 4, &[5]);
        assert_eq!(decode_numeric(&raw).unwrap(), "-0.0005");

        // 0.00000005
        let raw = numeric_bytes(-2, NUMERIC_POS, 8, &[5]);
        assert_eq!(decode_numeric(&raw).unwrap(), "0.00000005");
    }

    #[test]
    fn test_decode_numeric_zero_and_specials() {
        assert_eq!(decode_numeric(&numeric_bytes(0, NUMERIC_POS, 0, &[])).unwrap(), "0");
        assert_eq!(decode_numeric(&numeric_bytes(0, NUMERIC_POS, 2, &[])).unwrap(), "0.00");
        assert_eq!(decode_numeric(&numeric_bytes(0, NUMERIC_NAN, 0, &[])).unwrap(), "NaN");
        assert_eq!(decode_numeric(&numeric_bytes(0, NUMERIC_NINF, 0, &[])).unwrap(), "-Infinity");
    }

    #[test]
    fn test_decode_numeric_malformed() {
        assert!(decode_numeric(&[0, 1]).is_err());
        // Claims two digits, carries one
        let mut raw = numeric_bytes(0, NUMERIC_POS, 0, &[1]);
        raw[1] = 2;
        assert!(decode_numeric(&raw).is_err());
    }

    #[tokio::test]
    #[ignore = "Requires running PostgreSQL instance"]
    async fn test_introspect_public_schema() {
        let engine = PostgresEngine::new(local_config(), QueryLimits::default()).unwrap();
        let schema = engine.introspect().await.expect("introspection failed");

        let names: Vec<&str> = schema.table_names().collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
    }

    #[tokio::test]
    #[ignore = "Requires running PostgreSQL instance"]
    async fn test_execute_select() {
        use crate::capability::validate_query;
        use crate::sanitize::sanitize;

        let engine = PostgresEngine::new(local_config(), QueryLimits::default()).unwrap();
        let query =
            validate_query(&sanitize("SELECT 1 AS num, 'test' AS str, 12.50::numeric AS amount"))
                .unwrap();

        let result = engine.execute(&query).await.expect("query failed");
        assert_eq!(result.columns, vec!["num", "str", "amount"]);
        assert_eq!(result.rows[0][0], serde_json::json!(1));
        assert_eq!(result.rows[0][1], serde_json::json!("test"));
        assert_eq!(result.rows[0][2], serde_json::json!("12.50"));
    }

    #[tokio::test]
    #[ignore = "Requires running PostgreSQL instance"]
    async fn test_session_is_read_only() {
        use crate::capability::validate_query;
        use crate::sanitize::sanitize;

        // Passes the prefix gate, must still be refused by the read-only session
        let engine = PostgresEngine::new(local_config(), QueryLimits::default()).unwrap();
        let query = validate_query(&sanitize(
            "SELECT * INTO askql_should_not_exist FROM (SELECT 1 AS x) s",
        ))
        .unwrap();

        let error = engine.execute(&query).await.unwrap_err();
        assert_eq!(error.error_code(), "QUERY_FAILED");
    }

    #[tokio::test]
    #[ignore = "Requires running PostgreSQL instance"]
    async fn test_execute_max_rows_limit() {
        use crate::capability::validate_query;
        use crate::sanitize::sanitize;

        let limits = QueryLimits { max_rows: Some(5) };
        let engine = PostgresEngine::new(local_config(), limits).unwrap();
        let query = validate_query(&sanitize("SELECT generate_series(1, 10) AS n")).unwrap();

        let result = engine.execute(&query).await.unwrap();
        assert_eq!(result.rows.len(), 5);
    }
}
