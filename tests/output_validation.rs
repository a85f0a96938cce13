//! Output Validation Tests
//!
//! Validates the `--json` contract end to end:
//! - Success envelopes carry question, SQL, rows and answer
//! - Error envelopes carry stable codes
//! - Rejected SQL is surfaced in `error.query`
//! - Nothing sensitive leaks into error output

use std::sync::Mutex;

use askql::capability::ValidatedQuery;
use askql::output::ASK_COMMAND;
use askql::{
    AppConfig, AskqlError, DatabaseEngine, DatabaseType, ErrorEnvelope, FileConfig,
    GenerationOracle, GenerationRequest, GenerationSettings, Pipeline, Result, ResultSet,
    SchemaDescription, SuccessEnvelope,
};
use serde_json::{json, Value};

struct StaticEngine;

impl DatabaseEngine for StaticEngine {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::SQLite
    }

    async fn introspect(&self) -> Result<SchemaDescription> {
        Ok(SchemaDescription::default())
    }

    async fn execute(&self, _query: &ValidatedQuery) -> Result<ResultSet> {
        Ok(ResultSet {
            columns: vec!["name".to_string(), "email".to_string()],
            rows: vec![vec![json!("ada"), Value::Null]],
        })
    }
}

struct Replies(Mutex<Vec<&'static str>>);

impl GenerationOracle for Replies {
    async fn generate(&self, _request: &GenerationRequest) -> Result<String> {
        let mut replies = self.0.lock().unwrap();
        if replies.is_empty() {
            return Err(AskqlError::generation_failed("no reply"));
        }
        Ok(replies.remove(0).to_string())
    }
}

fn pipeline(replies: Vec<&'static str>) -> Pipeline<StaticEngine, Replies> {
    Pipeline::new(StaticEngine, Replies(Mutex::new(replies)), GenerationSettings::default())
}

fn is_valid_json(output: &str) -> bool {
    serde_json::from_str::<Value>(output).is_ok()
}

#[tokio::test]
async fn test_success_envelope_from_cycle() {
    let answer = pipeline(vec!["SELECT name, email FROM users;", "Ada has no email."])
        .ask("Who lacks an email?")
        .await
        .unwrap();

    let output = serde_json::to_string(&SuccessEnvelope::from_answer("sqlite", answer)).unwrap();
    assert!(is_valid_json(&output));

    let value: Value = serde_json::from_str(&output).unwrap();
    assert_eq!(value["ok"], true);
    assert_eq!(value["engine"], "sqlite");
    assert_eq!(value["command"], "ask");
    assert_eq!(value["data"]["sql"], "SELECT name, email FROM users;");
    assert_eq!(value["data"]["columns"], json!(["name", "email"]));
    assert_eq!(value["data"]["rows"], json!([["ada", null]]));
    assert_eq!(value["data"]["answer"], "Ada has no email.");
    assert_eq!(value["meta"]["rows_returned"], 1);
    assert!(value["meta"]["execution_ms"].is_u64());
}

#[tokio::test]
async fn test_unsafe_envelope_surfaces_query() {
    let error = pipeline(vec!["TRUNCATE users;"]).ask("Clear users").await.unwrap_err();

    let value = serde_json::to_value(ErrorEnvelope::from_error("sqlite", ASK_COMMAND, &error)).unwrap();
    assert_eq!(value["ok"], false);
    assert_eq!(value["error"]["code"], "UNSAFE_QUERY");
    assert_eq!(value["error"]["query"], "TRUNCATE users;");
    assert!(value.get("data").is_none());
}

#[tokio::test]
async fn test_generation_error_envelope() {
    let error = pipeline(vec![]).ask("anything").await.unwrap_err();

    let value = serde_json::to_value(ErrorEnvelope::from_error("sqlite", ASK_COMMAND, &error)).unwrap();
    assert_eq!(value["error"]["code"], "GENERATION_FAILED");
    assert!(value["error"].get("query").is_none());
}

#[test]
fn test_config_error_envelope_has_no_secrets() {
    let env = |key: &str| match key {
        "OPENAI_API_KEY" => Some("sk-very-secret".to_string()),
        "PG_PASSWORD" => Some("hunter2".to_string()),
        _ => None,
    };

    let error = AppConfig::resolve(&FileConfig::default(), env).unwrap_err();
    let output = serde_json::to_string(&ErrorEnvelope::from_error("", ASK_COMMAND, &error)).unwrap();

    assert!(output.contains("CONFIG_ERROR"));
    assert!(output.contains("PG_USER"));
    assert!(!output.contains("sk-very-secret"));
    assert!(!output.contains("hunter2"));
}
