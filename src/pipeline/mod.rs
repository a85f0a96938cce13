//! Question Pipeline
//!
//! One question cycle, strictly sequential:
//!
//! 1. Introspect the schema (fresh every cycle, never cached)
//! 2. Build the SQL prompt, with examples when a strategy is configured
//! 3. Oracle call #1, then sanitize
//! 4. Validate; rejected queries never reach the engine
//! 5. Execute and format
//! 6. Oracle call #2 for the natural-language answer
//!
//! Any stage failure ends the cycle. The caller decides whether to keep going.

use serde::Serialize;
use std::time::Instant;

use crate::capability::validate_query;
use crate::config::{OracleConfig, DEFAULT_ANSWER_MODEL, DEFAULT_MAX_TOKENS, DEFAULT_SQL_MODEL};
use crate::engine::{DatabaseEngine, ResultSet};
use crate::error::{AskqlError, Result};
use crate::fewshot::ExampleStrategy;
use crate::format::format_results;
use crate::oracle::{GenerationOracle, GenerationRequest};
use crate::prompt::{answer_prompt, PromptContext};
use crate::sanitize::{sanitize, SanitizedQuery};
use crate::schema::SchemaDescription;

/// Model parameters for the two generation calls
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSettings {
    pub sql_model: String,
    pub answer_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            sql_model: DEFAULT_SQL_MODEL.to_string(),
            answer_model: DEFAULT_ANSWER_MODEL.to_string(),
            temperature: 0.0,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl From<&OracleConfig> for GenerationSettings {
    fn from(config: &OracleConfig) -> Self {
        Self {
            sql_model: config.sql_model.clone(),
            answer_model: config.answer_model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

/// Progress notifications emitted while a cycle runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage<'a> {
    Introspecting,
    GeneratingSql,
    /// Sanitized SQL, before validation
    SqlGenerated(&'a str),
    Executing,
    /// Formatted results handed to the answer prompt
    ResultsFormatted(&'a str),
    Answering,
}

/// Outcome of a successful cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    pub question: String,
    pub sql: String,
    pub results: ResultSet,
    pub formatted: String,
    pub answer: String,
    pub execution_ms: u64,
}

/// Composes an engine, an oracle and an optional example strategy
pub struct Pipeline<E, O> {
    engine: E,
    oracle: O,
    examples: Option<Box<dyn ExampleStrategy + Send + Sync>>,
    settings: GenerationSettings,
}

impl<E, O> Pipeline<E, O>
where
    E: DatabaseEngine + Sync,
    O: GenerationOracle + Sync,
{
    pub fn new(engine: E, oracle: O, settings: GenerationSettings) -> Self {
        Self { engine, oracle, examples: None, settings }
    }

    /// Enable few-shot examples produced by `strategy`
    #[must_use]
    pub fn with_examples<S>(mut self, strategy: S) -> Self
    where
        S: ExampleStrategy + Send + Sync + 'static,
    {
        self.examples = Some(Box::new(strategy));
        self
    }

    pub const fn engine(&self) -> &E {
        &self.engine
    }

    pub const fn oracle(&self) -> &O {
        &self.oracle
    }

    pub fn uses_examples(&self) -> bool {
        self.examples.is_some()
    }

    /// Run one question cycle
    pub async fn ask(&self, question: &str) -> Result<Answer> {
        self.ask_with_progress(question, |_| {}).await
    }

    /// Run one question cycle, reporting each stage to `progress`
    pub async fn ask_with_progress<F>(&self, question: &str, mut progress: F) -> Result<Answer>
    where
        F: FnMut(Stage<'_>),
    {
        let question = question.trim();
        if question.is_empty() {
            return Err(AskqlError::invalid_input("Question must not be empty"));
        }

        let start = Instant::now();

        progress(Stage::Introspecting);
        tracing::info!("retrieving database schema");
        let schema = self.engine.introspect().await?;
        tracing::debug!(tables = schema.tables.len(), "schema retrieved");

        progress(Stage::GeneratingSql);
        tracing::info!("generating SQL");
        let sanitized = self.generate_sql(question, &schema).await?;
        progress(Stage::SqlGenerated(sanitized.as_str()));

        let validated = match validate_query(&sanitized) {
            Ok(validated) => validated,
            Err(error) => {
                tracing::warn!(sql = %sanitized, "rejected non-SELECT query");
                return Err(error);
            }
        };

        progress(Stage::Executing);
        tracing::info!("executing query");
        let results = self.engine.execute(&validated).await?;
        tracing::debug!(rows = results.rows.len(), "query executed");

        let formatted = format_results(&results);
        progress(Stage::ResultsFormatted(&formatted));

        progress(Stage::Answering);
        tracing::info!("generating answer");
        let answer = self.generate_answer(question, &formatted).await?;

        Ok(Answer {
            question: question.to_string(),
            sql: validated.as_str().to_string(),
            results,
            formatted,
            answer,
            execution_ms: start.elapsed().as_millis() as u64,
        })
    }

    /// Build the SQL prompt, call the oracle, sanitize its output
    pub async fn generate_sql(
        &self,
        question: &str,
        schema: &SchemaDescription,
    ) -> Result<SanitizedQuery> {
        let examples = self.examples.as_ref().map(|strategy| strategy.produce(schema));
        let dialect = self.engine.database_type().dialect();
        let prompt = PromptContext::new(question, schema, examples, dialect).into_prompt();
        tracing::debug!(prompt_chars = prompt.len(), model = %self.settings.sql_model, "built SQL prompt");

        let raw = self.oracle.generate(&self.request(prompt, &self.settings.sql_model)).await?;

        let sanitized = sanitize(&raw);
        if sanitized.is_empty() {
            return Err(AskqlError::generation_failed("LLM returned no SQL"));
        }

        tracing::debug!(sql = %sanitized, "sanitized SQL");
        Ok(sanitized)
    }

    /// Ask the oracle to phrase the formatted results as an answer
    pub async fn generate_answer(&self, question: &str, formatted: &str) -> Result<String> {
        let prompt = answer_prompt(question, formatted);
        tracing::debug!(prompt_chars = prompt.len(), model = %self.settings.answer_model, "built answer prompt");

        let answer = self.oracle.generate(&self.request(prompt, &self.settings.answer_model)).await?;
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(AskqlError::generation_failed("LLM returned an empty answer"));
        }

        Ok(answer.to_string())
    }

    fn request(&self, prompt: String, model: &str) -> GenerationRequest {
        GenerationRequest {
            prompt,
            model: model.to_string(),
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        }
    }
}
