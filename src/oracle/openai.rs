//! OpenAI-compatible chat completions oracle

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{GenerationOracle, GenerationRequest};
use crate::error::{AskqlError, Result};

/// Default API root
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Oracle backed by a `/chat/completions` endpoint
#[derive(Clone)]
pub struct OpenAiOracle {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

// Manual impl keeps the API key out of logs
impl std::fmt::Debug for OpenAiOracle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiOracle").field("base_url", &self.base_url).finish_non_exhaustive()
    }
}

impl OpenAiOracle {
    /// Create an oracle for the given API root
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| AskqlError::config_error(format!("Could not build HTTP client: {e}")))?;

        Ok(Self { client, api_key: api_key.into(), base_url: base_url.into() })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl<'a> ChatRequest<'a> {
    fn from_request(request: &'a GenerationRequest) -> Self {
        Self {
            model: &request.model,
            messages: vec![ChatMessage { role: "user", content: &request.prompt }],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        }
    }
}

impl GenerationOracle for OpenAiOracle {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let body = ChatRequest::from_request(request);

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AskqlError::generation_failed(format!("LLM API call failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = match response.json::<ApiErrorBody>().await {
                Ok(body) => body.error.message,
                Err(_) => status.canonical_reason().unwrap_or("unknown error").to_string(),
            };
            return Err(AskqlError::generation_failed(format!(
                "LLM API returned {status}: {detail}"
            )));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            AskqlError::generation_failed(format!("Failed to parse LLM response: {e}"))
        })?;

        extract_content(parsed)
    }
}

/// First choice's content, trimmed; empty content is a failure
fn extract_content(response: ChatResponse) -> Result<String> {
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_string())
        .unwrap_or_default();

    if content.is_empty() {
        return Err(AskqlError::generation_failed("No content in LLM response"));
    }

    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> ChatResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_request_body() {
        let request = GenerationRequest {
            prompt: "SQL Query:".to_string(),
            model: "gpt-4o".to_string(),
            temperature: 0.0,
            max_tokens: 500,
        };
        let body = serde_json::to_value(ChatRequest::from_request(&request)).unwrap();

        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["temperature"], 0.0);
        assert_eq!(body["max_tokens"], 500);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "SQL Query:");
    }

    #[test]
    fn test_extract_first_choice_trimmed() {
        let response = parse(
            r#"{"choices":[{"message":{"role":"assistant","content":"  SELECT 1;\n"}},
                           {"message":{"role":"assistant","content":"SELECT 2;"}}]}"#,
        );
        assert_eq!(extract_content(response).unwrap(), "SELECT 1;");
    }

    #[test]
    fn test_extract_empty_is_generation_failure() {
        for json in [
            r#"{"choices":[]}"#,
            r#"{}"#,
            r#"{"choices":[{"message":{"content":null}}]}"#,
            r#"{"choices":[{"message":{"content":"   "}}]}"#,
        ] {
            let error = extract_content(parse(json)).unwrap_err();
            assert_eq!(error.error_code(), "GENERATION_FAILED", "for {json}");
        }
    }

    #[test]
    fn test_endpoint_joins_base_url() {
        let oracle = OpenAiOracle::new("key", "http://localhost:8080/v1/").unwrap();
        assert_eq!(oracle.endpoint(), "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn test_debug_hides_key() {
        let oracle = OpenAiOracle::new("sk-secret", DEFAULT_BASE_URL).unwrap();
        assert!(!format!("{oracle:?}").contains("sk-secret"));
    }
}
