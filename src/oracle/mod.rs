//! Generation Oracle
//!
//! The text-generation service is an opaque `prompt -> text` function to the
//! pipeline. It is called twice per question: once for SQL, once for the
//! natural-language answer.

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub mod openai;

/// A single generation call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Complete prompt text
    pub prompt: String,

    /// Model identifier understood by the oracle
    pub model: String,

    /// Sampling temperature (0 for repeatable output)
    pub temperature: f32,

    /// Output length ceiling
    pub max_tokens: u32,
}

/// Text-generation backend
pub trait GenerationOracle {
    /// Generate text for the request
    ///
    /// Failures and empty responses are `GenerationFailed`.
    fn generate(
        &self,
        request: &GenerationRequest,
    ) -> impl std::future::Future<Output = Result<String>> + Send;
}
