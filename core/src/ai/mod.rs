pub mod gemini;
mod response;

pub use gemini::GeminiClient;
pub use response::{analysis_response_schema, parse_json_response, strip_code_fence};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("no API key configured")]
    MissingApiKey,
    #[error("provider returned HTTP {status}: {body}")]
    Provider { status: u16, body: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("model returned an empty response")]
    EmptyResponse,
}

/// One call to the language model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelRequest {
    pub model: String,
    pub prompt: String,
    /// Structured-output schema; `None` asks for free text.
    pub response_schema: Option<Value>,
}

impl ModelRequest {
    pub fn text(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            response_schema: None,
        }
    }

    pub fn structured(model: impl Into<String>, prompt: impl Into<String>, schema: Value) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            response_schema: Some(schema),
        }
    }
}

#[async_trait]
pub trait ModelClient: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether a credential is available; checked before any request is built.
    fn has_credentials(&self) -> bool {
        true
    }

    async fn generate(&self, request: &ModelRequest) -> Result<String, ModelError>;
}

pub(crate) fn normalize_api_key(key: Option<String>) -> Option<String> {
    key.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
