//! LLM client abstraction and the OpenAI-compatible implementation.

mod config;
mod openai;

pub use config::{LlmConfig, RetryConfig};
pub use openai::OpenAiCompatibleClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Error type for LLM operations.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Not configured")]
    NotConfigured,
}

impl LlmError {
    /// Transport-level failures worth retrying unchanged.
    pub fn is_transient(&self) -> bool {
        match self {
            LlmError::Http(_) | LlmError::Timeout(_) => true,
            LlmError::Api { status, .. } => *status == 429 || *status >= 500,
            LlmError::Json(_) | LlmError::NotConfigured => false,
        }
    }

    /// True if the service rejected the content itself.
    pub fn is_content_risk(&self, signal: &str) -> bool {
        match self {
            LlmError::Api { message, .. } => !signal.is_empty() && message.contains(signal),
            _ => false,
        }
    }
}

/// Token usage statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Request for a completion.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// System prompt (instructions for the model)
    pub system: Option<String>,
    /// User message
    pub prompt: String,
    /// Maximum tokens to generate; the provider default applies when unset
    pub max_tokens: Option<u32>,
    pub temperature: f32,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            max_tokens: None,
            temperature: 0.7,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Response from a completion.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// The generated text
    pub text: String,
    pub usage: LlmUsage,
    /// Model used
    pub model: String,
}

/// Trait for LLM clients.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Provider name (e.g., "deepseek", "openai")
    fn provider(&self) -> &str;

    /// Model name (e.g., "deepseek-chat")
    fn model(&self) -> &str;

    /// Send a completion request and get a text response.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_request_builder() {
        let request = CompletionRequest::new("Hello")
            .with_system("You are helpful")
            .with_max_tokens(Some(100))
            .with_temperature(0.5);

        assert_eq!(request.prompt, "Hello");
        assert_eq!(request.system, Some("You are helpful".to_string()));
        assert_eq!(request.max_tokens, Some(100));
        assert_eq!(request.temperature, 0.5);
    }

    #[test]
    fn test_transient_classification() {
        assert!(LlmError::Http("connection reset".into()).is_transient());
        assert!(LlmError::Timeout(Duration::from_secs(1)).is_transient());
        assert!(LlmError::Api {
            status: 503,
            message: "overloaded".into()
        }
        .is_transient());
        assert!(!LlmError::Api {
            status: 400,
            message: "bad request".into()
        }
        .is_transient());
        assert!(!LlmError::Json("eof".into()).is_transient());
        assert!(!LlmError::NotConfigured.is_transient());
    }

    #[test]
    fn test_content_risk_detection() {
        let err = LlmError::Api {
            status: 400,
            message: "{\"error\":{\"message\":\"Content Exists Risk\"}}".into(),
        };
        assert!(err.is_content_risk("Content Exists Risk"));
        assert!(!err.is_content_risk(""));
        assert!(!LlmError::Http("Content Exists Risk".into()).is_content_risk("Content Exists Risk"));
    }
}
