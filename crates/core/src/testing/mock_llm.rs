//! Mock LLM client for testing.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::llm::{CompletionRequest, CompletionResponse, LlmClient, LlmError, LlmUsage};

/// Mock implementation of the LlmClient trait.
///
/// Queued responses are returned in order; once the queue is empty the
/// default response is used, and without one the call fails as not
/// configured. Every request is recorded for assertions.
pub struct MockLlmClient {
    queue: Arc<RwLock<VecDeque<Result<String, LlmError>>>>,
    default_response: Arc<RwLock<Option<String>>>,
    requests: Arc<RwLock<Vec<CompletionRequest>>>,
}

impl std::fmt::Debug for MockLlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockLlmClient")
            .field("queue", &"<queue>")
            .field("requests", &"<requests>")
            .finish()
    }
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self {
            queue: Arc::new(RwLock::new(VecDeque::new())),
            default_response: Arc::new(RwLock::new(None)),
            requests: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Queue the result of the next unanswered call.
    pub async fn queue_response(&self, response: Result<String, LlmError>) {
        self.queue.write().await.push_back(response);
    }

    /// Response used when the queue is empty.
    pub async fn set_default_response(&self, text: impl Into<String>) {
        *self.default_response.write().await = Some(text.into());
    }

    pub async fn recorded_requests(&self) -> Vec<CompletionRequest> {
        self.requests.read().await.clone()
    }

    pub async fn request_count(&self) -> usize {
        self.requests.read().await.len()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    fn provider(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.requests.write().await.push(request);

        let next = self.queue.write().await.pop_front();
        let text = match next {
            Some(result) => result?,
            None => self
                .default_response
                .read()
                .await
                .clone()
                .ok_or(LlmError::NotConfigured)?,
        };

        Ok(CompletionResponse {
            text,
            model: "mock-model".to_string(),
            usage: LlmUsage::default(),
        })
    }
}
