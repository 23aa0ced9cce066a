//! LLM-backed article transform with transient retry and content-risk fallback.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use super::prompt::{build_prompt, SYSTEM_PROMPT};
use super::{ArticleTransform, TransformError, TransformKind};
use crate::llm::{CompletionRequest, LlmClient, LlmConfig, RetryConfig};
use crate::metrics;
use crate::segmenter::{truncate_chars, Article};

/// Appended when content exceeds the context budget.
const OVERSIZE_MARKER: &str = "\n\n[... 原文过长已截断 ...]";

/// Appended to the shortened variants sent after a content-policy rejection.
const MODERATION_MARKER: &str = "\n\n[... 为通过审核已截断 ...]";

/// Sends one prompt per article to an [`LlmClient`].
///
/// Transient transport errors are retried with exponential backoff. A
/// content-policy rejection re-sends the article with progressively shorter
/// content, one variant per configured fallback stage.
pub struct LlmTransform {
    client: Arc<dyn LlmClient>,
    kind: TransformKind,
    temperature: f32,
    max_tokens: Option<u32>,
    max_content_chars: usize,
    fallback_stages: Vec<usize>,
    content_risk_signal: String,
    retry: RetryConfig,
}

impl LlmTransform {
    pub fn new(client: Arc<dyn LlmClient>, kind: TransformKind, config: &LlmConfig) -> Self {
        Self {
            client,
            kind,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_content_chars: config.max_content_chars,
            fallback_stages: config.fallback_stages.clone(),
            content_risk_signal: config.content_risk_signal.clone(),
            retry: config.retry.clone(),
        }
    }

    pub fn kind(&self) -> TransformKind {
        self.kind
    }

    /// Content variants in the order they are tried.
    fn content_variants(&self, content: &str) -> Vec<String> {
        let capped = if content.chars().count() > self.max_content_chars {
            format!("{}{OVERSIZE_MARKER}", truncate_chars(content, self.max_content_chars))
        } else {
            content.to_string()
        };
        let capped_len = capped.chars().count();

        let mut variants = vec![capped.clone()];
        for &stage in &self.fallback_stages {
            if capped_len > stage {
                variants.push(format!("{}{MODERATION_MARKER}", truncate_chars(&capped, stage)));
            }
        }
        variants
    }

    async fn complete_with_retry(&self, request: CompletionRequest) -> Result<String, TransformError> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.client.complete(request.clone()).await {
                Ok(response) => return Ok(response.text),
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient LLM failure, retrying"
                    );
                    metrics::LLM_RETRIES.inc();
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) if e.is_transient() => {
                    return Err(TransformError::RetriesExhausted {
                        attempts: attempt,
                        source: e,
                    })
                }
                Err(e) => return Err(TransformError::Llm(e)),
            }
        }
    }

    async fn run(&self, article: &Article, index: usize, total: usize) -> Result<String, TransformError> {
        let variants = self.content_variants(&article.content);
        let mut rejection = None;

        for (stage, content) in variants.iter().enumerate() {
            let prompt = build_prompt(self.kind, article, content, index, total);
            let request = CompletionRequest::new(prompt)
                .with_system(SYSTEM_PROMPT)
                .with_temperature(self.temperature)
                .with_max_tokens(self.max_tokens);

            match self.complete_with_retry(request).await {
                Ok(text) if text.trim().is_empty() => return Err(TransformError::EmptyResponse),
                Ok(text) => {
                    debug!(index, stage, chars = text.chars().count(), "Article transformed");
                    return Ok(text);
                }
                Err(TransformError::Llm(e)) if e.is_content_risk(&self.content_risk_signal) => {
                    if let Some(next) = variants.get(stage + 1) {
                        warn!(
                            index,
                            stage,
                            next_chars = next.chars().count(),
                            "Content rejected, retrying with shorter content"
                        );
                        metrics::CONTENT_RISK_FALLBACKS.inc();
                    }
                    rejection = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(TransformError::ContentRejected(
            rejection.map_or_else(String::new, |e| e.to_string()),
        ))
    }
}

#[async_trait]
impl ArticleTransform for LlmTransform {
    fn name(&self) -> &str {
        self.kind.as_str()
    }

    async fn transform(
        &self,
        article: &Article,
        index: usize,
        total: usize,
    ) -> Result<String, TransformError> {
        let start = Instant::now();
        let result = self.run(article, index, total).await;

        let outcome = if result.is_ok() { "success" } else { "failed" };
        metrics::TRANSFORMS_TOTAL
            .with_label_values(&[self.kind.as_str(), outcome])
            .inc();
        metrics::TRANSFORM_DURATION
            .with_label_values(&[self.kind.as_str()])
            .observe(start.elapsed().as_secs_f64());

        result
    }
}
