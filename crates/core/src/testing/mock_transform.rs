//! Mock article transform for testing.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::llm::LlmError;
use crate::segmenter::Article;
use crate::transform::{ArticleTransform, TransformError};

/// Mock implementation of the ArticleTransform trait.
///
/// Succeeds with `transformed: <title>` unless told otherwise, and tracks
/// how many calls overlapped so concurrency limits can be asserted.
///
/// # Example
///
/// ```rust,ignore
/// let transform = MockTransform::new()
///     .failing_on([2])
///     .with_response(1, "【文章标题】：custom")
///     .with_delay(Duration::from_millis(10));
/// ```
#[derive(Debug, Default)]
pub struct MockTransform {
    failing: HashSet<usize>,
    panicking: HashSet<usize>,
    responses: HashMap<usize, String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl MockTransform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the given 1-based indices with a transport error.
    pub fn failing_on(mut self, indices: impl IntoIterator<Item = usize>) -> Self {
        self.failing.extend(indices);
        self
    }

    /// Panic inside the transform for the given indices.
    pub fn panicking_on(mut self, indices: impl IntoIterator<Item = usize>) -> Self {
        self.panicking.extend(indices);
        self
    }

    /// Return `payload` for `index` instead of the default.
    pub fn with_response(mut self, index: usize, payload: impl Into<String>) -> Self {
        self.responses.insert(index, payload.into());
        self
    }

    /// Sleep this long inside every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of calls observed running at the same time.
    pub fn max_concurrency(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ArticleTransform for MockTransform {
    fn name(&self) -> &str {
        "mock"
    }

    async fn transform(
        &self,
        article: &Article,
        index: usize,
        _total: usize,
    ) -> Result<String, TransformError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(active, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.panicking.contains(&index) {
            panic!("mock transform panicked on item {index}");
        }
        if self.failing.contains(&index) {
            return Err(TransformError::Llm(LlmError::Http(format!(
                "mock failure for item {index}"
            ))));
        }
        Ok(self
            .responses
            .get(&index)
            .cloned()
            .unwrap_or_else(|| format!("transformed: {}", article.title)))
    }
}
