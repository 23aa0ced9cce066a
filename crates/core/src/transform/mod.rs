//! Per-article transforms: the external call made once per article.

mod llm_transform;
mod prompt;

pub use llm_transform::LlmTransform;
pub use prompt::{build_prompt, DetailLevel, SYSTEM_PROMPT};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::llm::LlmError;
use crate::segmenter::Article;

/// What a run produces for each article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformKind {
    /// Structured Chinese analysis (title, intro, key points, data, verdict).
    #[default]
    Analyze,
    /// Full Chinese translation.
    Translate,
}

impl TransformKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransformKind::Analyze => "analyze",
            TransformKind::Translate => "translate",
        }
    }

    /// File stem used when the upload name is unusable.
    pub fn fallback_file_stem(&self) -> &'static str {
        match self {
            TransformKind::Analyze => "analysis_result",
            TransformKind::Translate => "translation_result",
        }
    }

    /// Download name prefix inside a combined run.
    pub fn combined_prefix(&self) -> &'static str {
        match self {
            TransformKind::Analyze => "听",
            TransformKind::Translate => "看",
        }
    }

    /// ASCII stand-in for [`Self::combined_prefix`].
    pub fn combined_ascii_prefix(&self) -> &'static str {
        match self {
            TransformKind::Analyze => "listen",
            TransformKind::Translate => "read",
        }
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransformKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "analyze" | "analysis" => Ok(TransformKind::Analyze),
            "translate" | "translation" => Ok(TransformKind::Translate),
            other => Err(format!("unknown transform kind: {other}")),
        }
    }
}

/// What an upload asks for: one transform, or both over the same articles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunKind {
    #[default]
    Analyze,
    Translate,
    /// Analysis and translation in one run, sharing the concurrency gate.
    Combined,
}

impl RunKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunKind::Analyze => "analyze",
            RunKind::Translate => "translate",
            RunKind::Combined => "combined",
        }
    }

    /// Transforms applied to every article, in output order.
    pub fn transforms(&self) -> &'static [TransformKind] {
        match self {
            RunKind::Analyze => &[TransformKind::Analyze],
            RunKind::Translate => &[TransformKind::Translate],
            RunKind::Combined => &[TransformKind::Analyze, TransformKind::Translate],
        }
    }

    pub fn is_combined(&self) -> bool {
        matches!(self, RunKind::Combined)
    }
}

impl From<TransformKind> for RunKind {
    fn from(kind: TransformKind) -> Self {
        match kind {
            TransformKind::Analyze => RunKind::Analyze,
            TransformKind::Translate => RunKind::Translate,
        }
    }
}

impl fmt::Display for RunKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from a single article transform.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("gave up after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: LlmError,
    },

    #[error("content rejected at every fallback stage: {0}")]
    ContentRejected(String),

    #[error("model returned an empty response")]
    EmptyResponse,
}

/// An external, fallible, per-article transformation.
#[async_trait]
pub trait ArticleTransform: Send + Sync {
    /// Short name for logs and metrics.
    fn name(&self) -> &str;

    /// Transform one article. `index` is 1-based, `total` is the run size.
    async fn transform(
        &self,
        article: &Article,
        index: usize,
        total: usize,
    ) -> Result<String, TransformError>;
}
