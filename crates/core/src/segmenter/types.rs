//! Segmenter output types.

use serde::{Deserialize, Serialize};

/// One article extracted from a document.
///
/// Position in the segmenter's output is the only identity; downstream
/// stages refer to articles by their 1-based index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    /// Display title, non-empty and at most the configured title length.
    pub title: String,
    /// Body text, one paragraph per line.
    pub content: String,
}

impl Article {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
        }
    }
}

/// Per-document segmentation counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SegmentStats {
    pub kept: usize,
    pub short: usize,
    pub classified: usize,
    pub untitled: usize,
}

impl SegmentStats {
    pub fn total(&self) -> usize {
        self.kept + self.short + self.classified + self.untitled
    }
}
