//! Markdown rendering of aggregated entries.

use std::fmt::Write as _;

use super::{DocumentWriter, WriterError};
use crate::aggregator::{generated_title, is_title_chunk};
use crate::segmenter::{Article, KeywordConfig, KeywordSet};

/// Plain Markdown output: one numbered heading per article followed by the
/// payload's paragraphs.
#[derive(Debug, Clone)]
pub struct MarkdownWriter {
    mastheads: KeywordSet,
}

impl MarkdownWriter {
    pub fn new(keywords: &KeywordConfig) -> Self {
        Self {
            mastheads: KeywordSet::new(&keywords.masthead_titles),
        }
    }

    fn heading(&self, article: &Article, payload: &str) -> String {
        generated_title(payload, &self.mastheads).unwrap_or_else(|| article.title.clone())
    }
}

impl DocumentWriter for MarkdownWriter {
    fn content_type(&self) -> &'static str {
        "text/markdown; charset=utf-8"
    }

    fn extension(&self) -> &'static str {
        "md"
    }

    fn write(
        &self,
        title: &str,
        entries: &[(Article, String)],
        headings: &[Option<String>],
    ) -> Result<Vec<u8>, WriterError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(WriterError::EmptyTitle);
        }

        let mut out = String::new();
        writeln!(out, "# {title}")?;

        for (i, (article, payload)) in entries.iter().enumerate() {
            writeln!(out)?;
            let heading = headings
                .get(i)
                .and_then(Option::as_deref)
                .map(str::trim)
                .filter(|h| !h.is_empty())
                .map_or_else(|| self.heading(article, payload), str::to_string);
            writeln!(out, "## {}. {heading}", i + 1)?;

            let chunks = payload
                .split("\n\n")
                .map(str::trim)
                .filter(|chunk| !chunk.is_empty() && !is_title_chunk(chunk));
            for chunk in chunks {
                writeln!(out)?;
                writeln!(out, "{chunk}")?;
            }
        }

        Ok(out.into_bytes())
    }
}
