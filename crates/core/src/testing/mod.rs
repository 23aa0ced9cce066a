//! Testing utilities and mock implementations.
//!
//! Mocks for the LLM client and the per-article transform, plus fixtures
//! for building documents and articles, so pipelines can be exercised
//! without a network.
//!
//! # Example
//!
//! ```rust,ignore
//! use broadsheet_core::testing::{fixtures, MockTransform};
//!
//! let transform = Arc::new(MockTransform::new().failing_on([2]));
//! let results = orchestrator.run_all("run", &fixtures::articles(3), transform).await;
//! ```

mod mock_llm;
mod mock_transform;

pub use mock_llm::MockLlmClient;
pub use mock_transform::MockTransform;

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::document::{Document, OutlineEntry, Section};
    use crate::segmenter::Article;

    const SENTENCE: &str = "Ministers spent the week arguing over how the new budget should be financed. ";

    /// Prose of at least `chars` characters.
    pub fn prose(chars: usize) -> String {
        SENTENCE.repeat(chars / SENTENCE.len() + 1)
    }

    /// `n` articles titled `Article 1..=n`.
    pub fn articles(n: usize) -> Vec<Article> {
        (1..=n)
            .map(|i| Article::new(format!("Article {i}"), format!("Body of article {i}.")))
            .collect()
    }

    /// A section with an `<h1>` heading and a long paragraph.
    pub fn section(href: &str, heading: &str) -> Section {
        Section::new(
            href,
            format!(
                "<html><head><title>{heading}</title></head>\
                 <body><h1>{heading}</h1><p>{}</p></body></html>",
                prose(400)
            ),
        )
    }

    /// A document with one section per heading and a matching outline.
    pub fn document(headings: &[&str]) -> Document {
        let sections = headings
            .iter()
            .enumerate()
            .map(|(i, heading)| section(&format!("text/part{i}.xhtml"), heading))
            .collect();
        let outline = headings
            .iter()
            .enumerate()
            .map(|(i, heading)| OutlineEntry::new(*heading, format!("text/part{i}.xhtml")))
            .collect();
        Document::new(sections)
            .with_outline(outline)
            .with_title("The Weekly Review")
    }

    /// A well-formed analysis payload for `title`.
    pub fn analysis_payload(title: &str) -> String {
        format!(
            "【文章标题】：《{title}》\n\n【引言】：{title}的背景。\n\n【主要内容如下】：要点。\n\n【核心结论】：结论。"
        )
    }
}
