//! Document segmentation: sections in, ordered articles out.
//!
//! Each section is flattened to text, length-checked, classified (with the
//! classifier's sticky state carried from one section to the next) and then
//! handed to the [`TitleResolver`]. Sections that resolve to the
//! [`UNTITLED`] sentinel are dropped.

mod classifier;
mod config;
mod markup;
mod resolver;
mod types;

pub use classifier::{ClassifierState, SectionClassifier, SkipReason, Verdict};
pub use config::{KeywordConfig, KeywordSet, SegmenterConfig, TITLE_CHAR_LIMIT};
pub use markup::{flatten_lines, html_to_text, truncate_chars, FlattenOptions};
pub use resolver::{Resolution, TitleResolver, UNTITLED};
pub use types::{Article, SegmentStats};

use scraper::Html;
use tracing::{debug, info};

use crate::document::{Document, OutlineMap};
use crate::metrics;

/// Splits a [`Document`] into articles.
#[derive(Debug, Clone)]
pub struct Segmenter {
    config: SegmenterConfig,
    classifier: SectionClassifier,
    resolver: TitleResolver,
}

impl Segmenter {
    pub fn new(config: &SegmenterConfig, keywords: &KeywordConfig) -> Self {
        Self {
            config: config.clone(),
            classifier: SectionClassifier::new(keywords, config),
            resolver: TitleResolver::new(keywords, config),
        }
    }

    pub fn classifier(&self) -> &SectionClassifier {
        &self.classifier
    }

    pub fn resolver(&self) -> &TitleResolver {
        &self.resolver
    }

    /// Segment a document into ordered articles.
    pub fn segment(&self, document: &Document) -> Vec<Article> {
        self.segment_with_stats(document).0
    }

    /// Segment a document, also returning per-outcome counters.
    pub fn segment_with_stats(&self, document: &Document) -> (Vec<Article>, SegmentStats) {
        let outline = OutlineMap::from_entries(&document.outline);
        let mut state = ClassifierState::default();
        let mut stats = SegmentStats::default();
        let mut articles = Vec::new();

        for section in &document.sections {
            let html = Html::parse_document(&section.markup);
            let lines = flatten_lines(&html, &FlattenOptions::default());

            let text_chars = lines.iter().map(|l| l.chars().count()).sum::<usize>()
                + lines.len().saturating_sub(1);
            if text_chars < self.config.min_content_chars {
                debug!(href = %section.href, chars = text_chars, "Dropping short section");
                stats.short += 1;
                metrics::SECTIONS_TOTAL.with_label_values(&["short"]).inc();
                continue;
            }

            let outline_title = outline.lookup(&section.href);
            // Mastheads and placeholders would hide the section's real heading.
            let candidate_title = [
                outline_title.map(str::to_string),
                section.declared_title.clone(),
                markup::document_title(&html),
            ]
            .into_iter()
            .flatten()
            .find(|title| self.resolver.is_acceptable(title))
            .or_else(|| lines.first().cloned())
            .unwrap_or_default();

            let (verdict, next) = self.classifier.classify(state, &candidate_title, &lines);
            state = next;
            if let Verdict::Skip(reason) = verdict {
                debug!(
                    href = %section.href,
                    title = %candidate_title,
                    reason = reason.as_str(),
                    "Skipping section"
                );
                stats.classified += 1;
                metrics::SECTIONS_TOTAL
                    .with_label_values(&[reason.as_str()])
                    .inc();
                continue;
            }

            let resolution = self.resolver.resolve_html(
                &html,
                section.declared_title.as_deref(),
                outline_title,
            );
            if resolution.is_untitled() {
                debug!(href = %section.href, "Dropping section without a title");
                stats.untitled += 1;
                metrics::SECTIONS_TOTAL.with_label_values(&["untitled"]).inc();
                continue;
            }

            stats.kept += 1;
            metrics::SECTIONS_TOTAL.with_label_values(&["kept"]).inc();
            articles.push(Article::new(resolution.title, resolution.body));
        }

        info!(
            sections = document.sections.len(),
            kept = stats.kept,
            short = stats.short,
            classified = stats.classified,
            untitled = stats.untitled,
            "Segmented document"
        );

        (articles, stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{OutlineEntry, Section};

    fn segmenter() -> Segmenter {
        Segmenter::new(&SegmenterConfig::default(), &KeywordConfig::default())
    }

    fn body(chars: usize) -> String {
        let sentence = "Lawmakers spent the week arguing over how to fund the new programme. ";
        sentence.repeat(chars / sentence.len() + 1)
    }

    fn section(href: &str, heading: &str, body_chars: usize) -> Section {
        Section::new(
            href,
            format!("<html><body><h1>{heading}</h1><p>{}</p></body></html>", body(body_chars)),
        )
    }

    #[test]
    fn test_marker_follow_on_scenario() {
        let document = Document::new(vec![
            section("a.xhtml", "The World This Week", 500),
            section("b.xhtml", "Politics", 350),
            section("c.xhtml", "A Specific Policy Debate", 500),
        ]);

        let articles = segmenter().segment(&document);
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].title, "A Specific Policy Debate");
        assert!(!articles[0]
            .content
            .lines()
            .any(|line| line.trim() == "Politics"));
    }

    #[test]
    fn test_short_sections_dropped() {
        let document = Document::new(vec![
            Section::new("cover.xhtml", "<p>Cover</p>"),
            section("c.xhtml", "Real article", 400),
        ]);
        let (articles, stats) = segmenter().segment_with_stats(&document);
        assert_eq!(articles.len(), 1);
        assert_eq!(stats.short, 1);
        assert_eq!(stats.kept, 1);
    }

    #[test]
    fn test_output_preserves_order() {
        let document = Document::new(vec![
            section("1.xhtml", "First story", 400),
            section("2.xhtml", "Letters", 400),
            section("3.xhtml", "Second story", 400),
            section("4.xhtml", "Third story", 400),
        ]);
        let titles: Vec<String> = segmenter()
            .segment(&document)
            .into_iter()
            .map(|a| a.title)
            .collect();
        assert_eq!(titles, vec!["First story", "Second story", "Third story"]);
    }

    #[test]
    fn test_outline_title_used_with_normalized_href() {
        let document = Document::new(vec![Section::new(
            "OEBPS/Text/Story%201.xhtml",
            format!("<p>{}</p>", body(400)),
        )])
        .with_outline(vec![OutlineEntry::new(
            "Outline headline",
            "Text/story 1.xhtml#start",
        )]);

        let articles = segmenter().segment(&document);
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].title, "Outline headline");
    }

    #[test]
    fn test_untitled_sections_dropped() {
        let filler = "… ".repeat(200);
        let document = Document::new(vec![Section::new("x.xhtml", format!("<p>{filler}</p>"))]);
        let (articles, stats) = segmenter().segment_with_stats(&document);
        assert!(articles.is_empty());
        assert_eq!(stats.untitled, 1);
    }

    #[test]
    fn test_skipped_sections_never_emitted() {
        let document = Document::new(vec![
            section("1.xhtml", "KAL's cartoon", 400),
            section("2.xhtml", "Budget battles", 400),
        ]);
        let seg = segmenter();
        let articles = seg.segment(&document);
        assert!(articles.iter().all(|a| !a.title.to_lowercase().contains("cartoon")));
        assert_eq!(articles.len(), 1);
    }

    #[test]
    fn test_masthead_page_title_does_not_hide_letters() {
        let document = Document::new(vec![
            Section::new(
                "letters.xhtml",
                format!(
                    "<html><head><title>The Economist</title></head>\
                     <body><h1>Letters</h1><p>{}</p></body></html>",
                    body(430)
                ),
            ),
            Section::new(
                "story.xhtml",
                format!(
                    "<html><head><title>The Economist</title></head>\
                     <body><h1>Budget battles</h1><p>{}</p></body></html>",
                    body(430)
                ),
            ),
        ]);

        let (articles, stats) = segmenter().segment_with_stats(&document);
        let titles: Vec<&str> = articles.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["Budget battles"]);
        assert_eq!(stats.classified, 1);
    }

    #[test]
    fn test_placeholder_outline_label_falls_through() {
        let document = Document::new(vec![section("1.xhtml", "Letters", 400)])
            .with_outline(vec![OutlineEntry::new("Chapter", "1.xhtml")]);

        assert!(segmenter().segment(&document).is_empty());
    }

    #[test]
    fn test_empty_document() {
        let (articles, stats) = segmenter().segment_with_stats(&Document::default());
        assert!(articles.is_empty());
        assert_eq!(stats.total(), 0);
    }
}
