//! Post-hoc content filters applied to successful payloads.

use regex_lite::Regex;
use tracing::warn;

use super::payload::{extract_title, section_text, INTRO_LABEL};
use crate::segmenter::{truncate_chars, Article, KeywordConfig, KeywordSet};
use crate::transform::TransformKind;

/// Only this many leading payload characters are scanned for cartoon keywords.
const CARTOON_SCAN_CHARS: usize = 500;

/// A predicate over `(article, payload)`; matching pairs are dropped.
pub trait ContentFilter: Send + Sync {
    fn name(&self) -> &str;

    fn matches(&self, article: &Article, payload: &str) -> bool;
}

/// Cartoon sections that slipped through segmentation.
pub struct CartoonFilter {
    keywords: KeywordSet,
}

impl CartoonFilter {
    pub fn new(keywords: &KeywordConfig) -> Self {
        Self {
            keywords: KeywordSet::new(&keywords.cartoon),
        }
    }
}

impl ContentFilter for CartoonFilter {
    fn name(&self) -> &str {
        "cartoon"
    }

    fn matches(&self, article: &Article, payload: &str) -> bool {
        let title = extract_title(payload)
            .unwrap_or_else(|| article.title.clone())
            .to_lowercase();
        let head = truncate_chars(payload, CARTOON_SCAN_CHARS).to_lowercase();
        self.keywords.matches(&title) || self.keywords.matches(&head)
    }
}

/// Weekly roundups recognised from the generated intro paragraph.
pub struct RoundupIntroFilter {
    patterns: Vec<Regex>,
}

impl RoundupIntroFilter {
    /// Invalid patterns are logged and ignored; `validate_config` rejects them up front.
    pub fn new(keywords: &KeywordConfig) -> Self {
        let patterns = keywords
            .roundup_intro_patterns
            .iter()
            .filter_map(|p| match Regex::new(p) {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!(pattern = %p, error = %e, "Ignoring invalid roundup pattern");
                    None
                }
            })
            .collect();
        Self { patterns }
    }
}

impl ContentFilter for RoundupIntroFilter {
    fn name(&self) -> &str {
        "roundup_intro"
    }

    fn matches(&self, _article: &Article, payload: &str) -> bool {
        section_text(payload, INTRO_LABEL)
            .is_some_and(|intro| self.patterns.iter().any(|p| p.is_match(intro)))
    }
}

/// Payloads where the model declined to produce output.
pub struct SkipMarkerFilter {
    marker: String,
}

impl SkipMarkerFilter {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into().trim().to_string(),
        }
    }
}

impl ContentFilter for SkipMarkerFilter {
    fn name(&self) -> &str {
        "skip_marker"
    }

    fn matches(&self, _article: &Article, payload: &str) -> bool {
        !self.marker.is_empty() && payload.trim() == self.marker
    }
}

/// The filter chain used for a run of the given kind.
pub fn default_filters(kind: TransformKind, keywords: &KeywordConfig) -> Vec<Box<dyn ContentFilter>> {
    match kind {
        TransformKind::Analyze => vec![
            Box::new(SkipMarkerFilter::new(&keywords.skip_output_marker)),
            Box::new(CartoonFilter::new(keywords)),
            Box::new(RoundupIntroFilter::new(keywords)),
        ],
        TransformKind::Translate => vec![Box::new(CartoonFilter::new(keywords))],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(title: &str) -> Article {
        Article::new(title, "body")
    }

    #[test]
    fn test_cartoon_filter_title_and_head() {
        let filter = CartoonFilter::new(&KeywordConfig::default());
        assert!(filter.matches(&article("x"), "【文章标题】：每周漫画：选举季\n\n正文"));
        assert!(filter.matches(&article("KAL's cartoon"), "没有标题的输出"));
        assert!(filter.matches(&article("x"), "Intro mentions a Cartoon early on"));
        assert!(!filter.matches(&article("Budgets"), "【文章标题】：预算之争\n\n正文"));
    }

    #[test]
    fn test_cartoon_filter_ignores_late_mentions() {
        let filter = CartoonFilter::new(&KeywordConfig::default());
        let payload = format!("【文章标题】：预算之争\n\n{}漫画", "字".repeat(600));
        assert!(!filter.matches(&article("Budgets"), &payload));
    }

    #[test]
    fn test_roundup_intro_filter() {
        let filter = RoundupIntroFilter::new(&KeywordConfig::default());
        let roundup = "【文章标题】：本周要闻\n\n【引言】：本文概述了本周全球政治动态。\n\n【主要内容如下】：……";
        assert!(filter.matches(&article("x"), roundup));
        let normal = "【文章标题】：芯片\n\n【引言】：美国收紧出口管制。";
        assert!(!filter.matches(&article("x"), normal));
        assert!(!filter.matches(&article("x"), "no intro at all 概述全球政治动态"));
    }

    #[test]
    fn test_invalid_roundup_pattern_ignored() {
        let keywords = KeywordConfig {
            roundup_intro_patterns: vec!["(".to_string(), "综述".to_string()],
            ..KeywordConfig::default()
        };
        let filter = RoundupIntroFilter::new(&keywords);
        assert_eq!(filter.patterns.len(), 1);
    }

    #[test]
    fn test_skip_marker_filter() {
        let filter = SkipMarkerFilter::new("【不生成口播稿】");
        assert!(filter.matches(&article("x"), "  【不生成口播稿】\n"));
        assert!(!filter.matches(&article("x"), "【不生成口播稿】 but with more"));
        assert!(!SkipMarkerFilter::new("").matches(&article("x"), ""));
    }

    #[test]
    fn test_default_filters_per_kind() {
        let keywords = KeywordConfig::default();
        let names: Vec<String> = default_filters(TransformKind::Analyze, &keywords)
            .iter()
            .map(|f| f.name().to_string())
            .collect();
        assert_eq!(names, vec!["skip_marker", "cartoon", "roundup_intro"]);
        assert_eq!(default_filters(TransformKind::Translate, &keywords).len(), 1);
    }
}
