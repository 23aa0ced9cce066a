//! Segmenter configuration and injectable keyword lists.

use serde::{Deserialize, Serialize};

/// Thresholds used while segmenting a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmenterConfig {
    /// Sections whose flattened text is shorter than this are dropped
    /// (covers, copyright pages, section dividers).
    #[serde(default = "default_min_content_chars")]
    pub min_content_chars: usize,

    /// Leading body lines shorter than this are treated as sub-headlines.
    #[serde(default = "default_min_body_line_chars")]
    pub min_body_line_chars: usize,

    /// Number of leading text lines the classifier inspects.
    #[serde(default = "default_leading_lines")]
    pub leading_lines: usize,

    /// Each inspected line is cut to this many characters before matching.
    #[serde(default = "default_line_probe_chars")]
    pub line_probe_chars: usize,

    /// Titles are truncated to this many characters.
    #[serde(default = "default_max_title_chars")]
    pub max_title_chars: usize,
}

fn default_min_content_chars() -> usize {
    300
}

fn default_min_body_line_chars() -> usize {
    40
}

fn default_leading_lines() -> usize {
    5
}

fn default_line_probe_chars() -> usize {
    200
}

/// Upper bound on article title length.
pub const TITLE_CHAR_LIMIT: usize = 200;

fn default_max_title_chars() -> usize {
    TITLE_CHAR_LIMIT
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            min_content_chars: default_min_content_chars(),
            min_body_line_chars: default_min_body_line_chars(),
            leading_lines: default_leading_lines(),
            line_probe_chars: default_line_probe_chars(),
            max_title_chars: default_max_title_chars(),
        }
    }
}

/// Publication-specific keyword lists.
///
/// All matching is done on lowercased text, so entries should be lowercase.
/// The defaults target an English weekly news magazine read by a Chinese
/// audience; another publication supplies its own lists here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordConfig {
    /// Roundup/noise sections, matched anywhere in the title or leading lines.
    #[serde(default = "default_noise")]
    pub noise: Vec<String>,

    /// Weekly-digest headers that start suppressing the sections after them.
    #[serde(default = "default_marker")]
    pub marker: Vec<String>,

    /// Sections skipped while the marker's suppression is active.
    #[serde(default = "default_follow_on")]
    pub follow_on: Vec<String>,

    /// Reader-letter sections, matched against the start of the title.
    #[serde(default = "default_letters")]
    pub letters: Vec<String>,

    /// Non-informative titles (navigation words, generic labels).
    #[serde(default = "default_placeholder_titles")]
    pub placeholder_titles: Vec<String>,

    /// Publication names that must never become an article title.
    #[serde(default = "default_masthead_titles")]
    pub masthead_titles: Vec<String>,

    /// Editorial labels stripped from the start of a resolved title.
    #[serde(default = "default_title_prefixes")]
    pub title_prefixes: Vec<String>,

    /// Cartoon markers checked against generated output.
    #[serde(default = "default_cartoon")]
    pub cartoon: Vec<String>,

    /// Regex patterns identifying roundup introductions in generated output.
    #[serde(default = "default_roundup_intro_patterns")]
    pub roundup_intro_patterns: Vec<String>,

    /// Output the model returns when it declines to produce anything.
    #[serde(default = "default_skip_output_marker")]
    pub skip_output_marker: String,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_noise() -> Vec<String> {
    strings(&[
        "the world this week",
        "politics this week",
        "business this week",
        "markets this week",
        "the weekly cartoon",
        "kal's cartoon",
        "cartoon",
        "letters to the editor",
        "本周全球",
        "全球政治动态",
        "全球商业动态",
        "全球市场动态",
        "每周漫画",
        "漫画",
        "读者来信",
    ])
}

fn default_marker() -> Vec<String> {
    strings(&["the world this week", "本周全球"])
}

fn default_follow_on() -> Vec<String> {
    strings(&["politics", "business", "cartoon", "政治", "商业", "漫画"])
}

fn default_letters() -> Vec<String> {
    strings(&["letters", "读者来信"])
}

fn default_placeholder_titles() -> Vec<String> {
    strings(&[
        "untitled",
        "unknown",
        "cover",
        "title page",
        "contents",
        "table of contents",
        "toc",
        "next",
        "previous",
        "prev",
        "back",
        "home",
        "top",
        "index",
        "start",
        "chapter",
        "section",
        "article",
        "未命名",
        "未命名文章",
        "目录",
        "封面",
    ])
}

fn default_masthead_titles() -> Vec<String> {
    strings(&["the economist", "economist", "经济学人", "《经济学人》"])
}

fn default_title_prefixes() -> Vec<String> {
    strings(&["【文章标题】", "文章标题", "标题", "title", "headline"])
}

fn default_cartoon() -> Vec<String> {
    strings(&["漫画", "cartoon", "comic", "每周漫画", "weekly cartoon"])
}

fn default_roundup_intro_patterns() -> Vec<String> {
    strings(&["概述.*全球政治动态", "综述.*全球金融动态"])
}

fn default_skip_output_marker() -> String {
    "【不生成口播稿】".to_string()
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            noise: default_noise(),
            marker: default_marker(),
            follow_on: default_follow_on(),
            letters: default_letters(),
            placeholder_titles: default_placeholder_titles(),
            masthead_titles: default_masthead_titles(),
            title_prefixes: default_title_prefixes(),
            cartoon: default_cartoon(),
            roundup_intro_patterns: default_roundup_intro_patterns(),
            skip_output_marker: default_skip_output_marker(),
        }
    }
}

/// A lowercase keyword list with substring matching.
#[derive(Debug, Clone, Default)]
pub struct KeywordSet {
    keywords: Vec<String>,
}

impl KeywordSet {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    /// True if any keyword occurs in `text` (expected lowercase).
    pub fn matches(&self, text: &str) -> bool {
        self.keywords.iter().any(|k| text.contains(k.as_str()))
    }

    /// True if `text` equals or starts with any keyword (expected lowercase).
    pub fn matches_prefix(&self, text: &str) -> bool {
        self.keywords.iter().any(|k| text.starts_with(k.as_str()))
    }

    /// True if `text` equals any keyword (expected lowercase).
    pub fn contains_exact(&self, text: &str) -> bool {
        self.keywords.iter().any(|k| k == text)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keywords.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }
}
