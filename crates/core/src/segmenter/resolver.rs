//! Title and body resolution for a single section.
//!
//! Titles come from an ordered list of probes; the first probe that yields an
//! acceptable candidate wins:
//!
//! 1. `outline` - the table-of-contents label for the section
//! 2. `markup` - semantic elements (`h1`, title/headline classes, `h2`, `h3`)
//! 3. `title_element` - the declared title, then the markup's own `<title>`
//! 4. `first_line` - a guess from the first (or second) line of text
//!
//! When every probe fails the title is [`UNTITLED`].

use once_cell::sync::Lazy;
use regex_lite::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};

use super::config::{KeywordConfig, KeywordSet, SegmenterConfig};
use super::markup::{
    collapse_whitespace, document_title, element_text, flatten_lines, truncate_chars,
    FlattenOptions, BASE_STRIP, HEURISTIC_STRIP,
};

/// Sentinel title for sections no probe could name.
pub const UNTITLED: &str = "Untitled";

/// Only this many leading lines are inspected for noise keywords.
const NOISE_LINE_WINDOW: usize = 3;

static SEMANTIC_SELECTORS: Lazy<Vec<Selector>> = Lazy::new(|| {
    [
        "h1",
        "[class*=\"title\"]",
        "[class*=\"Title\"]",
        "[class*=\"headline\"]",
        "[class*=\"Headline\"]",
        "h2",
        "h3",
    ]
    .iter()
    .filter_map(|s| Selector::parse(s).ok())
    .collect()
});

static FEED_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"feed_\d+/article_\d+/index_\w+\.html").unwrap());

static MARKUP_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)[a-z0-9_./-]*[a-z0-9_]\.x?html?\b").unwrap());

static BARE_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^[a-z0-9_./\\-]+\.(xhtml|html|htm|xml|ncx|opf)$").unwrap());

/// Resolved title and body of one section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub title: String,
    pub body: String,
}

impl Resolution {
    pub fn is_untitled(&self) -> bool {
        self.title == UNTITLED
    }
}

/// A title candidate and, for semantic hits, the element it came from.
struct Candidate<'a> {
    text: String,
    element: Option<ElementRef<'a>>,
}

impl Candidate<'_> {
    fn text(text: String) -> Self {
        Self {
            text,
            element: None,
        }
    }
}

/// Inputs shared by all probes.
struct ProbeInput<'a> {
    html: &'a Html,
    declared_title: Option<&'a str>,
    outline_title: Option<&'a str>,
}

type Probe = for<'a> fn(&TitleResolver, &ProbeInput<'a>) -> Option<Candidate<'a>>;

/// Title probes in priority order.
const PROBES: &[(&str, Probe)] = &[
    ("outline", TitleResolver::probe_outline),
    ("markup", TitleResolver::probe_semantic_markup),
    ("title_element", TitleResolver::probe_title_element),
    ("first_line", TitleResolver::probe_first_line),
];

/// Derives a clean title and body from a section's markup.
#[derive(Debug, Clone)]
pub struct TitleResolver {
    noise: KeywordSet,
    placeholders: KeywordSet,
    mastheads: KeywordSet,
    prefixes: Vec<String>,
    max_title_chars: usize,
    min_body_line_chars: usize,
}

impl TitleResolver {
    pub fn new(keywords: &KeywordConfig, config: &SegmenterConfig) -> Self {
        Self {
            noise: KeywordSet::new(&keywords.noise),
            placeholders: KeywordSet::new(&keywords.placeholder_titles),
            mastheads: KeywordSet::new(&keywords.masthead_titles),
            prefixes: keywords
                .title_prefixes
                .iter()
                .map(|p| p.trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
            max_title_chars: config.max_title_chars,
            min_body_line_chars: config.min_body_line_chars,
        }
    }

    /// Resolve a title and body from raw markup. Never fails.
    pub fn resolve(
        &self,
        markup: &str,
        declared_title: Option<&str>,
        outline_title: Option<&str>,
    ) -> Resolution {
        let html = Html::parse_document(markup);
        self.resolve_html(&html, declared_title, outline_title)
    }

    /// Same as [`resolve`](Self::resolve) for an already parsed document.
    pub fn resolve_html(
        &self,
        html: &Html,
        declared_title: Option<&str>,
        outline_title: Option<&str>,
    ) -> Resolution {
        let input = ProbeInput {
            html,
            declared_title,
            outline_title,
        };

        for (name, probe) in PROBES {
            let Some(candidate) = probe(self, &input) else {
                continue;
            };

            let raw = candidate.text;
            let stripped = self.strip_title_prefix(&raw);
            let title = if stripped.is_empty() { raw.as_str() } else { stripped };
            let title = truncate_chars(title, self.max_title_chars).trim().to_string();

            debug!(probe = name, title = %title, "Resolved section title");
            let body = self.extract_body(html, candidate.element, &[title.as_str(), raw.as_str()]);
            return Resolution { title, body };
        }

        warn!(
            declared = declared_title.unwrap_or(""),
            outline = outline_title.unwrap_or(""),
            "No title could be resolved for section"
        );
        let body = flatten_lines(html, &FlattenOptions::default())
            .into_iter()
            .filter(|line| !line.eq_ignore_ascii_case(UNTITLED))
            .collect::<Vec<_>>()
            .join("\n");
        Resolution {
            title: UNTITLED.to_string(),
            body,
        }
    }

    fn probe_outline<'a>(&self, input: &ProbeInput<'a>) -> Option<Candidate<'a>> {
        let title = collapse_whitespace(input.outline_title?);
        self.is_acceptable(&title).then(|| Candidate::text(title))
    }

    fn probe_semantic_markup<'a>(&self, input: &ProbeInput<'a>) -> Option<Candidate<'a>> {
        let max_candidate_chars = self.max_title_chars.saturating_mul(2);
        for selector in SEMANTIC_SELECTORS.iter() {
            for element in input.html.select(selector) {
                if is_in_head(&element) {
                    continue;
                }
                let text = element_text(&element);
                if text.chars().count() > max_candidate_chars || !self.is_acceptable(&text) {
                    continue;
                }
                return Some(Candidate {
                    text,
                    element: Some(element),
                });
            }
        }
        None
    }

    fn probe_title_element<'a>(&self, input: &ProbeInput<'a>) -> Option<Candidate<'a>> {
        input
            .declared_title
            .map(collapse_whitespace)
            .into_iter()
            .chain(document_title(input.html))
            .find(|title| self.is_acceptable(title))
            .map(Candidate::text)
    }

    fn probe_first_line<'a>(&self, input: &ProbeInput<'a>) -> Option<Candidate<'a>> {
        let lines = flatten_lines(
            input.html,
            &FlattenOptions {
                strip: HEURISTIC_STRIP,
                exclude: None,
            },
        );
        lines
            .iter()
            .take(2)
            .map(|line| self.title_from_line(line))
            .find(|title| self.is_acceptable(title))
            .map(Candidate::text)
    }

    /// Guess a title from a single line of text.
    fn title_from_line(&self, line: &str) -> String {
        if let Some(quoted) = bracketed(line) {
            return quoted.to_string();
        }
        let without_feed = FEED_URL.replace_all(line, "");
        let without_paths = MARKUP_PATH.replace_all(&without_feed, "");
        let cleaned = collapse_whitespace(&without_paths);
        truncate_chars(&cleaned, self.max_title_chars).to_string()
    }

    /// True if `text` may serve as a title.
    pub fn is_acceptable(&self, text: &str) -> bool {
        !self.is_placeholder(text) && !self.is_masthead(text)
    }

    /// Non-informative values: empty, generic labels, navigation words,
    /// numbering and bare file paths.
    pub fn is_placeholder(&self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return true;
        }
        let lower = text.to_lowercase();
        if lower == UNTITLED.to_lowercase() || self.placeholders.contains_exact(&lower) {
            return true;
        }
        if !text.chars().any(char::is_alphanumeric) {
            return true;
        }
        let numeral = text
            .chars()
            .all(|c| c.is_numeric() || c.is_whitespace() || c.is_ascii_punctuation());
        numeral || BARE_PATH.is_match(text)
    }

    pub fn is_masthead(&self, text: &str) -> bool {
        self.mastheads.contains_exact(&text.trim().to_lowercase())
    }

    /// Remove a leading editorial label such as `【文章标题】：` or `Title:`.
    fn strip_title_prefix<'t>(&self, title: &'t str) -> &'t str {
        let title = title.trim();
        for prefix in &self.prefixes {
            let Some(rest) = strip_prefix_ignore_case(title, prefix) else {
                continue;
            };
            let rest = rest.trim_start_matches('*').trim_start();
            if let Some(after) = rest.strip_prefix([':', '：']) {
                return after.trim_start_matches('*').trim();
            }
            if prefix.ends_with('】') {
                return rest;
            }
        }
        title
    }

    fn extract_body(&self, html: &Html, exclude: Option<ElementRef<'_>>, titles: &[&str]) -> String {
        let titles: Vec<String> = titles.iter().map(|t| t.trim().to_lowercase()).collect();
        let lines: Vec<String> = flatten_lines(
            html,
            &FlattenOptions {
                strip: BASE_STRIP,
                exclude,
            },
        )
        .into_iter()
        .filter(|line| !titles.contains(&line.to_lowercase()))
        .enumerate()
        .filter(|(i, line)| !(*i < NOISE_LINE_WINDOW && self.is_noise_line(line)))
        .map(|(_, line)| line)
        .collect();

        let first_body_line = lines
            .iter()
            .position(|line| line.chars().count() >= self.min_body_line_chars);
        match first_body_line {
            Some(start) => lines[start..].join("\n"),
            None => lines.join("\n"),
        }
    }

    fn is_noise_line(&self, line: &str) -> bool {
        self.noise.matches(&line.to_lowercase())
    }
}

/// Contents of the first `《…》` or `「…」` pair, if non-empty.
fn bracketed(line: &str) -> Option<&str> {
    [('《', '》'), ('「', '」')].iter().find_map(|&(open, close)| {
        let start = line.find(open)? + open.len_utf8();
        let len = line[start..].find(close)?;
        let inner = line[start..start + len].trim();
        (!inner.is_empty()).then_some(inner)
    })
}

fn is_in_head(element: &ElementRef<'_>) -> bool {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .any(|ancestor| ancestor.value().name() == "head")
}

fn strip_prefix_ignore_case<'t>(text: &'t str, prefix: &str) -> Option<&'t str> {
    let mut chars = text.char_indices();
    for expected in prefix.chars() {
        let (_, actual) = chars.next()?;
        if !actual.to_lowercase().eq(expected.to_lowercase()) {
            return None;
        }
    }
    let rest_start = chars.next().map_or(text.len(), |(idx, _)| idx);
    Some(&text[rest_start..])
}
