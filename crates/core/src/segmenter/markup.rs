//! Markup flattening helpers built on `scraper`.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Node, Selector};

static TITLE_ELEMENT: Lazy<Option<Selector>> = Lazy::new(|| Selector::parse("title").ok());

/// Elements whose content is never text (metadata, code, templates).
pub const BASE_STRIP: &[&str] = &["head", "script", "style", "noscript", "template"];

/// Additionally stripped when guessing a title from the first lines.
pub const HEURISTIC_STRIP: &[&str] = &[
    "head", "script", "style", "noscript", "template", "nav", "figure", "figcaption",
];

const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "body", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav",
    "ol", "p", "pre", "section", "table", "td", "th", "tr", "ul",
];

/// Options for [`flatten_lines`].
#[derive(Debug, Clone, Copy)]
pub struct FlattenOptions<'a> {
    /// Element names whose subtrees are skipped.
    pub strip: &'a [&'a str],
    /// An element whose subtree is skipped (e.g. the element chosen as title).
    pub exclude: Option<ElementRef<'a>>,
}

impl Default for FlattenOptions<'_> {
    fn default() -> Self {
        Self {
            strip: BASE_STRIP,
            exclude: None,
        }
    }
}

/// Accumulates inline text and emits trimmed, whitespace-collapsed lines.
#[derive(Default)]
struct LineBuffer {
    current: String,
    lines: Vec<String>,
}

impl LineBuffer {
    fn push_text(&mut self, text: &str) {
        let starts_with_space = text.starts_with(char::is_whitespace);
        for (i, word) in text.split_whitespace().enumerate() {
            if !self.current.is_empty() && (i > 0 || starts_with_space) {
                self.current.push(' ');
            }
            self.current.push_str(word);
        }
        if text.ends_with(char::is_whitespace) && !self.current.is_empty() && !self.current.ends_with(' ') {
            self.current.push(' ');
        }
    }

    fn break_line(&mut self) {
        let line = self.current.trim();
        if !line.is_empty() {
            self.lines.push(line.to_string());
        }
        self.current.clear();
    }

    fn finish(mut self) -> Vec<String> {
        self.break_line();
        self.lines
    }
}

fn walk(element: ElementRef<'_>, options: &FlattenOptions<'_>, out: &mut LineBuffer) {
    if options.exclude == Some(element) {
        return;
    }
    let name = element.value().name();
    if options.strip.contains(&name) {
        return;
    }
    let is_block = BLOCK_ELEMENTS.contains(&name);
    if is_block || name == "br" {
        out.break_line();
    }
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            walk(child_element, options, out);
        } else if let Node::Text(text) = child.value() {
            out.push_text(text);
        }
    }
    if is_block {
        out.break_line();
    }
}

/// Flatten a parsed document to non-empty plain-text lines.
///
/// Inline elements join into one line; block elements and `<br>` break lines.
pub fn flatten_lines(html: &Html, options: &FlattenOptions<'_>) -> Vec<String> {
    let mut out = LineBuffer::default();
    walk(html.root_element(), options, &mut out);
    out.finish()
}

/// Parse markup and flatten it to newline-separated text.
pub fn html_to_text(markup: &str) -> String {
    let html = Html::parse_document(markup);
    flatten_lines(&html, &FlattenOptions::default()).join("\n")
}

/// Text of the markup's own `<title>` element, if present and non-empty.
pub fn document_title(html: &Html) -> Option<String> {
    let selector = TITLE_ELEMENT.as_ref()?;
    html.select(selector)
        .map(|element| element_text(&element))
        .find(|text| !text.is_empty())
}

/// Whitespace-collapsed text content of an element.
pub fn element_text(element: &ElementRef<'_>) -> String {
    collapse_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate to at most `max` characters on a char boundary.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
