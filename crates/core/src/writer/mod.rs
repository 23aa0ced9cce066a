//! Output documents built from ordered `(article, payload)` pairs.

mod markdown;

pub use markdown::MarkdownWriter;

use crate::segmenter::Article;
use crate::transform::TransformKind;

/// Errors from rendering an output document.
#[derive(Debug, thiserror::Error)]
pub enum WriterError {
    #[error("formatting failed: {0}")]
    Format(#[from] std::fmt::Error),

    #[error("document title is empty")]
    EmptyTitle,
}

/// A rendered output document ready for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    /// Transform whose payloads the document holds.
    pub kind: TransformKind,
    pub bytes: Vec<u8>,
    pub content_type: String,
    /// Download name, possibly non-ASCII.
    pub file_name: String,
    /// ASCII-only name for clients that ignore `filename*`.
    pub ascii_file_name: String,
}

/// Renders aggregated entries into a single document.
///
/// Entries are written one-to-one and in the order given. `headings` runs
/// parallel to `entries`; a missing or blank override keeps the heading the
/// writer would pick on its own.
pub trait DocumentWriter: Send + Sync {
    fn content_type(&self) -> &'static str;

    fn extension(&self) -> &'static str;

    fn write(
        &self,
        title: &str,
        entries: &[(Article, String)],
        headings: &[Option<String>],
    ) -> Result<Vec<u8>, WriterError>;

    /// Write and package the document under the given download names.
    fn render(
        &self,
        title: &str,
        entries: &[(Article, String)],
        headings: &[Option<String>],
        kind: TransformKind,
        name: OutputName,
    ) -> Result<RenderedDocument, WriterError> {
        let bytes = self.write(title, entries, headings)?;
        Ok(RenderedDocument {
            kind,
            bytes,
            content_type: self.content_type().to_string(),
            file_name: name.file_name,
            ascii_file_name: name.ascii_file_name,
        })
    }
}

/// Download names for a rendered document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputName {
    pub file_name: String,
    /// ASCII-only fallback for `filename=`.
    pub ascii_file_name: String,
}

impl OutputName {
    /// `<stem>.<ext>` for a run producing one document.
    ///
    /// The stem is the upload's file name without directories or a trailing
    /// `.epub`; an empty stem falls back to the kind's default.
    pub fn single(upload_name: Option<&str>, kind: TransformKind, extension: &str) -> Self {
        let stem = upload_stem(upload_name).unwrap_or(kind.fallback_file_stem());
        let file_name = format!("{stem}.{extension}");
        let ascii_file_name = if is_header_safe(&file_name) {
            file_name.clone()
        } else {
            format!("{}.{extension}", kind.fallback_file_stem())
        };
        Self {
            file_name,
            ascii_file_name,
        }
    }

    /// `<prefix><stem>.<ext>` for one document of a combined run, so both
    /// downloads of the same upload stay distinguishable.
    pub fn combined(upload_name: Option<&str>, kind: TransformKind, extension: &str) -> Self {
        let stem = upload_stem(upload_name).unwrap_or(kind.fallback_file_stem());
        let file_name = format!("{}{stem}.{extension}", kind.combined_prefix());
        let ascii_stem = if is_header_safe(stem) {
            stem
        } else {
            kind.fallback_file_stem()
        };
        Self {
            file_name,
            ascii_file_name: format!("{}_{ascii_stem}.{extension}", kind.combined_ascii_prefix()),
        }
    }
}

fn upload_stem(upload_name: Option<&str>) -> Option<&str> {
    upload_name
        .and_then(|name| name.rsplit(['/', '\\']).next())
        .map(strip_epub_suffix)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn is_header_safe(name: &str) -> bool {
    name.is_ascii() && !name.contains('"')
}

fn strip_epub_suffix(name: &str) -> &str {
    let split = name.len().saturating_sub(".epub".len());
    match name.get(split..) {
        Some(suffix) if suffix.eq_ignore_ascii_case(".epub") => &name[..split],
        _ => name,
    }
}
