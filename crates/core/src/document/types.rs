//! Document model consumed by the segmenter.

use serde::{Deserialize, Serialize};

/// One raw fragment of the source document, roughly one chapter file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Item identifier inside the container (e.g. `OEBPS/text/ch03.xhtml`).
    pub href: String,
    /// Raw HTML/XHTML markup.
    pub markup: String,
    /// Title declared by the container for this item, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declared_title: Option<String>,
}

impl Section {
    pub fn new(href: impl Into<String>, markup: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            markup: markup.into(),
            declared_title: None,
        }
    }

    pub fn with_declared_title(mut self, title: impl Into<String>) -> Self {
        self.declared_title = Some(title.into());
        self
    }
}

/// Table of contents entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineEntry {
    /// Display label
    pub label: String,
    /// Target content file, possibly with a `#fragment`
    pub href: String,
    /// Nested sub-entries
    #[serde(default)]
    pub children: Vec<OutlineEntry>,
}

impl OutlineEntry {
    pub fn new(label: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            href: href.into(),
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<OutlineEntry>) -> Self {
        self.children = children;
        self
    }
}

/// A parsed e-book: sections in reading order plus an optional outline.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Publication title from the container metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub sections: Vec<Section>,
    #[serde(default)]
    pub outline: Vec<OutlineEntry>,
}

impl Document {
    pub fn new(sections: Vec<Section>) -> Self {
        Self {
            title: None,
            sections,
            outline: Vec::new(),
        }
    }

    pub fn with_outline(mut self, outline: Vec<OutlineEntry>) -> Self {
        self.outline = outline;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}
