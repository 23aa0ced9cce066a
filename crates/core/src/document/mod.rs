//! Inbound document model and loaders.

mod epub;
mod outline;
mod types;

pub use self::epub::{load_epub, load_epub_bytes};
pub use outline::{normalize_href, OutlineMap};
pub use types::{Document, OutlineEntry, Section};

use thiserror::Error;

/// Errors raised while loading a document container.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("EPUB error: {0}")]
    Epub(String),

    #[error("document contains no readable sections")]
    Empty,
}
