//! EPUB container loading.
//!
//! Reads spine items in reading order together with the navigation outline,
//! using the `epub` crate for container and OPF handling.

use std::io::{Cursor, Read, Seek};
use std::path::Path;

use epub::doc::{EpubDoc, NavPoint};
use tracing::{debug, info};

use super::types::{Document, OutlineEntry, Section};
use super::DocumentError;

/// Load an EPUB file from disk.
pub fn load_epub(path: &Path) -> Result<Document, DocumentError> {
    let doc = EpubDoc::new(path)
        .map_err(|e| DocumentError::Epub(format!("failed to open {}: {e}", path.display())))?;
    read_document(doc)
}

/// Load an EPUB from an in-memory archive (e.g. an upload).
pub fn load_epub_bytes(bytes: Vec<u8>) -> Result<Document, DocumentError> {
    let doc = EpubDoc::from_reader(Cursor::new(bytes))
        .map_err(|e| DocumentError::Epub(format!("failed to read archive: {e}")))?;
    read_document(doc)
}

fn read_document<R: Read + Seek>(mut doc: EpubDoc<R>) -> Result<Document, DocumentError> {
    let title = doc.mdata("title").map(|m| m.value.clone());
    let outline: Vec<OutlineEntry> = doc.toc.iter().map(outline_entry).collect();
    let sections = read_sections(&mut doc);

    if sections.is_empty() {
        return Err(DocumentError::Empty);
    }

    info!(
        title = title.as_deref().unwrap_or("<none>"),
        sections = sections.len(),
        outline_entries = outline.len(),
        "Loaded EPUB"
    );

    Ok(Document {
        title,
        sections,
        outline,
    })
}

fn outline_entry(nav_point: &NavPoint) -> OutlineEntry {
    OutlineEntry {
        label: nav_point.label.trim().to_string(),
        href: nav_point.content.to_string_lossy().to_string(),
        children: nav_point.children.iter().map(outline_entry).collect(),
    }
}

fn read_sections<R: Read + Seek>(doc: &mut EpubDoc<R>) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut spine_order = 0usize;

    loop {
        if let Some((content, media_type)) = doc.get_current_str() {
            let href = doc.get_current_path().map_or_else(
                || format!("section_{spine_order}.xhtml"),
                |p| p.to_string_lossy().to_string(),
            );

            if is_markup(&media_type) {
                sections.push(Section::new(href, content));
            } else {
                debug!(href = %href, media_type = %media_type, "Skipping non-markup spine item");
            }
        }

        if !doc.go_next() {
            break;
        }
        spine_order += 1;
    }

    sections
}

fn is_markup(media_type: &str) -> bool {
    let media_type = media_type.to_ascii_lowercase();
    media_type.contains("html") || media_type.contains("xml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_markup() {
        assert!(is_markup("application/xhtml+xml"));
        assert!(is_markup("text/html"));
        assert!(!is_markup("image/jpeg"));
        assert!(!is_markup("text/css"));
    }

    #[test]
    fn test_load_epub_bytes_rejects_garbage() {
        let result = load_epub_bytes(b"definitely not a zip archive".to_vec());
        assert!(matches!(result, Err(DocumentError::Epub(_))));
    }

    #[test]
    fn test_load_epub_missing_file() {
        let result = load_epub(Path::new("/nonexistent/book.epub"));
        assert!(matches!(result, Err(DocumentError::Epub(_))));
    }
}
