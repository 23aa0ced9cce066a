//! Flattened outline lookup keyed by normalized href.

use std::collections::HashMap;

use super::types::OutlineEntry;

/// Normalize an href for outline lookup.
///
/// Percent-decodes, drops `#fragment` and `?query`, resolves `.` and `..`
/// segments, unifies separators and lowercases the result.
pub fn normalize_href(href: &str) -> String {
    let decoded = urlencoding::decode(href)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| href.to_string());

    let without_fragment = decoded
        .split(['#', '?'])
        .next()
        .unwrap_or_default()
        .replace('\\', "/");

    let mut segments: Vec<&str> = Vec::new();
    for segment in without_fragment.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    segments.join("/").to_lowercase()
}

fn file_name(normalized: &str) -> &str {
    normalized.rsplit('/').next().unwrap_or(normalized)
}

#[derive(Debug, Clone)]
struct Slot {
    label: String,
    depth: usize,
}

/// Maps section identifiers to outline labels.
///
/// Deeper entries override shallower ones pointing at the same file (a
/// department heading usually links to its first article); among entries at
/// the same depth the first one wins. Lookups fall back to the bare file name
/// when it identifies a single outline target, since outline hrefs are often
/// relative to the navigation file rather than the container root.
#[derive(Debug, Clone, Default)]
pub struct OutlineMap {
    by_path: HashMap<String, Slot>,
    by_name: HashMap<String, Option<String>>,
}

impl OutlineMap {
    pub fn from_entries(entries: &[OutlineEntry]) -> Self {
        let mut map = Self::default();
        for entry in entries {
            map.insert_recursive(entry, 0);
        }
        map.index_names();
        map
    }

    fn insert_recursive(&mut self, entry: &OutlineEntry, depth: usize) {
        let label = entry.label.trim();
        let key = normalize_href(&entry.href);
        if !label.is_empty() && !key.is_empty() {
            let replace = self
                .by_path
                .get(&key)
                .map_or(true, |existing| depth > existing.depth);
            if replace {
                self.by_path.insert(
                    key,
                    Slot {
                        label: label.to_string(),
                        depth,
                    },
                );
            }
        }
        for child in &entry.children {
            self.insert_recursive(child, depth + 1);
        }
    }

    fn index_names(&mut self) {
        let mut by_name: HashMap<String, Option<String>> = HashMap::new();
        for (path, slot) in &self.by_path {
            by_name
                .entry(file_name(path).to_string())
                .and_modify(|existing| *existing = None)
                .or_insert_with(|| Some(slot.label.clone()));
        }
        self.by_name = by_name;
    }

    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }

    /// Outline label for a section href, if any.
    pub fn lookup(&self, href: &str) -> Option<&str> {
        let key = normalize_href(href);
        if let Some(slot) = self.by_path.get(&key) {
            return Some(&slot.label);
        }
        self.by_name
            .get(file_name(&key))
            .and_then(|label| label.as_deref())
    }
}
