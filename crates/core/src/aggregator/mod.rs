//! Reassembly of fan-out results into an ordered, filtered document body.

mod filters;
mod payload;

pub use filters::{
    default_filters, CartoonFilter, ContentFilter, RoundupIntroFilter, SkipMarkerFilter,
};
pub use payload::{
    extract_title, generated_title, is_title_chunk, section_text, title_from_intro, INTRO_LABEL,
    TITLE_LABEL,
};

use serde::Serialize;
use tracing::{debug, info};

use crate::orchestrator::ProcessingResult;
use crate::segmenter::Article;

/// Failures shown in an all-failed error before the count takes over.
const PREVIEW_LIMIT: usize = 5;

/// Which items failed, reported alongside a partial success.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FailureSummary {
    pub count: usize,
    pub indices: Vec<usize>,
}

/// Successful items in original order, ready for a writer.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregated {
    pub entries: Vec<(Article, String)>,
    /// 1-based item index of each entry, parallel to `entries`.
    pub indices: Vec<usize>,
    pub failures: FailureSummary,
    /// Indices whose payload a content filter removed.
    pub filtered: Vec<usize>,
}

#[derive(Debug, thiserror::Error)]
pub enum AggregateError {
    #[error("all {failed} items failed: {preview}")]
    AllFailed { failed: usize, preview: String },

    #[error("result index {index} has no matching item (run has {items})")]
    IndexOutOfRange { index: usize, items: usize },
}

/// Order successes by index, drop filtered payloads and pair each payload
/// with its article.
///
/// Fails only when no result succeeded.
pub fn aggregate(
    results: Vec<ProcessingResult>,
    items: &[Article],
    filters: &[Box<dyn ContentFilter>],
) -> Result<Aggregated, AggregateError> {
    let mut successes = Vec::new();
    let mut failures = Vec::new();
    for result in results {
        match result.outcome {
            Ok(payload) => successes.push((result.index, payload)),
            Err(error) => failures.push((result.index, error)),
        }
    }
    failures.sort_by_key(|(index, _)| *index);

    if successes.is_empty() {
        return Err(AggregateError::AllFailed {
            failed: failures.len(),
            preview: failure_preview(&failures),
        });
    }

    successes.sort_by_key(|(index, _)| *index);

    let mut entries = Vec::with_capacity(successes.len());
    let mut indices = Vec::with_capacity(successes.len());
    let mut filtered = Vec::new();
    for (index, payload) in successes {
        let article = index
            .checked_sub(1)
            .and_then(|i| items.get(i))
            .ok_or(AggregateError::IndexOutOfRange {
                index,
                items: items.len(),
            })?;

        if let Some(filter) = filters.iter().find(|f| f.matches(article, &payload)) {
            debug!(index, filter = filter.name(), title = %article.title, "Filtered payload");
            filtered.push(index);
            continue;
        }
        entries.push((article.clone(), payload));
        indices.push(index);
    }

    let summary = FailureSummary {
        count: failures.len(),
        indices: failures.into_iter().map(|(index, _)| index).collect(),
    };
    info!(
        kept = entries.len(),
        filtered = filtered.len(),
        failed = summary.count,
        "Aggregated results"
    );

    Ok(Aggregated {
        entries,
        indices,
        failures: summary,
        filtered,
    })
}

fn failure_preview(failures: &[(usize, String)]) -> String {
    let mut preview = failures
        .iter()
        .take(PREVIEW_LIMIT)
        .map(|(index, error)| format!("#{index}: {error}"))
        .collect::<Vec<_>>()
        .join("; ");
    if failures.len() > PREVIEW_LIMIT {
        preview.push_str(&format!(" ... {} failed in total", failures.len()));
    }
    preview
}
