//! Types for the run orchestrator.

/// Outcome of one item's transform.
///
/// `index` is the item's 1-based position in the run. Exactly one of
/// payload or error is present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingResult {
    pub index: usize,
    pub outcome: Result<String, String>,
}

impl ProcessingResult {
    pub fn success(index: usize, payload: impl Into<String>) -> Self {
        Self {
            index,
            outcome: Ok(payload.into()),
        }
    }

    pub fn failure(index: usize, error: impl Into<String>) -> Self {
        Self {
            index,
            outcome: Err(error.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    pub fn payload(&self) -> Option<&str> {
        self.outcome.as_deref().ok()
    }

    pub fn error(&self) -> Option<&str> {
        self.outcome.as_ref().err().map(String::as_str)
    }
}
