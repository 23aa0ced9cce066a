//! Process-wide registry of run progress.
//!
//! Every run is keyed by an opaque id. The orchestrator bumps progress as
//! tasks complete, the digest pipeline moves the run through its states and
//! status polling reads snapshots. Terminal runs are evicted after a TTL.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::transform::TransformKind;
use crate::writer::RenderedDocument;

/// Lifecycle state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Processing,
    Building,
    Completed,
    Error,
}

impl RunState {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Processing => "processing",
            RunState::Building => "building",
            RunState::Completed => "completed",
            RunState::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Completed | RunState::Error)
    }
}

/// Point-in-time view of a run, as returned by status polling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub status: RunState,
    pub current: usize,
    pub total: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_indices: Option<Vec<usize>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Whether a run's output document can be downloaded.
#[derive(Debug, Clone)]
pub enum ArtifactStatus {
    Missing,
    Pending(RunState),
    Ready(Arc<RenderedDocument>),
    /// The run completed without producing a document of the requested kind.
    Unavailable(TransformKind),
}

#[derive(Debug)]
struct RunRecord {
    state: RunState,
    current: usize,
    total: usize,
    failed_indices: Vec<usize>,
    error: Option<String>,
    artifacts: Vec<Arc<RenderedDocument>>,
    updated_at: DateTime<Utc>,
    finished_at: Option<Instant>,
}

impl RunRecord {
    fn new(total: usize) -> Self {
        Self {
            state: RunState::Processing,
            current: 0,
            total,
            failed_indices: Vec::new(),
            error: None,
            artifacts: Vec::new(),
            updated_at: Utc::now(),
            finished_at: None,
        }
    }

    fn transition(&mut self, state: RunState) {
        self.state = state;
        self.updated_at = Utc::now();
        self.finished_at = state.is_terminal().then(Instant::now);
    }

    fn snapshot(&self) -> RunSnapshot {
        let failed = !self.failed_indices.is_empty();
        RunSnapshot {
            status: self.state,
            current: self.current,
            total: self.total,
            failed_count: failed.then_some(self.failed_indices.len()),
            failed_indices: failed.then(|| self.failed_indices.clone()),
            error: self.error.clone(),
            updated_at: self.updated_at,
        }
    }
}

/// Lock-guarded map of run id to run status.
#[derive(Debug, Default)]
pub struct RunRegistry {
    runs: RwLock<HashMap<String, RunRecord>>,
}

impl RunRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh, unique run id.
    pub fn new_run_id() -> String {
        Uuid::new_v4().to_string()
    }

    /// Register a run in the processing state, replacing any previous entry.
    pub async fn begin(&self, run_id: &str, total: usize) {
        self.runs
            .write()
            .await
            .insert(run_id.to_string(), RunRecord::new(total));
        debug!(run_id, total, "Run registered");
    }

    pub async fn set_total(&self, run_id: &str, total: usize) {
        if let Some(record) = self.runs.write().await.get_mut(run_id) {
            record.total = total;
            record.updated_at = Utc::now();
        }
    }

    /// Count one finished task. Returns the new `(current, total)` when the run exists.
    pub async fn record_completion(
        &self,
        run_id: &str,
        index: usize,
        success: bool,
    ) -> Option<(usize, usize)> {
        let mut runs = self.runs.write().await;
        let record = runs.get_mut(run_id)?;
        record.current += 1;
        if !success {
            if let Err(pos) = record.failed_indices.binary_search(&index) {
                record.failed_indices.insert(pos, index);
            }
        }
        record.updated_at = Utc::now();
        Some((record.current, record.total))
    }

    pub async fn set_state(&self, run_id: &str, state: RunState) {
        if let Some(record) = self.runs.write().await.get_mut(run_id) {
            record.transition(state);
        }
    }

    /// Mark the run completed and attach its output documents.
    pub async fn complete(&self, run_id: &str, artifacts: Vec<RenderedDocument>) {
        if let Some(record) = self.runs.write().await.get_mut(run_id) {
            record.artifacts = artifacts.into_iter().map(Arc::new).collect();
            record.error = None;
            record.transition(RunState::Completed);
        }
    }

    /// Mark the run failed with a message for the client.
    pub async fn fail(&self, run_id: &str, error: impl Into<String>) {
        if let Some(record) = self.runs.write().await.get_mut(run_id) {
            record.error = Some(error.into());
            record.transition(RunState::Error);
        }
    }

    pub async fn snapshot(&self, run_id: &str) -> Option<RunSnapshot> {
        self.runs.read().await.get(run_id).map(RunRecord::snapshot)
    }

    /// The run's document of `kind`, or its first document when `kind` is `None`.
    pub async fn artifact(&self, run_id: &str, kind: Option<TransformKind>) -> ArtifactStatus {
        let runs = self.runs.read().await;
        let Some(record) = runs.get(run_id) else {
            return ArtifactStatus::Missing;
        };
        if record.state != RunState::Completed {
            return ArtifactStatus::Pending(record.state);
        }

        let found = match kind {
            Some(kind) => record.artifacts.iter().find(|doc| doc.kind == kind),
            None => record.artifacts.first(),
        };
        match (found, kind) {
            (Some(doc), _) => ArtifactStatus::Ready(Arc::clone(doc)),
            (None, Some(kind)) => ArtifactStatus::Unavailable(kind),
            (None, None) => ArtifactStatus::Pending(record.state),
        }
    }

    /// Drop a run. Returns whether it existed.
    pub async fn remove(&self, run_id: &str) -> bool {
        self.runs.write().await.remove(run_id).is_some()
    }

    /// Drop terminal runs that finished at least `ttl` ago.
    pub async fn evict_expired(&self, ttl: Duration) -> usize {
        let now = Instant::now();
        let mut runs = self.runs.write().await;
        let before = runs.len();
        runs.retain(|_, record| {
            record
                .finished_at
                .map_or(true, |finished| now.duration_since(finished) < ttl)
        });
        before - runs.len()
    }

    pub async fn len(&self) -> usize {
        self.runs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.runs.read().await.is_empty()
    }
}

/// Periodically evict expired runs until the task is aborted.
pub fn spawn_sweeper(registry: Arc<RunRegistry>, ttl: Duration, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let evicted = registry.evict_expired(ttl).await;
            if evicted > 0 {
                info!(evicted, "Evicted expired runs");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(kind: TransformKind, file_name: &str) -> RenderedDocument {
        RenderedDocument {
            kind,
            bytes: b"# Weekly\n".to_vec(),
            content_type: "text/markdown; charset=utf-8".to_string(),
            file_name: file_name.to_string(),
            ascii_file_name: file_name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_progress_and_failures() {
        let registry = RunRegistry::new();
        registry.begin("r1", 3).await;

        assert_eq!(registry.record_completion("r1", 3, false).await, Some((1, 3)));
        assert_eq!(registry.record_completion("r1", 1, true).await, Some((2, 3)));
        assert_eq!(registry.record_completion("r1", 2, false).await, Some((3, 3)));

        let snapshot = registry.snapshot("r1").await.unwrap();
        assert_eq!(snapshot.status, RunState::Processing);
        assert_eq!(snapshot.current, 3);
        assert_eq!(snapshot.failed_count, Some(2));
        assert_eq!(snapshot.failed_indices, Some(vec![2, 3]));
    }

    #[tokio::test]
    async fn test_unknown_run() {
        let registry = RunRegistry::new();
        assert!(registry.snapshot("nope").await.is_none());
        assert_eq!(registry.record_completion("nope", 1, true).await, None);
        assert!(matches!(registry.artifact("nope", None).await, ArtifactStatus::Missing));
        assert!(!registry.remove("nope").await);
    }

    #[tokio::test]
    async fn test_snapshot_serialization() {
        let registry = RunRegistry::new();
        registry.begin("r1", 2).await;
        registry.set_state("r1", RunState::Building).await;

        let json = serde_json::to_value(registry.snapshot("r1").await.unwrap()).unwrap();
        assert_eq!(json["status"], "building");
        assert_eq!(json["total"], 2);
        assert!(json.get("failed_count").is_none());
        assert!(json.get("error").is_none());
    }

    #[tokio::test]
    async fn test_artifact_lifecycle() {
        let registry = RunRegistry::new();
        registry.begin("r1", 1).await;
        assert!(matches!(
            registry.artifact("r1", None).await,
            ArtifactStatus::Pending(RunState::Processing)
        ));

        registry
            .complete("r1", vec![document(TransformKind::Analyze, "weekly.md")])
            .await;
        match registry.artifact("r1", None).await {
            ArtifactStatus::Ready(doc) => assert_eq!(doc.file_name, "weekly.md"),
            other => panic!("expected ready artifact, got {other:?}"),
        }
        assert!(matches!(
            registry.artifact("r1", Some(TransformKind::Translate)).await,
            ArtifactStatus::Unavailable(TransformKind::Translate)
        ));
    }

    #[tokio::test]
    async fn test_artifacts_by_kind() {
        let registry = RunRegistry::new();
        registry.begin("r1", 4).await;
        registry
            .complete(
                "r1",
                vec![
                    document(TransformKind::Analyze, "听weekly.md"),
                    document(TransformKind::Translate, "看weekly.md"),
                ],
            )
            .await;

        for (kind, expected) in [
            (Some(TransformKind::Translate), "看weekly.md"),
            (Some(TransformKind::Analyze), "听weekly.md"),
            (None, "听weekly.md"),
        ] {
            match registry.artifact("r1", kind).await {
                ArtifactStatus::Ready(doc) => assert_eq!(doc.file_name, expected),
                other => panic!("expected {expected}, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn test_fail_sets_error() {
        let registry = RunRegistry::new();
        registry.begin("r1", 4).await;
        registry.fail("r1", "all 4 items failed").await;

        let snapshot = registry.snapshot("r1").await.unwrap();
        assert_eq!(snapshot.status, RunState::Error);
        assert_eq!(snapshot.error.as_deref(), Some("all 4 items failed"));
        assert!(matches!(
            registry.artifact("r1", Some(TransformKind::Analyze)).await,
            ArtifactStatus::Pending(RunState::Error)
        ));
    }

    #[tokio::test]
    async fn test_evict_only_terminal_runs() {
        let registry = RunRegistry::new();
        registry.begin("running", 1).await;
        registry.begin("done", 1).await;
        registry.begin("failed", 1).await;
        registry
            .complete("done", vec![document(TransformKind::Analyze, "weekly.md")])
            .await;
        registry.fail("failed", "boom").await;

        assert_eq!(registry.evict_expired(Duration::from_secs(3600)).await, 0);
        assert_eq!(registry.evict_expired(Duration::ZERO).await, 2);
        assert_eq!(registry.len().await, 1);
        assert!(registry.snapshot("running").await.is_some());
    }

    #[tokio::test]
    async fn test_run_ids_unique() {
        assert_ne!(RunRegistry::new_run_id(), RunRegistry::new_run_id());
    }
}
