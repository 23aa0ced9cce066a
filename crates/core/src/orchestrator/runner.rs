//! Fork-join runner for article transforms.

use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::config::OrchestratorConfig;
use super::types::ProcessingResult;
use crate::metrics;
use crate::run::RunRegistry;
use crate::segmenter::Article;
use crate::transform::ArticleTransform;

/// Keeps the in-flight gauge honest even if the transform panics.
struct InFlightGuard;

impl InFlightGuard {
    fn enter() -> Self {
        metrics::IN_FLIGHT.inc();
        Self
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        metrics::IN_FLIGHT.dec();
    }
}

/// Runs transforms under a shared concurrency gate.
///
/// Clones share the same gate and registry, so every run started from any
/// clone counts against the same limit.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    gate: Arc<Semaphore>,
    limit: usize,
    runs: Arc<RunRegistry>,
}

impl Orchestrator {
    pub fn new(config: &OrchestratorConfig, runs: Arc<RunRegistry>) -> Self {
        Self::with_limit(config.max_parallel_tasks, runs)
    }

    /// An orchestrator admitting at most `limit` concurrent calls (minimum 1).
    pub fn with_limit(limit: usize, runs: Arc<RunRegistry>) -> Self {
        let limit = limit.max(1);
        Self {
            gate: Arc::new(Semaphore::new(limit)),
            limit,
            runs,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn runs(&self) -> &Arc<RunRegistry> {
        &self.runs
    }

    /// Permits not currently held by a task.
    pub fn available_permits(&self) -> usize {
        self.gate.available_permits()
    }

    /// Transform every article and collect one result per article.
    ///
    /// Results arrive in completion order. A failing or panicking task
    /// yields an error result for its index and never cancels the others.
    pub async fn run_all(
        &self,
        run_id: &str,
        items: &[Article],
        transform: Arc<dyn ArticleTransform>,
    ) -> Vec<ProcessingResult> {
        let total = items.len();
        info!(
            run_id,
            total,
            limit = self.limit,
            transform = transform.name(),
            "Starting fan-out"
        );

        let (tx, mut rx) = mpsc::unbounded_channel::<ProcessingResult>();
        let mut tasks = JoinSet::new();

        for (position, article) in items.iter().enumerate() {
            let index = position + 1;
            let article = article.clone();
            let gate = Arc::clone(&self.gate);
            let runs = Arc::clone(&self.runs);
            let transform = Arc::clone(&transform);
            let tx = tx.clone();
            let run_id = run_id.to_string();

            tasks.spawn(async move {
                let outcome = match gate.acquire_owned().await {
                    Ok(_permit) => {
                        let _in_flight = InFlightGuard::enter();
                        let call = tokio::spawn(async move {
                            transform
                                .transform(&article, index, total)
                                .await
                                .map_err(|e| e.to_string())
                        });
                        match call.await {
                            Ok(outcome) => outcome,
                            Err(e) if e.is_panic() => Err("transform task panicked".to_string()),
                            Err(_) => Err("transform task cancelled".to_string()),
                        }
                    }
                    Err(_) => Err("concurrency gate closed".to_string()),
                };

                if let Err(ref error) = outcome {
                    warn!(run_id = %run_id, index, error = %error, "Task failed");
                }
                if let Some((current, total)) = runs
                    .record_completion(&run_id, index, outcome.is_ok())
                    .await
                {
                    debug!(run_id = %run_id, index, current, total, "Task finished");
                }
                let _ = tx.send(ProcessingResult { index, outcome });
            });
        }
        drop(tx);

        let mut results = Vec::with_capacity(total);
        while let Some(result) = rx.recv().await {
            results.push(result);
        }
        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                warn!(run_id, error = %e, "Task ended without reporting");
            }
        }

        if results.len() < total {
            let seen: HashSet<usize> = results.iter().map(|r| r.index).collect();
            for index in (1..=total).filter(|i| !seen.contains(i)) {
                self.runs.record_completion(run_id, index, false).await;
                results.push(ProcessingResult::failure(index, "task aborted"));
            }
        }

        let failed = results.iter().filter(|r| !r.is_success()).count();
        info!(run_id, total, failed, "Fan-out finished");
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::run::RunState;
    use crate::testing::{fixtures, MockTransform};
    use std::time::Duration;

    fn orchestrator(limit: usize) -> Orchestrator {
        Orchestrator::with_limit(limit, Arc::new(RunRegistry::new()))
    }

    fn sorted_indices(results: &[ProcessingResult]) -> Vec<usize> {
        let mut indices: Vec<usize> = results.iter().map(|r| r.index).collect();
        indices.sort_unstable();
        indices
    }

    #[tokio::test]
    async fn test_one_result_per_item() {
        let orch = orchestrator(3);
        orch.runs().begin("run", 10).await;
        let articles = fixtures::articles(10);

        let results = orch
            .run_all("run", &articles, Arc::new(MockTransform::new()))
            .await;

        assert_eq!(sorted_indices(&results), (1..=10).collect::<Vec<_>>());
        assert!(results.iter().all(ProcessingResult::is_success));

        let snapshot = orch.runs().snapshot("run").await.unwrap();
        assert_eq!(snapshot.current, 10);
        assert_eq!(snapshot.status, RunState::Processing);
        assert!(snapshot.failed_indices.is_none());
    }

    #[tokio::test]
    async fn test_concurrency_bounded_by_limit() {
        let orch = orchestrator(2);
        let transform = Arc::new(MockTransform::new().with_delay(Duration::from_millis(20)));
        let articles = fixtures::articles(8);

        orch.run_all("run", &articles, transform.clone()).await;

        assert_eq!(transform.calls(), 8);
        assert!(transform.max_concurrency() <= 2);
        assert_eq!(orch.available_permits(), 2);
    }

    #[tokio::test]
    async fn test_limit_does_not_change_results() {
        let articles = fixtures::articles(6);
        let mut outcomes = Vec::new();
        for limit in [1, 3, 20] {
            let transform = Arc::new(MockTransform::new().failing_on([2, 5]));
            let mut results = orchestrator(limit)
                .run_all("run", &articles, transform)
                .await;
            results.sort_by_key(|r| r.index);
            outcomes.push(results);
        }
        assert_eq!(outcomes[0], outcomes[1]);
        assert_eq!(outcomes[1], outcomes[2]);
    }

    #[tokio::test]
    async fn test_failures_do_not_cancel_siblings() {
        let orch = orchestrator(4);
        orch.runs().begin("run", 5).await;
        let transform = Arc::new(MockTransform::new().failing_on([1, 4]));

        let results = orch.run_all("run", &fixtures::articles(5), transform).await;

        assert_eq!(results.len(), 5);
        let mut failed: Vec<usize> = results
            .iter()
            .filter(|r| !r.is_success())
            .map(|r| r.index)
            .collect();
        failed.sort_unstable();
        assert_eq!(failed, vec![1, 4]);

        let snapshot = orch.runs().snapshot("run").await.unwrap();
        assert_eq!(snapshot.current, 5);
        assert_eq!(snapshot.failed_indices, Some(vec![1, 4]));
    }

    #[tokio::test]
    async fn test_panicking_task_reported_as_failure() {
        let orch = orchestrator(2);
        let transform = Arc::new(MockTransform::new().panicking_on([3]));

        let results = orch.run_all("run", &fixtures::articles(4), transform).await;

        assert_eq!(sorted_indices(&results), vec![1, 2, 3, 4]);
        let third = results.iter().find(|r| r.index == 3).unwrap();
        assert_eq!(third.error(), Some("transform task panicked"));
        assert_eq!(orch.available_permits(), 2);
    }

    #[tokio::test]
    async fn test_gate_shared_between_clones() {
        let orch = orchestrator(1);
        let other = orch.clone();
        let transform = Arc::new(MockTransform::new().with_delay(Duration::from_millis(10)));
        let articles = fixtures::articles(3);

        let (a, b) = tokio::join!(
            orch.run_all("a", &articles, transform.clone()),
            other.run_all("b", &articles, transform.clone()),
        );

        assert_eq!(a.len() + b.len(), 6);
        assert_eq!(transform.max_concurrency(), 1);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let results = orchestrator(2)
            .run_all("run", &[], Arc::new(MockTransform::new()))
            .await;
        assert!(results.is_empty());
    }
}
