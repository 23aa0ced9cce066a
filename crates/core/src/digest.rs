//! End-to-end digest pipeline: document in, rendered documents out.
//!
//! Drives one run through its status lifecycle:
//! `processing` (fan-out) → `building` (aggregate + write) → `completed`,
//! or `error` on any hard failure.
//!
//! A combined run fans out both transforms over the same articles and
//! renders one document per transform. The analysis document takes its
//! headings from the translated titles where one exists.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::aggregator::{
    aggregate, default_filters, extract_title, AggregateError, Aggregated, FailureSummary,
};
use crate::document::{load_epub_bytes, Document, DocumentError};
use crate::metrics;
use crate::orchestrator::{Orchestrator, ProcessingResult};
use crate::run::{RunRegistry, RunState};
use crate::segmenter::{Article, KeywordConfig, Segmenter};
use crate::transform::{ArticleTransform, RunKind, TransformKind};
use crate::writer::{DocumentWriter, OutputName, WriterError};

/// Errors that end a run in the `error` state.
#[derive(Debug, thiserror::Error)]
pub enum DigestError {
    #[error("failed to load document: {0}")]
    Document(#[from] DocumentError),

    #[error("no articles found in document")]
    NoArticles,

    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    #[error("{kind}: {source}")]
    Flow {
        kind: TransformKind,
        #[source]
        source: AggregateError,
    },

    #[error("failed to write document: {0}")]
    Writer(#[from] WriterError),

    #[error("internal error: {0}")]
    Internal(String),
}

/// One rendered document of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSummary {
    pub kind: TransformKind,
    pub written: usize,
    pub failures: FailureSummary,
    pub filtered: Vec<usize>,
    pub file_name: String,
}

/// What a completed run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestSummary {
    pub articles: usize,
    pub documents: Vec<DocumentSummary>,
}

impl DigestSummary {
    pub fn document(&self, kind: TransformKind) -> Option<&DocumentSummary> {
        self.documents.iter().find(|doc| doc.kind == kind)
    }
}

/// One run's inputs besides the document.
#[derive(Clone)]
pub struct DigestJob {
    pub run_id: String,
    pub kind: RunKind,
    pub upload_name: Option<String>,
    /// One transform per output document, in `kind.transforms()` order.
    pub transforms: Vec<(TransformKind, Arc<dyn ArticleTransform>)>,
}

impl DigestJob {
    /// A job whose transforms come from `factory`, one per kind the run needs.
    pub fn new<F>(
        run_id: impl Into<String>,
        kind: RunKind,
        upload_name: Option<String>,
        factory: F,
    ) -> Self
    where
        F: Fn(TransformKind) -> Arc<dyn ArticleTransform>,
    {
        Self {
            run_id: run_id.into(),
            kind,
            upload_name,
            transforms: kind.transforms().iter().map(|&k| (k, factory(k))).collect(),
        }
    }

    /// A single-transform job.
    pub fn single(
        run_id: impl Into<String>,
        kind: TransformKind,
        upload_name: Option<String>,
        transform: Arc<dyn ArticleTransform>,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            kind: kind.into(),
            upload_name,
            transforms: vec![(kind, transform)],
        }
    }
}

/// Segment → fan out → aggregate → write, recording progress in the registry.
#[derive(Clone)]
pub struct DigestPipeline {
    segmenter: Arc<Segmenter>,
    orchestrator: Orchestrator,
    writer: Arc<dyn DocumentWriter>,
    keywords: KeywordConfig,
}

impl DigestPipeline {
    pub fn new(
        segmenter: Arc<Segmenter>,
        orchestrator: Orchestrator,
        writer: Arc<dyn DocumentWriter>,
        keywords: &KeywordConfig,
    ) -> Self {
        Self {
            segmenter,
            orchestrator,
            writer,
            keywords: keywords.clone(),
        }
    }

    pub fn runs(&self) -> &Arc<RunRegistry> {
        self.orchestrator.runs()
    }

    /// Load an uploaded EPUB off the async runtime, then run it.
    pub async fn run_upload(&self, job: DigestJob, bytes: Vec<u8>) -> Result<DigestSummary, DigestError> {
        self.ensure_registered(&job.run_id).await;

        let loaded = tokio::task::spawn_blocking(move || load_epub_bytes(bytes))
            .await
            .map_err(|e| DigestError::Internal(e.to_string()))
            .and_then(|r| r.map_err(DigestError::from));

        match loaded {
            Ok(document) => self.run(job, &document).await,
            Err(e) => Err(self.fail(&job.run_id, e).await),
        }
    }

    /// Run a parsed document to completion.
    pub async fn run(&self, job: DigestJob, document: &Document) -> Result<DigestSummary, DigestError> {
        self.ensure_registered(&job.run_id).await;
        let started = Instant::now();

        match self.execute(&job, document).await {
            Ok(summary) => {
                metrics::RUNS_TOTAL.with_label_values(&["completed"]).inc();
                for doc in &summary.documents {
                    info!(
                        run_id = %job.run_id,
                        kind = %doc.kind,
                        written = doc.written,
                        failed = doc.failures.count,
                        filtered = doc.filtered.len(),
                        file_name = %doc.file_name,
                        "Document rendered"
                    );
                }
                info!(
                    run_id = %job.run_id,
                    kind = %job.kind,
                    articles = summary.articles,
                    documents = summary.documents.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Run completed"
                );
                Ok(summary)
            }
            Err(e) => Err(self.fail(&job.run_id, e).await),
        }
    }

    async fn execute(&self, job: &DigestJob, document: &Document) -> Result<DigestSummary, DigestError> {
        let runs = self.runs();

        let articles = Arc::new(self.segmenter.segment(document));
        if articles.is_empty() {
            return Err(DigestError::NoArticles);
        }
        if job.transforms.is_empty() {
            return Err(DigestError::Internal("run has no transforms".to_string()));
        }
        runs.set_total(&job.run_id, articles.len() * job.transforms.len()).await;

        let outcomes = self.fan_out(job, &articles).await?;

        runs.set_state(&job.run_id, RunState::Building).await;
        let mut flows = Vec::with_capacity(outcomes.len());
        for (kind, results) in outcomes {
            let filters = default_filters(kind, &self.keywords);
            let aggregated = aggregate(results, &articles, &filters).map_err(|source| {
                if job.kind.is_combined() {
                    DigestError::Flow { kind, source }
                } else {
                    DigestError::Aggregate(source)
                }
            })?;
            flows.push((kind, aggregated));
        }

        let titles = if job.kind.is_combined() {
            translated_titles(&flows)
        } else {
            HashMap::new()
        };

        let title = document
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(job.transforms[0].0.fallback_file_stem());

        let mut rendered = Vec::with_capacity(flows.len());
        let mut documents = Vec::with_capacity(flows.len());
        for (kind, aggregated) in flows {
            let headings: Vec<Option<String>> = match kind {
                TransformKind::Analyze => aggregated
                    .indices
                    .iter()
                    .map(|index| titles.get(index).cloned())
                    .collect(),
                TransformKind::Translate => Vec::new(),
            };
            let upload_name = job.upload_name.as_deref();
            let name = if job.kind.is_combined() {
                OutputName::combined(upload_name, kind, self.writer.extension())
            } else {
                OutputName::single(upload_name, kind, self.writer.extension())
            };
            let doc = self
                .writer
                .render(title, &aggregated.entries, &headings, kind, name)?;

            documents.push(DocumentSummary {
                kind,
                written: aggregated.entries.len(),
                failures: aggregated.failures,
                filtered: aggregated.filtered,
                file_name: doc.file_name.clone(),
            });
            rendered.push(doc);
        }
        runs.complete(&job.run_id, rendered).await;

        Ok(DigestSummary {
            articles: articles.len(),
            documents,
        })
    }

    /// Run every transform of the job concurrently over the same articles.
    ///
    /// All flows draw permits from the one orchestrator gate. Results come
    /// back in the job's transform order.
    async fn fan_out(
        &self,
        job: &DigestJob,
        articles: &Arc<Vec<Article>>,
    ) -> Result<Vec<(TransformKind, Vec<ProcessingResult>)>, DigestError> {
        let mut set = JoinSet::new();
        for (position, (kind, transform)) in job.transforms.iter().enumerate() {
            let orchestrator = self.orchestrator.clone();
            let run_id = job.run_id.clone();
            let articles = Arc::clone(articles);
            let transform = Arc::clone(transform);
            let kind = *kind;
            set.spawn(async move {
                let results = orchestrator.run_all(&run_id, &articles, transform).await;
                (position, kind, results)
            });
        }

        let mut outcomes = Vec::with_capacity(job.transforms.len());
        while let Some(joined) = set.join_next().await {
            outcomes.push(joined.map_err(|e| DigestError::Internal(e.to_string()))?);
        }
        outcomes.sort_by_key(|(position, _, _)| *position);
        Ok(outcomes
            .into_iter()
            .map(|(_, kind, results)| (kind, results))
            .collect())
    }

    async fn ensure_registered(&self, run_id: &str) {
        if self.runs().snapshot(run_id).await.is_none() {
            self.runs().begin(run_id, 0).await;
        }
    }

    async fn fail(&self, run_id: &str, e: DigestError) -> DigestError {
        error!(run_id, error = %e, "Run failed");
        metrics::RUNS_TOTAL.with_label_values(&["error"]).inc();
        self.runs().fail(run_id, e.to_string()).await;
        e
    }
}

/// Item index → title parsed from the kept translation payloads.
fn translated_titles(flows: &[(TransformKind, Aggregated)]) -> HashMap<usize, String> {
    flows
        .iter()
        .filter(|(kind, _)| *kind == TransformKind::Translate)
        .flat_map(|(_, aggregated)| aggregated.indices.iter().zip(&aggregated.entries))
        .filter_map(|(index, (_, payload))| extract_title(payload).map(|title| (*index, title)))
        .collect()
}
