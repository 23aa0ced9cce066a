pub mod aggregator;
pub mod config;
pub mod digest;
pub mod document;
pub mod llm;
pub mod metrics;
pub mod orchestrator;
pub mod run;
pub mod segmenter;
pub mod testing;
pub mod transform;
pub mod writer;

pub use aggregator::{aggregate, AggregateError, Aggregated, ContentFilter, FailureSummary};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use digest::{DigestError, DigestJob, DigestPipeline, DigestSummary, DocumentSummary};
pub use document::{load_epub, load_epub_bytes, Document, DocumentError, OutlineEntry, Section};
pub use llm::{LlmClient, LlmConfig, LlmError, OpenAiCompatibleClient};
pub use orchestrator::{Orchestrator, OrchestratorConfig, ProcessingResult};
pub use run::{ArtifactStatus, RunRegistry, RunSnapshot, RunState};
pub use segmenter::{Article, KeywordConfig, Segmenter, SegmenterConfig};
pub use transform::{ArticleTransform, LlmTransform, RunKind, TransformError, TransformKind};
pub use writer::{DocumentWriter, MarkdownWriter, OutputName, RenderedDocument, WriterError};
