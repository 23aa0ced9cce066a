use std::sync::Arc;

use broadsheet_core::{
    ArticleTransform, Config, DigestPipeline, LlmClient, LlmTransform, MarkdownWriter,
    Orchestrator, RunRegistry, SanitizedConfig, Segmenter, TransformKind,
};

/// Builds the per-article transform for a run of the given kind.
pub type TransformFactory = Arc<dyn Fn(TransformKind) -> Arc<dyn ArticleTransform> + Send + Sync>;

/// Shared application state
pub struct AppState {
    config: Config,
    pipeline: DigestPipeline,
    transforms: TransformFactory,
}

impl AppState {
    /// Wire the segmenter, run registry, orchestrator and writer from `config`.
    pub fn new(config: Config, transforms: TransformFactory) -> Self {
        let runs = Arc::new(RunRegistry::new());
        let segmenter = Arc::new(Segmenter::new(&config.segmenter, &config.keywords));
        let orchestrator = Orchestrator::new(&config.orchestrator, runs);
        let writer = Arc::new(MarkdownWriter::new(&config.keywords));
        let pipeline = DigestPipeline::new(segmenter, orchestrator, writer, &config.keywords);

        Self {
            config,
            pipeline,
            transforms,
        }
    }

    /// State whose transforms call `client`.
    pub fn with_llm(config: Config, client: Arc<dyn LlmClient>) -> Self {
        let llm_config = config.llm.clone();
        let transforms: TransformFactory = Arc::new(move |kind| {
            Arc::new(LlmTransform::new(Arc::clone(&client), kind, &llm_config))
                as Arc<dyn ArticleTransform>
        });
        Self::new(config, transforms)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn pipeline(&self) -> &DigestPipeline {
        &self.pipeline
    }

    pub fn runs(&self) -> &Arc<RunRegistry> {
        self.pipeline.runs()
    }

    pub fn transform(&self, kind: TransformKind) -> Arc<dyn ArticleTransform> {
        (self.transforms)(kind)
    }
}
