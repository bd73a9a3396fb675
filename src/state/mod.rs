use std::sync::Arc;

use crate::core::config::{AppPaths, ConfigService, RagSettings};
use crate::documents::DocumentParser;
use crate::llm::{build_backends, Embedder, Generator};
use crate::rag::{OrchestratorConfig, RagOrchestrator, VectorStore};

pub mod error;

pub use error::InitializationError;

/// Process-wide handles shared by every route.
///
/// The store owns the embedder; the orchestrator holds the store and the
/// generation backend. Nothing here talks to a model until first use.
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: ConfigService,
    pub settings: Arc<RagSettings>,
    pub store: Arc<VectorStore>,
    pub generator: Arc<dyn Generator>,
    pub orchestrator: Arc<RagOrchestrator>,
    pub parser: DocumentParser,
}

impl AppState {
    /// Loads configuration from the default locations and wires the
    /// configured backends.
    pub async fn initialize() -> Result<Arc<Self>, InitializationError> {
        let paths = Arc::new(AppPaths::new());
        let config = ConfigService::new(paths.clone());
        Self::from_config(config).await
    }

    pub async fn from_config(config: ConfigService) -> Result<Arc<Self>, InitializationError> {
        let raw = config.load_config()?;
        let settings = RagSettings::from_config(&raw, config.paths());
        let (generator, embedder) = build_backends(&settings.llm);

        tracing::info!(
            "Using {} at {} (generation: {}, embeddings: {})",
            generator.name(),
            settings.llm.base_url,
            settings.llm.generation_model,
            settings.llm.embedding_model
        );

        Self::assemble(config, settings, generator, embedder).await
    }

    /// Builds the state around explicit backends.
    pub async fn assemble(
        config: ConfigService,
        settings: RagSettings,
        generator: Arc<dyn Generator>,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Arc<Self>, InitializationError> {
        let paths = Arc::new(config.paths().clone());
        let store = Arc::new(VectorStore::open(settings.store_path.clone(), embedder).await?);
        let parser = DocumentParser::new(settings.web_fetch_timeout)?;
        let orchestrator = Arc::new(RagOrchestrator::new(
            store.clone(),
            generator.clone(),
            OrchestratorConfig::from(&settings),
        ));

        Ok(Arc::new(AppState {
            paths,
            config,
            settings: Arc::new(settings),
            store,
            generator,
            orchestrator,
            parser,
        }))
    }
}
