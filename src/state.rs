use std::sync::Arc;

use crate::chat::{ChatOrchestrator, GatedGenerator};
use crate::config::Config;
use crate::llm::{Embedder, Generator, HttpEmbedder, HttpGenerator};
use crate::metrics::Metrics;
use crate::policy::PolicyEngine;
use crate::search::retriever::Retriever;
use crate::search::vector::VectorStore;

/// Shared application state. Built once at startup; every field is read-only
/// afterwards apart from the store's internal lock and the metric counters.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub orchestrator: Arc<ChatOrchestrator>,
    pub store: Arc<VectorStore>,
    pub embedder: Arc<dyn Embedder>,
    pub metrics: Arc<Metrics>,
}

impl AppState {
    /// Production wiring: HTTP providers and the on-disk vector store.
    pub fn new(config: Config) -> anyhow::Result<Self> {
        let store = VectorStore::open_or_create(&config.vector_dir())?;

        let http_client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .timeout(std::time::Duration::from_secs(120))
            .build()?;

        let embedder = Arc::new(HttpEmbedder::new(
            http_client.clone(),
            config.embedding.clone(),
        ));
        let generator = Arc::new(HttpGenerator::new(http_client, config.llm.clone()));

        Ok(Self::from_parts(
            config,
            Arc::new(store),
            embedder,
            generator,
            PolicyEngine::default(),
        ))
    }

    /// Assemble state from explicit collaborators.
    pub fn from_parts(
        config: Config,
        store: Arc<VectorStore>,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
        policy: PolicyEngine,
    ) -> Self {
        let metrics = Arc::new(Metrics::new());
        let gated = GatedGenerator::new(
            generator,
            Arc::new(policy),
            metrics.clone(),
            config.llm.timeout(),
        );
        let retriever = Retriever::new(
            embedder.clone(),
            store.clone(),
            config.retrieval.clone(),
        );
        let orchestrator =
            ChatOrchestrator::new(gated, retriever, metrics.clone(), config.chat.clone());

        Self {
            config: Arc::new(config),
            orchestrator: Arc::new(orchestrator),
            store,
            embedder,
            metrics,
        }
    }
}
