//! Application state for the HTTP server

use parking_lot::RwLock;
use std::sync::Arc;

use crate::chat::QuestionPipeline;
use crate::config::RagConfig;
use crate::error::Result;
use crate::providers::{BackendSelector, PineconeStore};
use crate::storage::SqliteChatStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: RagConfig,
    /// Question / embedding entry points
    pipeline: QuestionPipeline,
    /// Ready state
    ready: RwLock<bool>,
}

impl AppState {
    /// Create application state from configuration
    pub fn new(config: RagConfig) -> Result<Self> {
        tracing::info!("Initializing application state...");

        let store = Arc::new(SqliteChatStore::new(&config.storage.database_path)?);
        tracing::info!("Chat store opened at {}", config.storage.database_path.display());

        let vector_store = Arc::new(PineconeStore::new(&config.vector_db)?);
        tracing::info!("Pinecone index: {}", config.vector_db.host);

        let resolver = Arc::new(BackendSelector::new(config.openai.clone(), config.gemini.clone()));
        if config.openai.api_key.is_none() {
            tracing::warn!("No OpenAI service key configured; only caller-key requests can use OpenAI");
        }
        if config.gemini.api_key.is_none() {
            tracing::warn!("No Gemini service key configured; Gemini requests will fail");
        }

        let pipeline = QuestionPipeline::new(store, resolver, vector_store, &config);
        Ok(Self::from_parts(config, pipeline))
    }

    /// Assemble state around an already-built pipeline
    pub fn from_parts(config: RagConfig, pipeline: QuestionPipeline) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pipeline,
                ready: RwLock::new(true),
            }),
        }
    }

    /// Get configuration
    pub fn config(&self) -> &RagConfig {
        &self.inner.config
    }

    /// Get the question pipeline
    pub fn pipeline(&self) -> &QuestionPipeline {
        &self.inner.pipeline
    }

    /// Check if the server is ready
    pub fn is_ready(&self) -> bool {
        *self.inner.ready.read()
    }

    /// Set ready state
    pub fn set_ready(&self, ready: bool) {
        *self.inner.ready.write() = ready;
    }
}
