//! Backend selection
//!
//! Turns a per-request [`BackendChoice`] into ready-to-use generation and
//! embedding handles. Handles are built per request since the credential can
//! differ between requests.

use secrecy::SecretString;
use std::sync::Arc;

use crate::config::{GeminiConfig, OpenAiConfig};
use crate::error::{Error, Result};
use crate::providers::gemini::{GeminiChat, GeminiClient, GeminiEmbedder};
use crate::providers::openai::{OpenAiChat, OpenAiClient, OpenAiEmbedder};
use crate::providers::{EmbeddingProvider, LlmProvider};
use crate::types::{BackendChoice, CredentialSource};

/// Generation and embedding handles for one request
#[derive(Clone)]
pub struct ResolvedBackend {
    pub llm: Arc<dyn LlmProvider>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub source: CredentialSource,
}

impl std::fmt::Debug for ResolvedBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedBackend")
            .field("llm", &self.llm.name())
            .field("model", &self.llm.model())
            .field("embedder", &self.embedder.name())
            .field("source", &self.source)
            .finish()
    }
}

/// Resolves a backend choice into provider handles
pub trait BackendResolver: Send + Sync {
    /// Fails with `Error::BackendInit` when the handles cannot be constructed
    fn resolve(&self, choice: &BackendChoice) -> Result<ResolvedBackend>;
}

/// Resolver for the OpenAI (primary) and Gemini (alternate) providers
pub struct BackendSelector {
    openai: OpenAiConfig,
    gemini: GeminiConfig,
}

impl BackendSelector {
    pub fn new(openai: OpenAiConfig, gemini: GeminiConfig) -> Self {
        Self { openai, gemini }
    }

    fn openai(&self, key: &SecretString, source: CredentialSource) -> Result<ResolvedBackend> {
        let client = Arc::new(OpenAiClient::new(&self.openai, key)?);
        Ok(ResolvedBackend {
            llm: Arc::new(OpenAiChat::new(Arc::clone(&client), &self.openai)),
            embedder: Arc::new(OpenAiEmbedder::new(client, &self.openai)),
            source,
        })
    }

    fn gemini(&self) -> Result<ResolvedBackend> {
        let key = self
            .gemini
            .api_key
            .as_ref()
            .ok_or_else(|| Error::backend_init("Gemini service credential is not configured"))?;

        let client = Arc::new(GeminiClient::new(&self.gemini, key)?);
        Ok(ResolvedBackend {
            llm: Arc::new(GeminiChat::new(Arc::clone(&client), &self.gemini)),
            embedder: Arc::new(GeminiEmbedder::new(client, &self.gemini)),
            source: CredentialSource::GeminiService,
        })
    }
}

impl BackendResolver for BackendSelector {
    fn resolve(&self, choice: &BackendChoice) -> Result<ResolvedBackend> {
        let resolved = match choice {
            BackendChoice::Gemini => self.gemini(),
            BackendChoice::CallerKey(key) => self.openai(key, CredentialSource::Caller),
            BackendChoice::ServiceDefault => {
                let key = self.openai.api_key.as_ref().ok_or_else(|| {
                    Error::backend_init("OpenAI service credential is not configured")
                })?;
                self.openai(key, CredentialSource::ServiceDefault)
            }
        }?;

        tracing::debug!(
            "Resolved backend {} (model: {}, source: {:?})",
            choice.label(),
            resolved.llm.model(),
            resolved.source
        );
        Ok(resolved)
    }
}
