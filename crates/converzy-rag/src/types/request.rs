//! Request bodies for the HTTP entry points

use serde::Deserialize;

use super::backend::BackendChoice;

/// Body of `POST /api/documents/:id/questions`
#[derive(Debug, Clone, Deserialize)]
pub struct AskQuestionRequest {
    /// The question to answer
    pub question: String,
    /// Caller-owned OpenAI key (bypasses quota)
    #[serde(default)]
    pub openai_api_key: Option<String>,
    /// Use the alternate (Gemini) provider
    #[serde(default)]
    pub use_gemini: bool,
}

impl AskQuestionRequest {
    pub fn backend(&self) -> BackendChoice {
        BackendChoice::from_flags(self.openai_api_key.as_deref(), self.use_gemini)
    }
}

/// Body of `POST /api/documents/:id/embeddings`
///
/// `chunks` are pre-split passages produced by the ingestion pipeline.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateEmbeddingsRequest {
    pub chunks: Vec<String>,
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default)]
    pub use_gemini: bool,
}

impl GenerateEmbeddingsRequest {
    pub fn backend(&self) -> BackendChoice {
        BackendChoice::from_flags(self.openai_api_key.as_deref(), self.use_gemini)
    }
}
