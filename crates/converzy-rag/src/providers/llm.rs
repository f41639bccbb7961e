//! LLM provider trait for generating answers

use async_trait::async_trait;
use crate::error::Result;
use crate::types::Turn;

/// Trait for LLM-based answer generation
///
/// Implementations:
/// - `OpenAiChat`: OpenAI chat completions (gpt-4o)
/// - `GeminiChat`: Google Generative Language API (gemini-1.5-pro)
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate an answer from retrieved context and the prior conversation
    ///
    /// `history` is oldest first and does not include `question`.
    async fn generate_answer(
        &self,
        question: &str,
        context: &str,
        history: &[Turn],
    ) -> Result<String>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
