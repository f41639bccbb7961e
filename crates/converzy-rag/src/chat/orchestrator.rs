//! RAG orchestrator
//!
//! Embeds the question, retrieves passages from the document's namespace and
//! asks the generation model for an answer. One attempt per call; provider
//! errors are returned as-is for the classifier.

use std::sync::Arc;
use std::time::Instant;

use crate::error::{Error, Result};
use crate::generation::PromptBuilder;
use crate::providers::{ResolvedBackend, VectorRecord, VectorStoreProvider};
use crate::types::Turn;

pub struct RagOrchestrator {
    vector_store: Arc<dyn VectorStoreProvider>,
    top_k: usize,
}

impl RagOrchestrator {
    pub fn new(vector_store: Arc<dyn VectorStoreProvider>, top_k: usize) -> Self {
        Self { vector_store, top_k }
    }

    /// Answer `question` about `document_id`, given the conversation so far
    pub async fn answer(
        &self,
        document_id: &str,
        question: &str,
        history: &[Turn],
        backend: &ResolvedBackend,
    ) -> Result<String> {
        let start = Instant::now();

        let query_embedding = backend.embedder.embed(question).await?;
        if query_embedding.len() != backend.embedder.dimensions() {
            tracing::warn!(
                "{} returned {} dims, expected {}",
                backend.embedder.name(),
                query_embedding.len(),
                backend.embedder.dimensions()
            );
        }

        let matches = self
            .vector_store
            .query(document_id, &query_embedding, self.top_k)
            .await?;

        tracing::debug!(
            "Retrieved {} passages from {} namespace {}",
            matches.len(),
            self.vector_store.name(),
            document_id
        );

        let context = PromptBuilder::build_context(&matches);
        let answer = backend.llm.generate_answer(question, &context, history).await?;

        tracing::info!(
            "Answered question on document {} with {} in {}ms",
            document_id,
            backend.llm.model(),
            start.elapsed().as_millis()
        );

        Ok(answer)
    }

    /// Whether the document already has vectors in the store
    pub async fn is_indexed(&self, document_id: &str) -> Result<bool> {
        self.vector_store.namespace_exists(document_id).await
    }

    /// Embed pre-split passages and upsert them into the document's namespace
    pub async fn index(&self, document_id: &str, chunks: &[String], backend: &ResolvedBackend) -> Result<usize> {
        let chunks: Vec<String> = chunks
            .iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();

        if chunks.is_empty() {
            return Err(Error::embedding("No text to embed"));
        }

        let embeddings = backend.embedder.embed_batch(&chunks).await?;
        if embeddings.len() != chunks.len() {
            return Err(Error::embedding(format!(
                "Expected {} embeddings, received {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        let records: Vec<VectorRecord> = chunks
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(i, (text, values))| VectorRecord {
                id: format!("{}#{}", document_id, i),
                values,
                text,
                chunk_index: i,
            })
            .collect();

        let upserted = self.vector_store.upsert(document_id, &records).await?;
        tracing::info!(
            "Indexed {} passages for document {} with {}",
            upserted,
            document_id,
            backend.embedder.name()
        );
        Ok(upserted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::testing::{backend, FakeEmbedder, FakeLlm, FakeVectorStore};
    use crate::providers::VectorMatch;

    #[tokio::test]
    async fn test_answer_passes_context_and_history() {
        let store = Arc::new(FakeVectorStore::with_matches(vec![VectorMatch {
            id: "doc-1#0".to_string(),
            score: 0.9,
            text: "The warranty lasts two years.".to_string(),
        }]));
        let llm = Arc::new(FakeLlm::answering("Two years."));
        let orchestrator = RagOrchestrator::new(store.clone(), 4);

        let history = vec![Turn::human("Hi"), Turn::ai("Hello")];
        let answer = orchestrator
            .answer("doc-1", "How long is the warranty?", &history, &backend(llm.clone(), FakeEmbedder::new(3)))
            .await
            .unwrap();

        assert_eq!(answer, "Two years.");
        let call = llm.last_call().unwrap();
        assert!(call.context.contains("The warranty lasts two years."));
        assert_eq!(call.history_len, 2);
        assert_eq!(store.queried_namespaces(), vec!["doc-1".to_string()]);
    }

    #[tokio::test]
    async fn test_vector_store_error_is_returned_unchanged() {
        let store = Arc::new(FakeVectorStore::failing(|| Error::DimensionMismatch {
            actual: 768,
            expected: 1536,
        }));
        let llm = Arc::new(FakeLlm::answering("unused"));
        let orchestrator = RagOrchestrator::new(store, 4);

        let result = orchestrator
            .answer("doc-1", "q", &[], &backend(llm.clone(), FakeEmbedder::new(768)))
            .await;

        assert!(matches!(result, Err(Error::DimensionMismatch { actual: 768, expected: 1536 })));
        assert!(llm.last_call().is_none());
    }

    #[tokio::test]
    async fn test_index_skips_blank_chunks() {
        let store = Arc::new(FakeVectorStore::default());
        let orchestrator = RagOrchestrator::new(store.clone(), 4);
        let chunks = vec!["First passage.".to_string(), "   ".to_string(), "Second.".to_string()];

        let upserted = orchestrator
            .index("doc-1", &chunks, &backend(Arc::new(FakeLlm::answering("")), FakeEmbedder::new(2)))
            .await
            .unwrap();

        assert_eq!(upserted, 2);
        let records = store.upserted("doc-1");
        assert_eq!(records[1].text, "Second.");
        assert_eq!(records[1].chunk_index, 1);
    }
}
