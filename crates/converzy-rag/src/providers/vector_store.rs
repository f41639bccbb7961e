//! Vector store provider trait for storing and searching embeddings

use async_trait::async_trait;
use crate::error::Result;

/// A passage to store in a document's namespace
#[derive(Debug, Clone)]
pub struct VectorRecord {
    /// Vector id (unique within the namespace)
    pub id: String,
    /// Embedding values
    pub values: Vec<f32>,
    /// Passage text, kept as metadata for prompt construction
    pub text: String,
    /// Position of the passage within the document
    pub chunk_index: usize,
}

/// Search result from vector store
#[derive(Debug, Clone)]
pub struct VectorMatch {
    /// Vector id
    pub id: String,
    /// Similarity score (higher is more similar)
    pub score: f32,
    /// Passage text from metadata
    pub text: String,
}

/// Trait for vector storage and similarity search
///
/// Each document's passages live in their own namespace, keyed by document id.
///
/// Implementations:
/// - `PineconeStore`: Pinecone serverless / pod index
#[async_trait]
pub trait VectorStoreProvider: Send + Sync {
    /// Search a namespace for the passages nearest to `vector`
    async fn query(&self, namespace: &str, vector: &[f32], top_k: usize) -> Result<Vec<VectorMatch>>;

    /// Insert or overwrite passages in a namespace; returns the number written
    async fn upsert(&self, namespace: &str, records: &[VectorRecord]) -> Result<usize>;

    /// Whether the namespace already holds vectors
    async fn namespace_exists(&self, namespace: &str) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
