//! Provider abstractions for embeddings, generation and vector storage
//!
//! OpenAI is the primary backend, Gemini the alternate. Pinecone holds one
//! namespace of passage vectors per document.

pub mod embedding;
pub mod gemini;
pub mod llm;
pub mod openai;
pub mod pinecone;
pub mod selector;
pub mod vector_store;

pub use embedding::EmbeddingProvider;
pub use llm::LlmProvider;
pub use pinecone::PineconeStore;
pub use selector::{BackendResolver, BackendSelector, ResolvedBackend};
pub use vector_store::{VectorMatch, VectorRecord, VectorStoreProvider};
