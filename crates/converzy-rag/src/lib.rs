//! converzy-rag: question answering over uploaded documents
//!
//! Each question is checked against a per-plan quota, recorded in a
//! per-document chat log, answered by retrieval-augmented generation against
//! a Pinecone namespace, and reduced to a uniform `{success, message}`
//! outcome. OpenAI is the primary provider and Gemini the alternate.

pub mod chat;
pub mod config;
pub mod error;
pub mod generation;
pub mod providers;
pub mod server;
pub mod storage;
pub mod types;

pub use chat::QuestionPipeline;
pub use config::RagConfig;
pub use error::{Error, Result};
pub use types::{AnswerResult, AskResponse, BackendChoice, EmbeddingsResponse, ErrorCategory, Turn};
