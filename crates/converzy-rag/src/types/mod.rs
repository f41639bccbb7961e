//! Core types for the question-answering service

pub mod backend;
pub mod request;
pub mod response;
pub mod turn;

pub use backend::{BackendChoice, CredentialSource};
pub use request::{AskQuestionRequest, GenerateEmbeddingsRequest};
pub use response::{AnswerResult, AskResponse, EmbeddingsResponse, ErrorCategory};
pub use turn::{Role, Turn, TurnCounts};
