//! API routes for the question-answering server

pub mod embeddings;
pub mod questions;
pub mod turns;

use axum::{
    routing::{get, post},
    Router,
};

use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Questions
        .route("/documents/:id/questions", post(questions::ask_question))
        // Embedding compilation
        .route("/documents/:id/embeddings", post(embeddings::generate_embeddings))
        // Conversation history
        .route("/documents/:id/turns", get(turns::list_turns))
        // Info
        .route("/info", get(info))
}

/// API info endpoint
async fn info() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "name": "converzy-rag",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Question answering over uploaded documents",
        "endpoints": {
            "POST /api/documents/:id/questions": "Ask a question about a document",
            "POST /api/documents/:id/embeddings": "Embed a document's passages",
            "GET /api/documents/:id/turns": "Conversation history for a document"
        },
        "backends": {
            "primary": "openai",
            "alternate": "gemini",
            "vector_store": "pinecone"
        }
    }))
}
