//! Embedding endpoint

use axum::{
    extract::{Path, State},
    Json,
};

use crate::error::{Error, Result};
use crate::server::identity::CurrentUser;
use crate::server::state::AppState;
use crate::types::{EmbeddingsResponse, GenerateEmbeddingsRequest};

/// POST /api/documents/:id/embeddings - Embed a document's passages
pub async fn generate_embeddings(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(document_id): Path<String>,
    Json(request): Json<GenerateEmbeddingsRequest>,
) -> Result<Json<EmbeddingsResponse>> {
    if request.chunks.iter().all(|c| c.trim().is_empty()) {
        return Err(Error::invalid_request("chunks must contain text"));
    }

    let response = state
        .pipeline()
        .generate_embeddings(Some(&user_id), &document_id, &request.chunks, request.backend())
        .await;

    Ok(Json(response))
}
