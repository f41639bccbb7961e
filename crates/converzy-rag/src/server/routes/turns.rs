//! Conversation history endpoint

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use crate::error::Result;
use crate::server::identity::CurrentUser;
use crate::server::state::AppState;
use crate::types::{Turn, TurnCounts};

#[derive(Debug, Serialize)]
pub struct TurnsResponse {
    pub document_id: String,
    pub counts: TurnCounts,
    pub turns: Vec<Turn>,
}

/// GET /api/documents/:id/turns - The caller's conversation, oldest first
pub async fn list_turns(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(document_id): Path<String>,
) -> Result<Json<TurnsResponse>> {
    let turns = state.pipeline().conversation(&user_id, &document_id).await?;

    Ok(Json(TurnsResponse {
        counts: TurnCounts::from_turns(&turns),
        document_id,
        turns,
    }))
}
