//! Question endpoint

use axum::{
    extract::{Path, State},
    Json,
};

use crate::error::{Error, Result};
use crate::server::identity::CurrentUser;
use crate::server::state::AppState;
use crate::types::{AskQuestionRequest, AskResponse};

/// POST /api/documents/:id/questions - Ask a question about a document
///
/// Every classified outcome (including quota denial) is a 200 with
/// `success: false`; only malformed or unauthenticated requests are errors.
pub async fn ask_question(
    State(state): State<AppState>,
    CurrentUser(user_id): CurrentUser,
    Path(document_id): Path<String>,
    Json(request): Json<AskQuestionRequest>,
) -> Result<Json<AskResponse>> {
    let question = request.question.trim();
    if question.is_empty() {
        return Err(Error::invalid_request("question must not be empty"));
    }

    let result = state
        .pipeline()
        .ask_question(Some(&user_id), &document_id, question, request.backend())
        .await;

    Ok(Json(AskResponse::from(&result)))
}
