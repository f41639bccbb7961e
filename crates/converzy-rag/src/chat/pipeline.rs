//! Question and embedding entry points
//!
//! Every outcome leaves here as an [`AnswerResult`] or [`EmbeddingsResponse`];
//! errors are classified and logged, never returned.

use std::sync::Arc;

use crate::chat::classifier::{classify, Classification};
use crate::chat::orchestrator::RagOrchestrator;
use crate::chat::quota::{QuotaDecision, QuotaGuard};
use crate::chat::turn_log::TurnLogWriter;
use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::providers::{BackendResolver, VectorStoreProvider};
use crate::storage::{ChatStore, ProfileStore};
use crate::types::{AnswerResult, BackendChoice, EmbeddingsResponse, ErrorCategory, Role, Turn};

pub struct QuestionPipeline {
    quota: QuotaGuard,
    turn_log: TurnLogWriter,
    turns: Arc<dyn ChatStore>,
    resolver: Arc<dyn BackendResolver>,
    orchestrator: RagOrchestrator,
    history_turns: usize,
}

impl QuestionPipeline {
    pub fn new<S>(
        store: Arc<S>,
        resolver: Arc<dyn BackendResolver>,
        vector_store: Arc<dyn VectorStoreProvider>,
        config: &RagConfig,
    ) -> Self
    where
        S: ChatStore + ProfileStore + 'static,
    {
        let turns: Arc<dyn ChatStore> = store.clone();
        let profiles: Arc<dyn ProfileStore> = store;

        Self {
            quota: QuotaGuard::new(Arc::clone(&turns), profiles, config.quota.clone()),
            turn_log: TurnLogWriter::new(Arc::clone(&turns)),
            turns,
            resolver,
            orchestrator: RagOrchestrator::new(vector_store, config.retrieval.top_k),
            history_turns: config.retrieval.history_turns,
        }
    }

    /// Answer a question about a document
    ///
    /// Order of effects: identity check, quota check, human turn, backend
    /// resolution, generation, ai turn. Nothing is written for an
    /// unauthenticated or over-quota request.
    pub async fn ask_question(
        &self,
        user_id: Option<&str>,
        document_id: &str,
        question: &str,
        backend: BackendChoice,
    ) -> AnswerResult {
        let Some(user_id) = authenticated(user_id) else {
            tracing::info!("Rejected question on document {}: not signed in", document_id);
            let c = classify(&Error::Unauthenticated);
            return AnswerResult::failed(c.category, c.user_message);
        };

        tracing::info!(
            "Question from user {} on document {} (backend: {})",
            user_id,
            document_id,
            backend.label()
        );

        match self.answer(user_id, document_id, question, &backend).await {
            Ok(result) => result,
            Err(err) => {
                let c = classify(&err);
                log_failure("Question", document_id, &c, &err);
                AnswerResult::failed(c.category, c.user_message)
            }
        }
    }

    async fn answer(
        &self,
        user_id: &str,
        document_id: &str,
        question: &str,
        backend: &BackendChoice,
    ) -> Result<AnswerResult> {
        let decision = self
            .quota
            .check_quota(document_id, user_id, backend.has_caller_credential())
            .await?;
        if let QuotaDecision::Deny(message) = decision {
            return Ok(AnswerResult::failed(ErrorCategory::QuotaDenied, message));
        }

        // History excludes the question being asked
        let history = answered_history(
            self.turns
                .recent_turns(user_id, document_id, self.history_turns)
                .await?,
        );

        self.turn_log.record_question(document_id, user_id, question).await?;

        let resolved = self.resolver.resolve(backend)?;
        let answer = self
            .orchestrator
            .answer(document_id, question, &history, &resolved)
            .await?;

        self.turn_log.record_answer(document_id, user_id, &answer).await?;

        Ok(AnswerResult::Answered { answer })
    }

    /// Embed a document's pre-split passages into its namespace
    ///
    /// Documents that already have vectors are left untouched.
    pub async fn generate_embeddings(
        &self,
        user_id: Option<&str>,
        document_id: &str,
        chunks: &[String],
        backend: BackendChoice,
    ) -> EmbeddingsResponse {
        let Some(user_id) = authenticated(user_id) else {
            tracing::info!("Rejected embedding request for document {}: not signed in", document_id);
            return EmbeddingsResponse::failed(classify(&Error::Unauthenticated).user_message);
        };

        tracing::info!(
            "Embedding request from user {} for document {} ({} chunks, backend: {})",
            user_id,
            document_id,
            chunks.len(),
            backend.label()
        );

        match self.embed(document_id, chunks, &backend).await {
            Ok(()) => EmbeddingsResponse::compiled(),
            Err(err) => {
                let c = classify(&err);
                log_failure("Embedding", document_id, &c, &err);
                EmbeddingsResponse::failed(c.user_message)
            }
        }
    }

    async fn embed(&self, document_id: &str, chunks: &[String], backend: &BackendChoice) -> Result<()> {
        let resolved = self.resolver.resolve(backend)?;

        if self.orchestrator.is_indexed(document_id).await? {
            tracing::info!("Document {} is already indexed, skipping", document_id);
            return Ok(());
        }

        self.orchestrator.index(document_id, chunks, &resolved).await?;
        Ok(())
    }

    /// The caller's conversation about a document, oldest first
    pub async fn conversation(&self, user_id: &str, document_id: &str) -> Result<Vec<Turn>> {
        self.turns.list_turns(user_id, document_id).await
    }
}

fn authenticated(user_id: Option<&str>) -> Option<&str> {
    user_id.map(str::trim).filter(|u| !u.is_empty())
}

/// Keep only questions that were answered, as alternating human/ai pairs
///
/// A failed attempt leaves a human turn with no reply, and the window may
/// open on an ai turn. Neither belongs in the prompt.
fn answered_history(turns: Vec<Turn>) -> Vec<Turn> {
    let mut history = Vec::with_capacity(turns.len());
    let mut pending: Option<Turn> = None;

    for turn in turns {
        match turn.role {
            Role::Human => pending = Some(turn),
            Role::Ai => {
                if let Some(question) = pending.take() {
                    history.push(question);
                    history.push(turn);
                }
            }
        }
    }

    history
}

fn log_failure(operation: &str, document_id: &str, c: &Classification, err: &Error) {
    match c.dimensions {
        Some((actual, expected)) => tracing::error!(
            "{} failed on document {} [{}]: vector dimension {} vs index dimension {}",
            operation,
            document_id,
            c.category,
            actual,
            expected
        ),
        None => tracing::error!(
            "{} failed on document {} [{}]: {}",
            operation,
            document_id,
            c.category,
            err
        ),
    }
}
