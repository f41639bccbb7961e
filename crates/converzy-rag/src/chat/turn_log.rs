//! Turn log writer
//!
//! The only writer of conversation turns. The pipeline records the question
//! before generation starts and the answer only after generation succeeds.

use std::sync::Arc;

use crate::error::Result;
use crate::storage::ChatStore;
use crate::types::Turn;

pub struct TurnLogWriter {
    store: Arc<dyn ChatStore>,
}

impl TurnLogWriter {
    pub fn new(store: Arc<dyn ChatStore>) -> Self {
        Self { store }
    }

    /// Append a turn; storage failures are returned, never swallowed
    pub async fn append_turn(&self, document_id: &str, user_id: &str, turn: &Turn) -> Result<()> {
        self.store.append_turn(user_id, document_id, turn).await?;
        tracing::debug!(
            "Appended {} turn to document {} ({} chars)",
            turn.role,
            document_id,
            turn.message.len()
        );
        Ok(())
    }

    /// Record the user's question, stamped now
    pub async fn record_question(&self, document_id: &str, user_id: &str, question: &str) -> Result<()> {
        self.append_turn(document_id, user_id, &Turn::human(question)).await
    }

    /// Record a generated answer, stamped now
    pub async fn record_answer(&self, document_id: &str, user_id: &str, answer: &str) -> Result<()> {
        self.append_turn(document_id, user_id, &Turn::ai(answer)).await
    }
}
