//! Storage module for the per-document turn log and user profiles
//!
//! Provides SQLite-based persistence behind async store traits.
//!
//! The service only reads the `users` table. Plan changes are written by the
//! billing integration through [`ProfileStore::set_membership`]; no request
//! path here calls it.

mod sqlite;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{Turn, TurnCounts};

pub use sqlite::SqliteChatStore;

/// Append-only conversation log, keyed by (user, document)
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Append a turn to the end of the document's conversation
    async fn append_turn(&self, user_id: &str, document_id: &str, turn: &Turn) -> Result<()>;

    /// All turns for the document, oldest first
    async fn list_turns(&self, user_id: &str, document_id: &str) -> Result<Vec<Turn>>;

    /// The most recent `limit` turns, oldest first
    async fn recent_turns(&self, user_id: &str, document_id: &str, limit: usize) -> Result<Vec<Turn>> {
        let mut turns = self.list_turns(user_id, document_id).await?;
        let skip = turns.len().saturating_sub(limit);
        Ok(turns.split_off(skip))
    }

    /// Per-role turn counts for the document
    async fn count_turns(&self, user_id: &str, document_id: &str) -> Result<TurnCounts> {
        let turns = self.list_turns(user_id, document_id).await?;
        Ok(TurnCounts::from_turns(&turns))
    }
}

/// User profile lookups
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Whether the user is on the paid plan. Unknown users are on the free plan.
    async fn has_active_membership(&self, user_id: &str) -> Result<bool>;

    /// Record the user's plan
    ///
    /// Called by the billing integration when a subscription starts or lapses.
    async fn set_membership(&self, user_id: &str, active: bool) -> Result<()>;
}
