//! Quota guard
//!
//! Per-document question limits by plan. The check reads counts and then the
//! caller writes the human turn; the two steps are not atomic, so concurrent
//! questions on one document can overshoot the limit slightly.

use std::sync::Arc;

use crate::config::QuotaConfig;
use crate::error::Result;
use crate::storage::{ChatStore, ProfileStore};

/// Outcome of a quota check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuotaDecision {
    Admit,
    /// Denied with a plan-specific, user-facing message
    Deny(String),
}

impl QuotaDecision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, QuotaDecision::Admit)
    }
}

/// Plan tier derived from the user profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plan {
    Free,
    Pro,
}

pub struct QuotaGuard {
    turns: Arc<dyn ChatStore>,
    profiles: Arc<dyn ProfileStore>,
    config: QuotaConfig,
}

impl QuotaGuard {
    pub fn new(turns: Arc<dyn ChatStore>, profiles: Arc<dyn ProfileStore>, config: QuotaConfig) -> Self {
        Self {
            turns,
            profiles,
            config,
        }
    }

    /// Questions allowed per document on `plan`
    pub fn limit(&self, plan: Plan) -> usize {
        match plan {
            Plan::Free => self.config.free_limit,
            Plan::Pro => self.config.pro_limit,
        }
    }

    fn denial_message(&self, plan: Plan) -> String {
        match plan {
            Plan::Free => format!(
                "You'll need to upgrade to PRO to ask more than {} questions!",
                self.config.free_limit
            ),
            Plan::Pro => format!(
                "You've reached the PRO limit of {} questions per document!",
                self.config.pro_limit
            ),
        }
    }

    /// Decide whether `user_id` may ask another question about `document_id`
    ///
    /// A caller-owned credential skips every check and touches no storage.
    pub async fn check_quota(
        &self,
        document_id: &str,
        user_id: &str,
        has_caller_credential: bool,
    ) -> Result<QuotaDecision> {
        if has_caller_credential {
            return Ok(QuotaDecision::Admit);
        }

        let counts = self.turns.count_turns(user_id, document_id).await?;

        if !counts.is_balanced() {
            tracing::warn!(
                "Unanswered question pending on document {} (human: {}, ai: {}), admitting",
                document_id,
                counts.human,
                counts.ai
            );
            return Ok(QuotaDecision::Admit);
        }

        let plan = if self.profiles.has_active_membership(user_id).await? {
            Plan::Pro
        } else {
            Plan::Free
        };

        let limit = self.limit(plan);
        if counts.human >= limit {
            tracing::info!(
                "Quota reached for user {} on document {} ({:?} plan, {} of {})",
                user_id,
                document_id,
                plan,
                counts.human,
                limit
            );
            return Ok(QuotaDecision::Deny(self.denial_message(plan)));
        }

        Ok(QuotaDecision::Admit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteChatStore;
    use crate::types::Turn;

    async fn seed(store: &SqliteChatStore, pairs: usize) {
        for i in 0..pairs {
            store.append_turn("u1", "doc-1", &Turn::human(format!("q{}", i))).await.unwrap();
            store.append_turn("u1", "doc-1", &Turn::ai(format!("a{}", i))).await.unwrap();
        }
    }

    fn guard(store: &SqliteChatStore) -> QuotaGuard {
        let store = Arc::new(store.clone());
        QuotaGuard::new(store.clone(), store, QuotaConfig::default())
    }

    #[tokio::test]
    async fn test_free_plan_admitted_below_limit() {
        let store = SqliteChatStore::in_memory().unwrap();
        seed(&store, QuotaConfig::default().free_limit - 1).await;

        let decision = guard(&store).check_quota("doc-1", "u1", false).await.unwrap();
        assert_eq!(decision, QuotaDecision::Admit);
    }

    #[tokio::test]
    async fn test_free_plan_denied_at_limit() {
        let store = SqliteChatStore::in_memory().unwrap();
        seed(&store, QuotaConfig::default().free_limit).await;

        let decision = guard(&store).check_quota("doc-1", "u1", false).await.unwrap();
        assert_eq!(
            decision,
            QuotaDecision::Deny("You'll need to upgrade to PRO to ask more than 2 questions!".to_string())
        );
    }

    #[tokio::test]
    async fn test_pro_plan_uses_higher_limit() {
        let store = SqliteChatStore::in_memory().unwrap();
        store.set_membership("u1", true).await.unwrap();
        let config = QuotaConfig::default();

        seed(&store, config.free_limit).await;
        assert!(guard(&store).check_quota("doc-1", "u1", false).await.unwrap().is_admitted());

        seed(&store, config.pro_limit - config.free_limit).await;
        let decision = guard(&store).check_quota("doc-1", "u1", false).await.unwrap();
        assert_eq!(
            decision,
            QuotaDecision::Deny("You've reached the PRO limit of 20 questions per document!".to_string())
        );
    }

    #[tokio::test]
    async fn test_caller_credential_bypasses_quota() {
        let store = SqliteChatStore::in_memory().unwrap();
        seed(&store, 50).await;

        let decision = guard(&store).check_quota("doc-1", "u1", true).await.unwrap();
        assert_eq!(decision, QuotaDecision::Admit);
    }

    #[tokio::test]
    async fn test_unbalanced_counts_are_admitted() {
        let store = SqliteChatStore::in_memory().unwrap();
        seed(&store, 5).await;
        store.append_turn("u1", "doc-1", &Turn::human("unanswered")).await.unwrap();

        let decision = guard(&store).check_quota("doc-1", "u1", false).await.unwrap();
        assert_eq!(decision, QuotaDecision::Admit);
    }

    #[tokio::test]
    async fn test_limits_are_per_document() {
        let store = SqliteChatStore::in_memory().unwrap();
        seed(&store, 2).await;

        let decision = guard(&store).check_quota("doc-2", "u1", false).await.unwrap();
        assert_eq!(decision, QuotaDecision::Admit);
    }
}
