//! Outcome types returned by the question and embedding entry points

use serde::{Deserialize, Serialize};

/// User-facing failure category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCategory {
    /// No authenticated user; rejected before any side effect
    Unauthenticated,
    /// Plan limit reached for this document
    QuotaDenied,
    /// Model handles could not be constructed
    BackendInit,
    /// Embedding vector size disagrees with the index
    DimensionMismatch,
    /// Provider or transport failure during retrieval/generation
    GenerationFailed,
    /// Anything else, including storage failures
    Unexpected,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::QuotaDenied => "quota-denied",
            Self::BackendInit => "backend-init",
            Self::DimensionMismatch => "dimension-mismatch",
            Self::GenerationFailed => "generation-failed",
            Self::Unexpected => "unexpected",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one question
///
/// Exactly one shape is produced; callers never see lower-level errors.
#[derive(Debug, Clone, PartialEq)]
pub enum AnswerResult {
    Answered {
        answer: String,
    },
    Failed {
        category: ErrorCategory,
        user_message: String,
    },
}

impl AnswerResult {
    pub fn failed(category: ErrorCategory, user_message: impl Into<String>) -> Self {
        Self::Failed {
            category,
            user_message: user_message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Answered { .. })
    }

    /// Failure category, if any
    pub fn category(&self) -> Option<ErrorCategory> {
        match self {
            Self::Answered { .. } => None,
            Self::Failed { category, .. } => Some(*category),
        }
    }
}

/// Wire shape of the ask-question entry point
///
/// The answer itself is read back from the turn log, so `message` is `null`
/// on success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskResponse {
    pub success: bool,
    pub message: Option<String>,
}

impl From<&AnswerResult> for AskResponse {
    fn from(result: &AnswerResult) -> Self {
        match result {
            AnswerResult::Answered { .. } => Self {
                success: true,
                message: None,
            },
            AnswerResult::Failed { user_message, .. } => Self {
                success: false,
                message: Some(user_message.clone()),
            },
        }
    }
}

/// Wire shape of the generate-embeddings entry point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingsResponse {
    pub compiled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EmbeddingsResponse {
    pub fn compiled() -> Self {
        Self {
            compiled: true,
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            compiled: false,
            error: Some(message.into()),
        }
    }
}
