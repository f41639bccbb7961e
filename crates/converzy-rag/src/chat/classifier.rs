//! Failure classification
//!
//! Maps any error raised while answering a question onto a user-facing
//! category and message. Provider text never reaches the user; the only
//! detail that does is the pair of integers from a vector-dimension mismatch.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::Error;
use crate::types::ErrorCategory;

pub const UNAUTHENTICATED_MESSAGE: &str = "You must be signed in to ask questions.";
pub const BACKEND_INIT_MESSAGE: &str = "Failed to initialize AI model. Please try again.";
pub const GENERATION_FAILED_MESSAGE: &str = "Failed to generate response. Please try again.";
pub const UNEXPECTED_MESSAGE: &str = "An unexpected error occurred. Please try again.";

/// Pinecone: "Vector dimension 768 does not match the dimension of the index 1536"
static DIMENSION_MISMATCH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)vector dimension\s+(\d+).*?dimension of the index\s+(\d+)")
        .expect("dimension mismatch pattern is valid")
});

/// Extract `(actual, expected)` from vector-store error text
pub fn parse_dimension_mismatch(text: &str) -> Option<(usize, usize)> {
    let caps = DIMENSION_MISMATCH.captures(text)?;
    let actual = caps.get(1)?.as_str().parse().ok()?;
    let expected = caps.get(2)?.as_str().parse().ok()?;
    Some((actual, expected))
}

/// User-facing view of a failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub category: ErrorCategory,
    pub user_message: String,
    /// `(actual, expected)` for dimension mismatches
    pub dimensions: Option<(usize, usize)>,
}

impl Classification {
    fn new(category: ErrorCategory, user_message: &str) -> Self {
        Self {
            category,
            user_message: user_message.to_string(),
            dimensions: None,
        }
    }

    fn dimension_mismatch(actual: usize, expected: usize) -> Self {
        Self {
            category: ErrorCategory::DimensionMismatch,
            user_message: format!(
                "There's a mismatch in vector dimensions. Current: {}, Expected: {}. \
                 Please contact support to update the index configuration.",
                actual, expected
            ),
            dimensions: Some((actual, expected)),
        }
    }
}

/// Classify an error. Pure: same input, same output, no I/O.
pub fn classify(error: &Error) -> Classification {
    match error {
        Error::Unauthenticated => {
            Classification::new(ErrorCategory::Unauthenticated, UNAUTHENTICATED_MESSAGE)
        }
        Error::BackendInit(_) => {
            Classification::new(ErrorCategory::BackendInit, BACKEND_INIT_MESSAGE)
        }
        Error::DimensionMismatch { actual, expected } => {
            Classification::dimension_mismatch(*actual, *expected)
        }
        Error::VectorDb(msg) | Error::Llm(msg) | Error::Embedding(msg) => {
            classify_provider_text(msg)
        }
        Error::Config(_)
        | Error::InvalidRequest(_)
        | Error::Storage(_)
        | Error::Io(_)
        | Error::Internal(_) => Classification::new(ErrorCategory::Unexpected, UNEXPECTED_MESSAGE),
    }
}

fn classify_provider_text(text: &str) -> Classification {
    match parse_dimension_mismatch(text) {
        Some((actual, expected)) => Classification::dimension_mismatch(actual, expected),
        None => Classification::new(ErrorCategory::GenerationFailed, GENERATION_FAILED_MESSAGE),
    }
}
