//! Question answering over a single document
//!
//! - `quota`: per-plan question limits
//! - `turn_log`: append-only conversation writes
//! - `orchestrator`: retrieval plus generation
//! - `classifier`: error to user-facing outcome
//! - `pipeline`: the public entry points tying them together

pub mod classifier;
pub mod orchestrator;
pub mod pipeline;
pub mod quota;
pub mod turn_log;

#[cfg(test)]
pub(crate) mod testing;

pub use classifier::{classify, Classification};
pub use orchestrator::RagOrchestrator;
pub use pipeline::QuestionPipeline;
pub use quota::{Plan, QuotaDecision, QuotaGuard};
pub use turn_log::TurnLogWriter;
