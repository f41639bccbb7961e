//! Conversation turns stored in the per-document chat log

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Who authored a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The user's question
    Human,
    /// The generated answer
    Ai,
}

impl Role {
    /// Storage representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Human => "human",
            Role::Ai => "ai",
        }
    }

    /// Parse the storage representation
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "human" => Some(Role::Human),
            "ai" => Some(Role::Ai),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message in a document's conversation
///
/// Turns are append-only: created once by the turn log writer, never edited.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Turn {
    /// A question turn stamped now
    pub fn human(message: impl Into<String>) -> Self {
        Self {
            role: Role::Human,
            message: message.into(),
            created_at: Utc::now(),
        }
    }

    /// An answer turn stamped now
    pub fn ai(message: impl Into<String>) -> Self {
        Self {
            role: Role::Ai,
            message: message.into(),
            created_at: Utc::now(),
        }
    }
}

/// Per-role turn counts for one document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TurnCounts {
    pub human: usize,
    pub ai: usize,
}

impl TurnCounts {
    /// Count turns by role
    pub fn from_turns(turns: &[Turn]) -> Self {
        turns.iter().fold(Self::default(), |mut counts, turn| {
            match turn.role {
                Role::Human => counts.human += 1,
                Role::Ai => counts.ai += 1,
            }
            counts
        })
    }

    /// Every question has its answer
    pub fn is_balanced(&self) -> bool {
        self.human == self.ai
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip() {
        assert_eq!(Role::parse(Role::Human.as_str()), Some(Role::Human));
        assert_eq!(Role::parse(Role::Ai.as_str()), Some(Role::Ai));
        assert_eq!(Role::parse("system"), None);
    }

    #[test]
    fn test_counts_from_turns() {
        let turns = vec![
            Turn::human("q1"),
            Turn::ai("a1"),
            Turn::human("q2"),
        ];
        let counts = TurnCounts::from_turns(&turns);
        assert_eq!(counts, TurnCounts { human: 2, ai: 1 });
        assert!(!counts.is_balanced());
    }
}
