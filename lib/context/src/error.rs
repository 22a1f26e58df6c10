//! Error types for the context crate.

use crate::mapping::MappingKey;
use agentry_core::{AgentId, UserId};
use std::fmt;

/// Errors from context mapping operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    /// A mapping with the same user, agent, tool and context key exists.
    Conflict { key: MappingKey },
    /// The agent's mappings belong to a different user.
    OwnerMismatch {
        agent_id: AgentId,
        owner: UserId,
        user_id: UserId,
    },
    /// A required field was empty.
    InvalidMapping { reason: String },
    /// The underlying store failed.
    Storage { reason: String },
}

impl fmt::Display for ContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Conflict { key } => write!(f, "context mapping already exists: {key}"),
            Self::OwnerMismatch {
                agent_id,
                owner,
                user_id,
            } => write!(
                f,
                "agent {agent_id} belongs to user {owner}, not {user_id}"
            ),
            Self::InvalidMapping { reason } => write!(f, "invalid context mapping: {reason}"),
            Self::Storage { reason } => write!(f, "context mapping storage failed: {reason}"),
        }
    }
}

impl std::error::Error for ContextError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_display_names_the_key() {
        let err = ContextError::Conflict {
            key: MappingKey::new(UserId::new(), AgentId::new(), "Notion", "weekly_notes"),
        };
        let message = err.to_string();
        assert!(message.contains("already exists"));
        assert!(message.contains("notion/weekly_notes"));
    }
}
