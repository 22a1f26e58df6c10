//! Task intents: one action on one tool on behalf of one agent.

use agentry_core::{AgentId, UserId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

/// A request to perform one action on one tool.
///
/// Intents are built per call and never persisted by the engine itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskIntent {
    /// The agent acting.
    pub agent_id: AgentId,
    /// The user who owns the agent.
    pub user_id: UserId,
    /// Tool identifier, e.g. `gmail`.
    pub tool: String,
    /// Action verb, e.g. `send`.
    pub intent: String,
    /// Tool- and intent-specific payload.
    #[serde(default)]
    pub context: Map<String, JsonValue>,
}

impl TaskIntent {
    /// Creates an intent with an empty context.
    #[must_use]
    pub fn new(
        agent_id: AgentId,
        user_id: UserId,
        tool: impl Into<String>,
        intent: impl Into<String>,
    ) -> Self {
        Self {
            agent_id,
            user_id,
            tool: tool.into(),
            intent: intent.into(),
            context: Map::new(),
        }
    }

    /// Adds a context entry.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.context.insert(key.into(), value);
        self
    }

    /// Returns a context entry as a string, if it is one.
    #[must_use]
    pub fn context_str(&self, key: &str) -> Option<&str> {
        self.context.get(key).and_then(JsonValue::as_str)
    }

    /// Returns the listed fields that are absent, null, or blank strings.
    #[must_use]
    pub fn missing_fields<S: AsRef<str>>(&self, required: &[S]) -> Vec<String> {
        required
            .iter()
            .map(|field| field.as_ref())
            .filter(|field: &&str| match self.context.get(*field) {
                None | Some(JsonValue::Null) => true,
                Some(JsonValue::String(s)) => s.trim().is_empty(),
                Some(_) => false,
            })
            .map(str::to_string)
            .collect()
    }
}
