//! Error log records.

use agentry_core::{AgentId, ErrorCode, ErrorLogId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A logged failure of one tool action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorLog {
    pub id: ErrorLogId,
    pub agent_id: AgentId,
    pub user_id: UserId,
    pub tool: String,
    /// The intent that failed, e.g. `send`.
    pub action: String,
    pub error_code: ErrorCode,
    pub error_message: String,
    /// Request payload kept for support diagnostics.
    pub payload: Option<JsonValue>,
    pub timestamp: DateTime<Utc>,
    /// Starts false; once true it stays true.
    pub resolved: bool,
}

/// A failure to be logged.
///
/// `error_code` is free text; the handler normalizes it against the known
/// codes when logging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewErrorLog {
    pub agent_id: AgentId,
    pub user_id: UserId,
    pub tool: String,
    pub action: String,
    pub error_code: String,
    pub error_message: String,
    #[serde(default)]
    pub payload: Option<JsonValue>,
    pub timestamp: DateTime<Utc>,
}

impl NewErrorLog {
    /// Creates a record timestamped now.
    #[must_use]
    pub fn new(
        agent_id: AgentId,
        user_id: UserId,
        tool: impl Into<String>,
        action: impl Into<String>,
        error_code: impl Into<String>,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            agent_id,
            user_id,
            tool: tool.into(),
            action: action.into(),
            error_code: error_code.into(),
            error_message: error_message.into(),
            payload: None,
            timestamp: Utc::now(),
        }
    }

    /// Attaches the request payload.
    #[must_use]
    pub fn with_payload(mut self, payload: JsonValue) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Converts into a stored, unresolved record with a fresh ID.
    #[must_use]
    pub fn into_log(self) -> ErrorLog {
        ErrorLog {
            id: ErrorLogId::new(),
            agent_id: self.agent_id,
            user_id: self.user_id,
            tool: self.tool,
            action: self.action,
            error_code: ErrorCode::parse(&self.error_code),
            error_message: self.error_message,
            payload: self.payload,
            timestamp: self.timestamp,
            resolved: false,
        }
    }
}
