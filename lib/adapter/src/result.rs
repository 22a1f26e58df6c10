//! Task results returned by adapters.

use agentry_core::ErrorCode;
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};
use std::fmt;

/// A classified failure reported by an adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskError {
    /// Failure code.
    pub code: ErrorCode,
    /// Internal, human-readable description.
    pub message: String,
    /// Structured details, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<JsonValue>,
}

impl TaskError {
    /// Creates an error with no details.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Attaches structured details.
    #[must_use]
    pub fn with_details(mut self, details: JsonValue) -> Self {
        self.details = Some(details);
        self
    }

    /// A validation failure naming the missing context fields.
    #[must_use]
    pub fn missing_fields(missing: &[String]) -> Self {
        Self::new(
            ErrorCode::ValidationError,
            format!("Missing required fields: {}", missing.join(", ")),
        )
        .with_details(json!({ "missing": missing }))
    }

    /// The intent is not one the tool implements.
    #[must_use]
    pub fn unsupported_intent(tool: &str, intent: &str) -> Self {
        Self::new(
            ErrorCode::UnsupportedIntent,
            format!("Unsupported intent '{intent}' for tool '{tool}'"),
        )
    }

    /// Returns whether another attempt could succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for TaskError {}

/// The outcome of one adapter invocation.
///
/// Built only through [`TaskResult::success`] and [`TaskResult::failure`], so
/// `data` is populated exactly when `success` is true and `error` exactly when
/// it is false.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    /// Whether the action succeeded.
    pub success: bool,
    /// Human-readable summary.
    pub message: String,
    /// Payload on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,
    /// Failure on error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<TaskError>,
}

impl TaskResult {
    /// Creates a successful result.
    #[must_use]
    pub fn success(message: impl Into<String>, data: JsonValue) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            error: None,
        }
    }

    /// Creates a failed result; the message mirrors the error's.
    #[must_use]
    pub fn failure(error: TaskError) -> Self {
        Self {
            success: false,
            message: error.message.clone(),
            data: None,
            error: Some(error),
        }
    }

    /// Returns whether a failed result is worth retrying. Successes are not.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.error.as_ref().is_some_and(TaskError::is_retryable)
    }
}

impl From<TaskError> for TaskResult {
    fn from(error: TaskError) -> Self {
        Self::failure(error)
    }
}
