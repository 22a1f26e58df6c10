//! Error types for the orchestrator crate.
//!
//! - `AttemptFailure`: what a single attempt reports when it fails
//! - `AttemptError`: an attempt outcome, including timeouts raised here
//! - `OrchestratorError`: requests rejected before any attempt is made

use agentry_adapter::{AdapterError, TaskError};
use agentry_core::ErrorCode;
use serde_json::Value as JsonValue;
use std::any::Any;
use std::fmt;
use std::time::Duration;

/// A failure reported by one attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptFailure {
    /// Classification used for the retry decision.
    pub code: ErrorCode,
    /// Normalized message.
    pub message: String,
    /// Structured details carried through to the caller.
    pub details: Option<JsonValue>,
}

impl AttemptFailure {
    /// Creates a failure without details.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    /// Normalizes a panic payload caught from an attempt.
    #[must_use]
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "plugin panicked".to_string());
        Self::new(ErrorCode::UnknownError, parse_error(&message))
    }

    /// Returns the failure as an adapter-level task error.
    #[must_use]
    pub fn into_task_error(self) -> TaskError {
        TaskError {
            code: self.code,
            message: self.message,
            details: self.details,
        }
    }
}

impl From<TaskError> for AttemptFailure {
    fn from(error: TaskError) -> Self {
        Self {
            message: parse_error(&error.message),
            code: error.code,
            details: error.details,
        }
    }
}

impl From<AdapterError> for AttemptFailure {
    fn from(error: AdapterError) -> Self {
        Self::new(error.code(), parse_error(&error))
    }
}

/// The outcome of an attempt that did not succeed.
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptError {
    /// The attempt finished and reported a failure.
    Failed(AttemptFailure),
    /// The attempt did not finish within its budget.
    TimedOut { after: Duration },
}

impl AttemptError {
    /// Returns the classification of this outcome.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Failed(failure) => failure.code.clone(),
            Self::TimedOut { .. } => ErrorCode::Timeout,
        }
    }

    /// Returns whether another attempt may be made.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.code().is_retryable()
    }

    /// Returns whether this outcome is a timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut { .. })
    }

    /// Converts the outcome into a failure record.
    #[must_use]
    pub fn into_failure(self) -> AttemptFailure {
        match self {
            Self::Failed(failure) => failure,
            Self::TimedOut { .. } => AttemptFailure::new(ErrorCode::Timeout, self.to_string()),
        }
    }
}

impl fmt::Display for AttemptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(failure) => write!(f, "{}", failure.message),
            Self::TimedOut { after } => {
                write!(f, "timed out after {}ms", after.as_millis())
            }
        }
    }
}

impl std::error::Error for AttemptError {}

/// Requests the orchestrator rejects before making any attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorError {
    /// No adapter is registered for the tool.
    UnknownTool { tool: String },
}

impl OrchestratorError {
    /// Returns the failure code for this rejection.
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::UnknownTool { .. } => ErrorCode::UnknownTool,
        }
    }
}

impl fmt::Display for OrchestratorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownTool { tool } => {
                write!(f, "no adapter registered for tool '{tool}'")
            }
        }
    }
}

impl std::error::Error for OrchestratorError {}

/// Normalizes any error into a non-empty, single-line message.
#[must_use]
pub fn parse_error<E: fmt::Display + ?Sized>(error: &E) -> String {
    let message = error.to_string();
    let message = message.split_whitespace().collect::<Vec<_>>().join(" ");
    if message.is_empty() {
        "Unknown error".to_string()
    } else {
        message
    }
}
