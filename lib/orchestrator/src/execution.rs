//! Plugin execution records.
//!
//! A [`PluginExecution`] is created when a call is submitted, mutated in place
//! across attempts, and frozen once it reaches a terminal status.

use agentry_core::ErrorCode;
use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::time::Duration;

/// Identifier of an execution, formatted `exec_<unix-millis>_<random>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionId(String);

impl ExecutionId {
    /// Generates a fresh identifier.
    #[must_use]
    pub fn generate() -> Self {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(9)
            .map(char::from)
            .map(|c| c.to_ascii_lowercase())
            .collect();
        Self(format!("exec_{}_{suffix}", Utc::now().timestamp_millis()))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ExecutionId {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

/// Lifecycle status of an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Submitted, no attempt started yet.
    Pending,
    /// Attempts in progress.
    Running,
    /// An attempt succeeded.
    Completed,
    /// The last attempt failed, or a failure was terminal.
    Failed,
    /// A timeout was the terminal cause.
    Timeout,
}

impl ExecutionStatus {
    /// Returns true if this is a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Timeout)
    }
}

/// Audit record of one orchestrated attempt sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginExecution {
    /// Unique identifier.
    pub id: ExecutionId,
    /// The plugin or tool that was called.
    pub plugin_name: String,
    /// Free-form input (prompt, intent verb).
    pub input: String,
    /// Optional structured context passed with the input.
    pub context: Option<JsonValue>,
    /// Output of the successful attempt.
    pub output: Option<JsonValue>,
    /// Normalized message of the terminal failure.
    pub error: Option<String>,
    /// Classification of the terminal failure.
    pub error_code: Option<ErrorCode>,
    /// Attempts actually made.
    pub attempts: u32,
    /// Current status.
    pub status: ExecutionStatus,
    /// When the execution was submitted.
    pub start_time: DateTime<Utc>,
    /// When the execution reached a terminal status.
    pub end_time: Option<DateTime<Utc>>,
    /// Wall-clock duration, set at the terminal status.
    pub duration_ms: Option<u64>,
}

impl PluginExecution {
    /// Creates a pending execution.
    #[must_use]
    pub fn new(
        plugin_name: impl Into<String>,
        input: impl Into<String>,
        context: Option<JsonValue>,
    ) -> Self {
        Self {
            id: ExecutionId::generate(),
            plugin_name: plugin_name.into(),
            input: input.into(),
            context,
            output: None,
            error: None,
            error_code: None,
            attempts: 0,
            status: ExecutionStatus::Pending,
            start_time: Utc::now(),
            end_time: None,
            duration_ms: None,
        }
    }

    /// Returns whether the execution has finished.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Records the start of another attempt.
    pub fn begin_attempt(&mut self) {
        if self.is_terminal() {
            return;
        }
        self.status = ExecutionStatus::Running;
        self.attempts += 1;
    }

    /// Records an attempt failure that will be retried.
    pub fn record_failure(&mut self, code: ErrorCode, message: impl Into<String>) {
        if self.is_terminal() {
            return;
        }
        self.error_code = Some(code);
        self.error = Some(message.into());
    }

    /// Marks the execution as completed.
    pub fn complete(&mut self, output: JsonValue, elapsed: Duration) {
        if self.is_terminal() {
            return;
        }
        self.output = Some(output);
        self.error = None;
        self.error_code = None;
        self.finish(ExecutionStatus::Completed, elapsed);
    }

    /// Marks the execution as failed.
    pub fn fail(&mut self, code: ErrorCode, message: impl Into<String>, elapsed: Duration) {
        if self.is_terminal() {
            return;
        }
        self.error_code = Some(code);
        self.error = Some(message.into());
        self.finish(ExecutionStatus::Failed, elapsed);
    }

    /// Marks the execution as timed out.
    pub fn time_out(&mut self, message: impl Into<String>, elapsed: Duration) {
        if self.is_terminal() {
            return;
        }
        self.error_code = Some(ErrorCode::Timeout);
        self.error = Some(message.into());
        self.finish(ExecutionStatus::Timeout, elapsed);
    }

    fn finish(&mut self, status: ExecutionStatus, elapsed: Duration) {
        self.status = status;
        self.end_time = Some(Utc::now());
        self.duration_ms = Some(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX));
    }
}
