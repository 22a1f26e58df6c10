//! Retry, timeout and backoff configuration.

use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::time::Duration;

/// How the execution timeout is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutScope {
    /// Every attempt gets the full timeout; a timed-out attempt is retried.
    PerAttempt,
    /// The timeout is one wall-clock budget shared by the running time of all
    /// attempts. Backoff sleeps are not charged against it, so a call that
    /// never resolves ends after the timeout rather than once per attempt.
    #[default]
    Execution,
}

/// Capped exponential backoff between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackoffPolicy {
    /// Delay after the first failed attempt, in milliseconds.
    #[serde(default = "default_backoff_base_ms")]
    pub base_ms: u64,
    /// Upper bound for any single delay, in milliseconds.
    #[serde(default = "default_backoff_max_ms")]
    pub max_ms: u64,
}

fn default_backoff_base_ms() -> u64 {
    1_000
}

fn default_backoff_max_ms() -> u64 {
    10_000
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base_ms: default_backoff_base_ms(),
            max_ms: default_backoff_max_ms(),
        }
    }
}

impl BackoffPolicy {
    /// Delay to wait after failed attempt number `attempt` (1-indexed):
    /// `min(base * 2^(attempt-1), max)`.
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(63);
        let factor = 1u64.checked_shl(exponent).unwrap_or(u64::MAX);
        Duration::from_millis(self.base_ms.saturating_mul(factor).min(self.max_ms))
    }
}

/// Per-call execution limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionConfig {
    /// Maximum number of attempts, including the first.
    pub max_retries: NonZeroU32,
    /// Timeout, applied according to `timeout_scope`.
    pub timeout: Duration,
    /// How `timeout` is applied.
    pub timeout_scope: TimeoutScope,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            timeout: Duration::from_millis(default_timeout_ms()),
            timeout_scope: TimeoutScope::default(),
        }
    }
}

impl ExecutionConfig {
    /// Sets the maximum number of attempts.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: NonZeroU32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets how the timeout is applied.
    #[must_use]
    pub fn with_timeout_scope(mut self, scope: TimeoutScope) -> Self {
        self.timeout_scope = scope;
        self
    }

    /// Attempts that may be made.
    #[must_use]
    pub fn attempt_limit(&self) -> u32 {
        self.max_retries.get()
    }
}

/// Orchestrator-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Default maximum number of attempts. Zero is rejected.
    #[serde(default = "default_max_retries")]
    pub max_retries: NonZeroU32,
    /// Default timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Default timeout scope.
    #[serde(default)]
    pub timeout_scope: TimeoutScope,
    /// Backoff between attempts.
    #[serde(default)]
    pub backoff: BackoffPolicy,
    /// Number of executions the ledger retains before evicting the oldest.
    #[serde(default = "default_ledger_capacity")]
    pub ledger_capacity: usize,
}

const DEFAULT_MAX_RETRIES: NonZeroU32 = match NonZeroU32::new(3) {
    Some(n) => n,
    None => unreachable!(),
};

fn default_max_retries() -> NonZeroU32 {
    DEFAULT_MAX_RETRIES
}

fn default_timeout_ms() -> u64 {
    30_000
}

fn default_ledger_capacity() -> usize {
    1_000
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            timeout_ms: default_timeout_ms(),
            timeout_scope: TimeoutScope::default(),
            backoff: BackoffPolicy::default(),
            ledger_capacity: default_ledger_capacity(),
        }
    }
}

impl OrchestratorConfig {
    /// The per-call limits used when a caller does not supply its own.
    #[must_use]
    pub fn execution_defaults(&self) -> ExecutionConfig {
        ExecutionConfig {
            max_retries: self.max_retries,
            timeout: Duration::from_millis(self.timeout_ms),
            timeout_scope: self.timeout_scope,
        }
    }
}
