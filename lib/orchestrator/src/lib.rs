//! Execution orchestrator for the agentry engine.
//!
//! This crate provides:
//!
//! - **Retry envelope**: bounded attempts, per-attempt or whole-execution
//!   timeouts, capped exponential backoff
//! - **Execution ledger**: bounded in-memory history with aggregate statistics
//! - **Intent dispatch**: adapter resolution and up-front validation for
//!   [`TaskIntent`](agentry_adapter::TaskIntent)s

pub mod config;
pub mod error;
pub mod execution;
pub mod ledger;
pub mod orchestrator;
pub mod plugin;

pub use config::{BackoffPolicy, ExecutionConfig, OrchestratorConfig, TimeoutScope};
pub use error::{AttemptError, AttemptFailure, OrchestratorError, parse_error};
pub use execution::{ExecutionId, ExecutionStatus, PluginExecution};
pub use ledger::{ExecutionLedger, ExecutionStats};
pub use orchestrator::{IntentOutcome, Orchestrator};
pub use plugin::Plugin;
