//! Core domain types and utilities for the agentry task-execution engine.
//!
//! This crate provides the identifiers, the failure-code registry and the
//! error handling foundation shared by the adapter, orchestrator, context,
//! error-ledger and scheduler crates.

pub mod code;
pub mod error;
pub mod id;

pub use code::ErrorCode;
pub use error::Result;
pub use id::{
    AgentId, ContextMappingId, ErrorLogId, ParseIdError, UserId, WorkflowExecutionId, WorkflowId,
};
