//! Error types for the scheduler crate.
//!
//! - `ScheduleError`: a schedule request that cannot be attached
//! - `SchedulerError`: lifecycle and storage failures surfaced to callers
//! - `RunError`: a triggered workflow that did not run to completion

use crate::workflow::WorkflowStatus;
use agentry_core::{ErrorCode, WorkflowId};
use std::fmt;

/// Errors from schedule validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// Invalid cron expression.
    InvalidCronExpression { expression: String, reason: String },
    /// Invalid timezone.
    InvalidTimezone { timezone: String },
    /// The start/end window is empty.
    InvalidWindow { reason: String },
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCronExpression { expression, reason } => {
                write!(f, "invalid cron expression '{expression}': {reason}")
            }
            Self::InvalidTimezone { timezone } => {
                write!(f, "invalid timezone: '{timezone}'")
            }
            Self::InvalidWindow { reason } => {
                write!(f, "invalid schedule window: {reason}")
            }
        }
    }
}

impl std::error::Error for ScheduleError {}

/// Errors from scheduler operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// Workflow not found.
    NotFound { id: WorkflowId },
    /// The workflow must be ACTIVE for this operation.
    NotActive { id: WorkflowId, status: WorkflowStatus },
    /// The lifecycle does not allow this transition.
    InvalidTransition {
        id: WorkflowId,
        from: WorkflowStatus,
        action: &'static str,
    },
    /// The schedule request was rejected.
    InvalidSchedule(ScheduleError),
    /// Storage operation failed.
    Storage { reason: String },
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { id } => write!(f, "workflow not found: {id}"),
            Self::NotActive { id, status } => {
                write!(f, "workflow not active: {id} is {status}")
            }
            Self::InvalidTransition { id, from, action } => {
                write!(f, "cannot {action} workflow {id} in status {from}")
            }
            Self::InvalidSchedule(err) => write!(f, "{err}"),
            Self::Storage { reason } => write!(f, "workflow storage failed: {reason}"),
        }
    }
}

impl std::error::Error for SchedulerError {}

impl From<ScheduleError> for SchedulerError {
    fn from(err: ScheduleError) -> Self {
        Self::InvalidSchedule(err)
    }
}

/// Errors from running a triggered workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    /// A step could not be dispatched at all.
    Dispatch { step: usize, reason: String },
    /// A step was dispatched and failed.
    StepFailed {
        step: usize,
        tool: String,
        code: ErrorCode,
        message: String,
    },
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dispatch { step, reason } => {
                write!(f, "step {step} could not be dispatched: {reason}")
            }
            Self::StepFailed {
                step,
                tool,
                code,
                message,
            } => write!(f, "step {step} ({tool}) failed with {code}: {message}"),
        }
    }
}

impl std::error::Error for RunError {}
