//! Workflow scheduling for the agentry engine.
//!
//! This crate provides:
//!
//! - **Workflows**: the DRAFT/ACTIVE/ARCHIVED lifecycle and the intent
//!   templates a workflow runs
//! - **Schedules**: cron-based schedule configs and execution audit records
//! - **Scheduler**: lifecycle transitions and trigger gating
//! - **Runner**: turning a triggered workflow into task intents

pub mod error;
pub mod runner;
pub mod schedule;
pub mod scheduler;
pub mod store;
pub mod workflow;

pub use error::{RunError, ScheduleError, SchedulerError};
pub use runner::{IntentWorkflowRunner, WorkflowRunner};
pub use schedule::{
    CronSchedule, ScheduleConfig, ScheduleRequest, WorkflowExecutionRecord,
    WorkflowExecutionStatus,
};
pub use scheduler::{ScheduledWorkflowOutcome, WorkflowScheduler};
pub use store::{InMemoryWorkflowStore, WorkflowStore};
pub use workflow::{ScheduledWorkflow, WorkflowStatus, WorkflowStep};
