//! Workflows and their lifecycle.

use crate::schedule::ScheduleConfig;
use agentry_core::{AgentId, UserId, WorkflowId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::fmt;

/// Lifecycle status of a workflow.
///
/// Only ACTIVE workflows may be scheduled or fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowStatus {
    /// Being edited, or paused.
    Draft,
    /// Eligible for scheduling and triggering.
    Active,
    /// Cancelled; terminal.
    Archived,
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Draft => "DRAFT",
            Self::Active => "ACTIVE",
            Self::Archived => "ARCHIVED",
        })
    }
}

/// One intent template run when the workflow fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowStep {
    pub tool: String,
    pub intent: String,
    #[serde(default)]
    pub context: Map<String, JsonValue>,
}

impl WorkflowStep {
    /// Creates a step with an empty context.
    #[must_use]
    pub fn new(tool: impl Into<String>, intent: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            intent: intent.into(),
            context: Map::new(),
        }
    }

    /// Adds a context field.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.context.insert(key.into(), value);
        self
    }
}

/// A workflow owned by an agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledWorkflow {
    pub id: WorkflowId,
    pub user_id: UserId,
    pub agent_id: AgentId,
    pub name: String,
    pub status: WorkflowStatus,
    /// Attached by scheduling, cleared by cancellation.
    pub schedule: Option<ScheduleConfig>,
    pub steps: Vec<WorkflowStep>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ScheduledWorkflow {
    /// Creates a DRAFT workflow without steps.
    #[must_use]
    pub fn new(user_id: UserId, agent_id: AgentId, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: WorkflowId::new(),
            user_id,
            agent_id,
            name: name.into(),
            status: WorkflowStatus::Draft,
            schedule: None,
            steps: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Appends a step.
    #[must_use]
    pub fn with_step(mut self, step: WorkflowStep) -> Self {
        self.steps.push(step);
        self
    }

    /// Sets the status.
    #[must_use]
    pub fn with_status(mut self, status: WorkflowStatus) -> Self {
        self.status = status;
        self
    }

    /// Returns whether the workflow may be scheduled or fire.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == WorkflowStatus::Active
    }

    pub(crate) fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}
