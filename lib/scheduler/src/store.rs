//! Workflow persistence.

use crate::error::SchedulerError;
use crate::schedule::WorkflowExecutionRecord;
use crate::workflow::ScheduledWorkflow;
use agentry_core::{WorkflowExecutionId, WorkflowId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Trait for workflow and execution-record storage.
#[async_trait]
pub trait WorkflowStore: Send + Sync {
    /// Stores a new workflow.
    async fn insert(&self, workflow: ScheduledWorkflow) -> Result<(), SchedulerError>;

    /// Gets a workflow by ID.
    async fn get(&self, id: WorkflowId) -> Result<Option<ScheduledWorkflow>, SchedulerError>;

    /// Replaces a stored workflow.
    ///
    /// Fails with [`SchedulerError::NotFound`] if it does not exist.
    async fn update(&self, workflow: ScheduledWorkflow) -> Result<(), SchedulerError>;

    /// Stores a new execution record.
    async fn insert_execution(&self, record: WorkflowExecutionRecord) -> Result<(), SchedulerError>;

    /// Replaces a stored execution record.
    async fn update_execution(&self, record: WorkflowExecutionRecord) -> Result<(), SchedulerError>;

    /// Execution records of a workflow, oldest first.
    async fn list_executions(
        &self,
        workflow_id: WorkflowId,
    ) -> Result<Vec<WorkflowExecutionRecord>, SchedulerError>;
}

#[derive(Debug, Default)]
struct Tables {
    workflows: HashMap<WorkflowId, ScheduledWorkflow>,
    executions: Vec<WorkflowExecutionRecord>,
}

/// In-memory [`WorkflowStore`].
#[derive(Debug, Default)]
pub struct InMemoryWorkflowStore {
    tables: RwLock<Tables>,
}

impl InMemoryWorkflowStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkflowStore for InMemoryWorkflowStore {
    async fn insert(&self, workflow: ScheduledWorkflow) -> Result<(), SchedulerError> {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        if tables.workflows.contains_key(&workflow.id) {
            return Err(SchedulerError::Storage {
                reason: format!("workflow {} already exists", workflow.id),
            });
        }
        tables.workflows.insert(workflow.id, workflow);
        Ok(())
    }

    async fn get(&self, id: WorkflowId) -> Result<Option<ScheduledWorkflow>, SchedulerError> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        Ok(tables.workflows.get(&id).cloned())
    }

    async fn update(&self, workflow: ScheduledWorkflow) -> Result<(), SchedulerError> {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        match tables.workflows.get_mut(&workflow.id) {
            Some(stored) => {
                *stored = workflow;
                Ok(())
            }
            None => Err(SchedulerError::NotFound { id: workflow.id }),
        }
    }

    async fn insert_execution(
        &self,
        record: WorkflowExecutionRecord,
    ) -> Result<(), SchedulerError> {
        self.tables
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .executions
            .push(record);
        Ok(())
    }

    async fn update_execution(
        &self,
        record: WorkflowExecutionRecord,
    ) -> Result<(), SchedulerError> {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        match tables.executions.iter_mut().find(|r| r.id == record.id) {
            Some(stored) => {
                *stored = record;
                Ok(())
            }
            None => Err(missing_execution(record.id)),
        }
    }

    async fn list_executions(
        &self,
        workflow_id: WorkflowId,
    ) -> Result<Vec<WorkflowExecutionRecord>, SchedulerError> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        Ok(tables
            .executions
            .iter()
            .filter(|r| r.workflow_id == workflow_id)
            .cloned()
            .collect())
    }
}

fn missing_execution(id: WorkflowExecutionId) -> SchedulerError {
    SchedulerError::Storage {
        reason: format!("execution record {id} does not exist"),
    }
}
