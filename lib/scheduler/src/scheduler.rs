//! The workflow scheduler.
//!
//! Lifecycle:
//!
//! ```text
//!            resume                 cancel
//!   DRAFT ───────────▶ ACTIVE ───────────────▶ ARCHIVED
//!     ▲                  │                        ▲
//!     └──────────────────┘                        │
//!            pause             cancel (any) ──────┘
//! ```
//!
//! Every trigger re-reads the workflow before running it, so a pause that
//! lands before the trigger is handled always wins.

use crate::error::SchedulerError;
use crate::runner::WorkflowRunner;
use crate::schedule::{
    ScheduleConfig, ScheduleRequest, WorkflowExecutionRecord, WorkflowExecutionStatus,
};
use crate::store::WorkflowStore;
use crate::workflow::{ScheduledWorkflow, WorkflowStatus};
use agentry_core::WorkflowId;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Result of attaching a schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledWorkflowOutcome {
    /// The attached schedule.
    pub schedule: ScheduleConfig,
    /// The pending execution record created for it.
    pub execution: WorkflowExecutionRecord,
}

/// Gates workflow triggers through the lifecycle state machine.
#[derive(Clone)]
pub struct WorkflowScheduler {
    store: Arc<dyn WorkflowStore>,
    runner: Arc<dyn WorkflowRunner>,
}

impl std::fmt::Debug for WorkflowScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowScheduler").finish_non_exhaustive()
    }
}

impl WorkflowScheduler {
    /// Creates a scheduler.
    #[must_use]
    pub fn new(store: Arc<dyn WorkflowStore>, runner: Arc<dyn WorkflowRunner>) -> Self {
        Self { store, runner }
    }

    /// Gets a workflow.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::NotFound`] if it does not exist.
    pub async fn get_workflow(&self, id: WorkflowId) -> Result<ScheduledWorkflow, SchedulerError> {
        self.store
            .get(id)
            .await?
            .ok_or(SchedulerError::NotFound { id })
    }

    /// Execution records of a workflow, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn list_executions(
        &self,
        id: WorkflowId,
    ) -> Result<Vec<WorkflowExecutionRecord>, SchedulerError> {
        self.store.list_executions(id).await
    }

    /// Attaches a schedule to an ACTIVE workflow.
    ///
    /// Replaces any previous schedule and creates a pending execution record.
    /// Records still pending from an earlier schedule are marked skipped.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::NotActive`] unless the workflow is ACTIVE and
    /// [`SchedulerError::InvalidSchedule`] if the request is malformed.
    #[instrument(skip(self, request), fields(cron = %request.cron))]
    pub async fn schedule_workflow(
        &self,
        id: WorkflowId,
        request: ScheduleRequest,
    ) -> Result<ScheduledWorkflowOutcome, SchedulerError> {
        let mut workflow = self.get_workflow(id).await?;
        if !workflow.is_active() {
            return Err(SchedulerError::NotActive {
                id,
                status: workflow.status,
            });
        }

        let now = Utc::now();
        let schedule = ScheduleConfig::from_request(request, now)?;
        workflow.schedule = Some(schedule.clone());
        workflow.touch(now);
        self.store.update(workflow).await?;
        self.skip_pending(id, "superseded by a new schedule").await?;

        let execution = WorkflowExecutionRecord::new(id, Some(schedule.clone()));
        self.store.insert_execution(execution.clone()).await?;
        info!(execution_id = %execution.id, "workflow scheduled");
        Ok(ScheduledWorkflowOutcome {
            schedule,
            execution,
        })
    }

    /// Archives a workflow and clears its schedule.
    ///
    /// Execution records still pending are marked skipped.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::NotFound`] if the workflow does not exist.
    #[instrument(skip(self))]
    pub async fn cancel_scheduled_workflow(
        &self,
        id: WorkflowId,
    ) -> Result<ScheduledWorkflow, SchedulerError> {
        let mut workflow = self.get_workflow(id).await?;
        self.skip_pending(id, "workflow cancelled").await?;
        if workflow.status == WorkflowStatus::Archived && workflow.schedule.is_none() {
            return Ok(workflow);
        }
        workflow.status = WorkflowStatus::Archived;
        workflow.schedule = None;
        workflow.touch(Utc::now());
        self.store.update(workflow.clone()).await?;
        info!("workflow archived");
        Ok(workflow)
    }

    /// Moves an ACTIVE workflow back to DRAFT. Pausing a DRAFT is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidTransition`] for ARCHIVED workflows.
    #[instrument(skip(self))]
    pub async fn pause_scheduled_workflow(
        &self,
        id: WorkflowId,
    ) -> Result<ScheduledWorkflow, SchedulerError> {
        self.transition(id, "pause", WorkflowStatus::Active, WorkflowStatus::Draft)
            .await
    }

    /// Moves a DRAFT workflow to ACTIVE. Resuming an ACTIVE one is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::InvalidTransition`] for ARCHIVED workflows.
    #[instrument(skip(self))]
    pub async fn resume_scheduled_workflow(
        &self,
        id: WorkflowId,
    ) -> Result<ScheduledWorkflow, SchedulerError> {
        self.transition(id, "resume", WorkflowStatus::Draft, WorkflowStatus::Active)
            .await
    }

    /// Handles one firing of a workflow's schedule.
    ///
    /// The firing claims the pending record created by scheduling, or a new
    /// record if none is left.
    ///
    /// The trigger is skipped, with a skipped record, when the workflow is not
    /// ACTIVE, has no schedule, or `now` is outside the schedule window.
    /// Otherwise the workflow is handed to the runner and the record reflects
    /// the outcome. A failed run is recorded, not returned as an error.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::NotFound`] if the workflow does not exist,
    /// or a storage error.
    #[instrument(skip(self))]
    pub async fn handle_scheduled_execution(
        &self,
        id: WorkflowId,
    ) -> Result<WorkflowExecutionRecord, SchedulerError> {
        let workflow = self.get_workflow(id).await?;
        let (mut record, stored) = self.claim_record(&workflow).await?;

        if let Some(reason) = skip_reason(&workflow) {
            info!(%reason, status = %workflow.status, "scheduled execution skipped");
            record.skip(reason);
            self.save_record(record.clone(), stored).await?;
            return Ok(record);
        }

        record.start();
        self.save_record(record.clone(), stored).await?;

        match self.runner.run(&workflow).await {
            Ok(steps) => {
                info!(execution_id = %record.id, steps, "scheduled execution completed");
                record.complete();
            }
            Err(e) => {
                warn!(execution_id = %record.id, error = %e, "scheduled execution failed");
                record.fail(e.to_string());
            }
        }
        self.store.update_execution(record.clone()).await?;
        Ok(record)
    }

    /// The pending record left by scheduling, or a fresh one.
    async fn claim_record(
        &self,
        workflow: &ScheduledWorkflow,
    ) -> Result<(WorkflowExecutionRecord, bool), SchedulerError> {
        let pending = self
            .store
            .list_executions(workflow.id)
            .await?
            .into_iter()
            .rev()
            .find(|r| r.status == WorkflowExecutionStatus::Pending);
        Ok(match pending {
            Some(record) => (record, true),
            None => (
                WorkflowExecutionRecord::new(workflow.id, workflow.schedule.clone()),
                false,
            ),
        })
    }

    /// Marks every pending record of a workflow skipped.
    async fn skip_pending(&self, id: WorkflowId, reason: &str) -> Result<usize, SchedulerError> {
        let pending: Vec<WorkflowExecutionRecord> = self
            .store
            .list_executions(id)
            .await?
            .into_iter()
            .filter(|r| r.status == WorkflowExecutionStatus::Pending)
            .collect();
        let count = pending.len();
        for mut record in pending {
            record.skip(reason);
            self.store.update_execution(record).await?;
        }
        if count > 0 {
            debug!(count, %reason, "pending executions skipped");
        }
        Ok(count)
    }

    async fn save_record(
        &self,
        record: WorkflowExecutionRecord,
        stored: bool,
    ) -> Result<(), SchedulerError> {
        if stored {
            self.store.update_execution(record).await
        } else {
            self.store.insert_execution(record).await
        }
    }

    async fn transition(
        &self,
        id: WorkflowId,
        action: &'static str,
        from: WorkflowStatus,
        to: WorkflowStatus,
    ) -> Result<ScheduledWorkflow, SchedulerError> {
        let mut workflow = self.get_workflow(id).await?;
        if workflow.status == to {
            return Ok(workflow);
        }
        if workflow.status != from {
            return Err(SchedulerError::InvalidTransition {
                id,
                from: workflow.status,
                action,
            });
        }
        workflow.status = to;
        workflow.touch(Utc::now());
        self.store.update(workflow.clone()).await?;
        info!(%from, %to, "workflow {action}d");
        Ok(workflow)
    }
}

fn skip_reason(workflow: &ScheduledWorkflow) -> Option<String> {
    if !workflow.is_active() {
        return Some(format!("workflow is {}", workflow.status));
    }
    match &workflow.schedule {
        None => Some("workflow has no schedule".to_string()),
        Some(schedule) if !schedule.is_within_window(Utc::now()) => {
            Some("outside the schedule window".to_string())
        }
        Some(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RunError;
    use crate::runner::IntentWorkflowRunner;
    use crate::store::InMemoryWorkflowStore;
    use crate::workflow::WorkflowStep;
    use agentry_adapter::{AdapterRegistry, GmailAdapter};
    use agentry_core::{AgentId, ErrorCode, UserId};
    use agentry_orchestrator::{Orchestrator, OrchestratorConfig};
    use chrono::Duration;
    use serde_json::json;
    use std::sync::Mutex;

    /// Records the workflows it was asked to run.
    #[derive(Default)]
    struct RecordingRunner {
        runs: Mutex<Vec<WorkflowId>>,
        fail: bool,
    }

    impl RecordingRunner {
        fn runs(&self) -> Vec<WorkflowId> {
            self.runs.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl WorkflowRunner for RecordingRunner {
        async fn run(&self, workflow: &ScheduledWorkflow) -> Result<usize, RunError> {
            self.runs.lock().unwrap().push(workflow.id);
            if self.fail {
                Err(RunError::StepFailed {
                    step: 0,
                    tool: "gmail".to_string(),
                    code: ErrorCode::ApiError,
                    message: "503".to_string(),
                })
            } else {
                Ok(workflow.steps.len())
            }
        }
    }

    struct Fixture {
        scheduler: WorkflowScheduler,
        store: Arc<InMemoryWorkflowStore>,
        runner: Arc<RecordingRunner>,
    }

    fn fixture_with(runner: RecordingRunner) -> Fixture {
        let store = Arc::new(InMemoryWorkflowStore::new());
        let runner = Arc::new(runner);
        Fixture {
            scheduler: WorkflowScheduler::new(store.clone(), runner.clone()),
            store,
            runner,
        }
    }

    fn fixture() -> Fixture {
        fixture_with(RecordingRunner::default())
    }

    impl Fixture {
        async fn add(&self, status: WorkflowStatus) -> WorkflowId {
            let workflow =
                ScheduledWorkflow::new(UserId::new(), AgentId::new(), "Digest").with_status(status);
            let id = workflow.id;
            self.store.insert(workflow).await.expect("insert");
            id
        }
    }

    #[tokio::test]
    async fn draft_workflows_cannot_be_scheduled_until_resumed() {
        let f = fixture();
        let id = f.add(WorkflowStatus::Draft).await;

        let err = f
            .scheduler
            .schedule_workflow(id, ScheduleRequest::new("0 0 * * *"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("workflow not active"));
        assert!(f.scheduler.list_executions(id).await.expect("list").is_empty());

        f.scheduler.resume_scheduled_workflow(id).await.expect("resume");
        let outcome = f
            .scheduler
            .schedule_workflow(id, ScheduleRequest::new("0 0 * * *"))
            .await
            .expect("schedule");

        assert_eq!(outcome.schedule.cron, "0 0 * * *");
        assert_eq!(outcome.execution.status, WorkflowExecutionStatus::Pending);
        let workflow = f.scheduler.get_workflow(id).await.expect("get");
        assert_eq!(workflow.schedule, Some(outcome.schedule));
    }

    #[tokio::test]
    async fn invalid_cron_is_rejected() {
        let f = fixture();
        let id = f.add(WorkflowStatus::Active).await;
        let err = f
            .scheduler
            .schedule_workflow(id, ScheduleRequest::new("every day"))
            .await
            .unwrap_err();
        assert!(matches!(err, SchedulerError::InvalidSchedule(_)));
    }

    #[tokio::test]
    async fn unknown_workflow_is_not_found() {
        let f = fixture();
        let id = WorkflowId::new();
        assert_eq!(
            f.scheduler.pause_scheduled_workflow(id).await,
            Err(SchedulerError::NotFound { id })
        );
        assert_eq!(
            f.scheduler.handle_scheduled_execution(id).await,
            Err(SchedulerError::NotFound { id })
        );
    }

    #[tokio::test]
    async fn pause_then_trigger_runs_nothing() {
        let f = fixture();
        let id = f.add(WorkflowStatus::Active).await;
        f.scheduler
            .schedule_workflow(id, ScheduleRequest::new("*/15 * * * *"))
            .await
            .expect("schedule");

        f.scheduler.pause_scheduled_workflow(id).await.expect("pause");
        let record = f
            .scheduler
            .handle_scheduled_execution(id)
            .await
            .expect("handled");

        assert_eq!(record.status, WorkflowExecutionStatus::Skipped);
        assert!(f.runner.runs().is_empty());
    }

    #[tokio::test]
    async fn pause_then_trigger_emits_no_intent() {
        let gmail = Arc::new(GmailAdapter::new());
        let mut registry = AdapterRegistry::new();
        registry.register_shared(gmail.clone());
        let orchestrator = Arc::new(Orchestrator::new(registry, OrchestratorConfig::default()));
        let store = Arc::new(InMemoryWorkflowStore::new());
        let scheduler = WorkflowScheduler::new(
            store.clone(),
            Arc::new(IntentWorkflowRunner::new(orchestrator.clone())),
        );

        let workflow = ScheduledWorkflow::new(UserId::new(), AgentId::new(), "Digest")
            .with_status(WorkflowStatus::Active)
            .with_step(
                WorkflowStep::new("gmail", "send")
                    .with_context("to", json!("me@example.com"))
                    .with_context("subject", json!("Digest"))
                    .with_context("body", json!("...")),
            );
        let id = workflow.id;
        store.insert(workflow).await.expect("insert");
        scheduler
            .schedule_workflow(id, ScheduleRequest::new("0 8 * * *"))
            .await
            .expect("schedule");

        scheduler.pause_scheduled_workflow(id).await.expect("pause");
        scheduler.handle_scheduled_execution(id).await.expect("handled");
        assert!(orchestrator.list_executions(None).is_empty());
        assert_eq!(gmail.sent_count(), 0);

        scheduler.resume_scheduled_workflow(id).await.expect("resume");
        let record = scheduler.handle_scheduled_execution(id).await.expect("handled");
        assert_eq!(record.status, WorkflowExecutionStatus::Completed);
        assert_eq!(gmail.sent_count(), 1);
    }

    #[tokio::test]
    async fn active_trigger_runs_and_records_outcome() {
        let f = fixture();
        let id = f.add(WorkflowStatus::Active).await;
        f.scheduler
            .schedule_workflow(id, ScheduleRequest::new("0 * * * *"))
            .await
            .expect("schedule");

        let record = f
            .scheduler
            .handle_scheduled_execution(id)
            .await
            .expect("handled");

        assert_eq!(record.status, WorkflowExecutionStatus::Completed);
        assert!(record.started_at.is_some() && record.finished_at.is_some());
        assert_eq!(f.runner.runs(), vec![id]);

        let statuses: Vec<WorkflowExecutionStatus> = f
            .scheduler
            .list_executions(id)
            .await
            .expect("list")
            .into_iter()
            .map(|r| r.status)
            .collect();
        // The trigger consumed the pending record created by scheduling.
        assert_eq!(statuses, vec![WorkflowExecutionStatus::Completed]);

        f.scheduler.handle_scheduled_execution(id).await.expect("handled");
        assert_eq!(f.scheduler.list_executions(id).await.expect("list").len(), 2);
    }

    #[tokio::test]
    async fn failed_runs_are_recorded() {
        let f = fixture_with(RecordingRunner {
            fail: true,
            ..RecordingRunner::default()
        });
        let id = f.add(WorkflowStatus::Active).await;
        f.scheduler
            .schedule_workflow(id, ScheduleRequest::new("0 * * * *"))
            .await
            .expect("schedule");

        let record = f
            .scheduler
            .handle_scheduled_execution(id)
            .await
            .expect("handled");
        assert_eq!(record.status, WorkflowExecutionStatus::Failed);
        assert!(record.error.as_deref().is_some_and(|e| e.contains("503")));
    }

    #[tokio::test]
    async fn triggers_outside_the_window_are_skipped() {
        let f = fixture();
        let id = f.add(WorkflowStatus::Active).await;
        let tomorrow = Utc::now() + Duration::days(1);
        f.scheduler
            .schedule_workflow(
                id,
                ScheduleRequest::new("0 0 * * *").with_window(Some(tomorrow), None),
            )
            .await
            .expect("schedule");

        let record = f
            .scheduler
            .handle_scheduled_execution(id)
            .await
            .expect("handled");
        assert_eq!(record.status, WorkflowExecutionStatus::Skipped);
        assert!(f.runner.runs().is_empty());
    }

    #[tokio::test]
    async fn active_workflow_without_schedule_is_skipped() {
        let f = fixture();
        let id = f.add(WorkflowStatus::Active).await;
        let record = f
            .scheduler
            .handle_scheduled_execution(id)
            .await
            .expect("handled");
        assert_eq!(record.status, WorkflowExecutionStatus::Skipped);
    }

    #[tokio::test]
    async fn cancel_archives_and_clears_schedule() {
        let f = fixture();
        let id = f.add(WorkflowStatus::Active).await;
        f.scheduler
            .schedule_workflow(id, ScheduleRequest::new("0 0 * * *"))
            .await
            .expect("schedule");

        let workflow = f.scheduler.cancel_scheduled_workflow(id).await.expect("cancel");
        assert_eq!(workflow.status, WorkflowStatus::Archived);
        assert!(workflow.schedule.is_none());
        // Idempotent.
        f.scheduler.cancel_scheduled_workflow(id).await.expect("cancel again");

        let record = f
            .scheduler
            .handle_scheduled_execution(id)
            .await
            .expect("handled");
        assert_eq!(record.status, WorkflowExecutionStatus::Skipped);
    }

    #[tokio::test]
    async fn rescheduling_and_cancelling_settle_pending_records() {
        let f = fixture();
        let id = f.add(WorkflowStatus::Active).await;
        let first = f
            .scheduler
            .schedule_workflow(id, ScheduleRequest::new("0 0 * * *"))
            .await
            .expect("schedule");
        let second = f
            .scheduler
            .schedule_workflow(id, ScheduleRequest::new("0 12 * * *"))
            .await
            .expect("reschedule");

        let records = f.scheduler.list_executions(id).await.expect("list");
        let statuses: Vec<_> = records.iter().map(|r| (r.id, r.status)).collect();
        assert_eq!(
            statuses,
            vec![
                (first.execution.id, WorkflowExecutionStatus::Skipped),
                (second.execution.id, WorkflowExecutionStatus::Pending),
            ]
        );
        assert_eq!(records[0].error.as_deref(), Some("superseded by a new schedule"));

        f.scheduler.cancel_scheduled_workflow(id).await.expect("cancel");
        let records = f.scheduler.list_executions(id).await.expect("list");
        assert!(
            records
                .iter()
                .all(|r| r.status == WorkflowExecutionStatus::Skipped)
        );
        assert_eq!(records[1].error.as_deref(), Some("workflow cancelled"));
        assert!(records.iter().all(|r| r.finished_at.is_some()));
    }

    #[tokio::test]
    async fn archived_workflows_cannot_be_paused_or_resumed() {
        let f = fixture();
        let id = f.add(WorkflowStatus::Archived).await;

        for result in [
            f.scheduler.pause_scheduled_workflow(id).await,
            f.scheduler.resume_scheduled_workflow(id).await,
        ] {
            assert!(matches!(
                result,
                Err(SchedulerError::InvalidTransition {
                    from: WorkflowStatus::Archived,
                    ..
                })
            ));
        }
    }

    #[tokio::test]
    async fn noop_transitions_are_idempotent() {
        let f = fixture();
        let id = f.add(WorkflowStatus::Draft).await;

        let paused = f.scheduler.pause_scheduled_workflow(id).await.expect("pause");
        assert_eq!(paused.status, WorkflowStatus::Draft);

        f.scheduler.resume_scheduled_workflow(id).await.expect("resume");
        let resumed = f.scheduler.resume_scheduled_workflow(id).await.expect("resume");
        assert_eq!(resumed.status, WorkflowStatus::Active);
    }
}
