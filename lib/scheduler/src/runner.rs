//! Running triggered workflows.

use crate::error::RunError;
use crate::workflow::ScheduledWorkflow;
use agentry_adapter::TaskIntent;
use agentry_orchestrator::Orchestrator;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Runs a workflow whose trigger was accepted.
#[async_trait]
pub trait WorkflowRunner: Send + Sync {
    /// Runs every step, returning how many were run.
    ///
    /// # Errors
    ///
    /// Returns the first step failure; later steps are not run.
    async fn run(&self, workflow: &ScheduledWorkflow) -> Result<usize, RunError>;
}

/// Runs each workflow step as a [`TaskIntent`] through the orchestrator.
#[derive(Debug, Clone)]
pub struct IntentWorkflowRunner {
    orchestrator: Arc<Orchestrator>,
}

impl IntentWorkflowRunner {
    /// Creates a runner dispatching to `orchestrator`.
    #[must_use]
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }

    /// The intents a workflow emits, one per step.
    #[must_use]
    pub fn intents(workflow: &ScheduledWorkflow) -> Vec<TaskIntent> {
        workflow
            .steps
            .iter()
            .map(|step| TaskIntent {
                agent_id: workflow.agent_id,
                user_id: workflow.user_id,
                tool: step.tool.clone(),
                intent: step.intent.clone(),
                context: step.context.clone(),
            })
            .collect()
    }
}

#[async_trait]
impl WorkflowRunner for IntentWorkflowRunner {
    #[instrument(
        skip(self, workflow),
        fields(workflow = %workflow.id, steps = workflow.steps.len())
    )]
    async fn run(&self, workflow: &ScheduledWorkflow) -> Result<usize, RunError> {
        let intents = Self::intents(workflow);
        for (step, intent) in intents.iter().enumerate() {
            let outcome = self
                .orchestrator
                .execute_intent(intent)
                .await
                .map_err(|e| RunError::Dispatch {
                    step,
                    reason: e.to_string(),
                })?;

            if let Some(error) = outcome.result.error {
                warn!(step, tool = %intent.tool, code = %error.code, "workflow step failed");
                return Err(RunError::StepFailed {
                    step,
                    tool: intent.tool.clone(),
                    code: error.code,
                    message: error.message,
                });
            }
        }
        info!("workflow steps completed");
        Ok(intents.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::WorkflowStep;
    use agentry_adapter::{AdapterRegistry, GmailAdapter, NotionAdapter};
    use agentry_core::{AgentId, ErrorCode, UserId};
    use agentry_orchestrator::OrchestratorConfig;
    use serde_json::json;

    fn runner(gmail: Arc<GmailAdapter>) -> (IntentWorkflowRunner, Arc<Orchestrator>) {
        let mut registry = AdapterRegistry::new();
        registry.register_shared(gmail);
        registry.register(NotionAdapter::new());
        let orchestrator = Arc::new(Orchestrator::new(registry, OrchestratorConfig::default()));
        (IntentWorkflowRunner::new(Arc::clone(&orchestrator)), orchestrator)
    }

    fn send_step(to: &str) -> WorkflowStep {
        WorkflowStep::new("gmail", "send")
            .with_context("to", json!(to))
            .with_context("subject", json!("Daily digest"))
            .with_context("body", json!("Nothing new."))
    }

    #[test]
    fn intents_carry_workflow_owner() {
        let workflow = ScheduledWorkflow::new(UserId::new(), AgentId::new(), "Digest")
            .with_step(send_step("a@example.com"));
        let intents = IntentWorkflowRunner::intents(&workflow);
        assert_eq!(intents.len(), 1);
        assert_eq!(intents[0].agent_id, workflow.agent_id);
        assert_eq!(intents[0].user_id, workflow.user_id);
        assert_eq!(intents[0].context_str("to"), Some("a@example.com"));
    }

    #[tokio::test]
    async fn runs_every_step() {
        let gmail = Arc::new(GmailAdapter::new());
        let (runner, orchestrator) = runner(Arc::clone(&gmail));
        let workflow = ScheduledWorkflow::new(UserId::new(), AgentId::new(), "Digest")
            .with_step(send_step("a@example.com"))
            .with_step(send_step("b@example.com"));

        assert_eq!(runner.run(&workflow).await, Ok(2));
        assert_eq!(gmail.sent_count(), 2);
        assert_eq!(orchestrator.list_executions(Some("gmail")).len(), 2);
    }

    #[tokio::test]
    async fn stops_at_first_failed_step() {
        let gmail = Arc::new(GmailAdapter::new());
        let (runner, _) = runner(Arc::clone(&gmail));
        let workflow = ScheduledWorkflow::new(UserId::new(), AgentId::new(), "Digest")
            .with_step(WorkflowStep::new("notion", "create").with_context("title", json!("x")))
            .with_step(send_step("a@example.com"));

        let err = runner.run(&workflow).await.unwrap_err();
        match err {
            RunError::StepFailed { step, tool, code, .. } => {
                assert_eq!(step, 0);
                assert_eq!(tool, "notion");
                assert_eq!(code, ErrorCode::ValidationError);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(gmail.sent_count(), 0);
    }

    #[tokio::test]
    async fn unknown_tools_fail_dispatch() {
        let (runner, _) = runner(Arc::new(GmailAdapter::new()));
        let workflow = ScheduledWorkflow::new(UserId::new(), AgentId::new(), "Digest")
            .with_step(WorkflowStep::new("fax", "send"));

        assert!(matches!(
            runner.run(&workflow).await,
            Err(RunError::Dispatch { step: 0, .. })
        ));
    }
}
