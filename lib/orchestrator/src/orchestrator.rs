//! The execution orchestrator.
//!
//! Every call runs inside the same envelope:
//!
//! 1. Up to `max_retries` attempts, each raced against its timeout budget
//! 2. A timed-out attempt has its cancellation token fired and its future dropped
//! 3. Panics and errors are caught and normalized, never propagated
//! 4. Retryable failures back off for `min(base * 2^(attempt-1), max)`
//! 5. Terminal failures (or the last attempt) finalize the execution
//!
//! The orchestrator does not write to the error ledger; callers forward
//! terminal failures themselves.

use crate::config::{ExecutionConfig, OrchestratorConfig, TimeoutScope};
use crate::error::{AttemptError, AttemptFailure, OrchestratorError, parse_error};
use crate::execution::{ExecutionId, PluginExecution};
use crate::ledger::{ExecutionLedger, ExecutionStats};
use crate::plugin::Plugin;
use agentry_adapter::{AdapterRegistry, TaskIntent, TaskResult};
use agentry_core::ErrorCode;
use futures::FutureExt;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Result of dispatching a [`TaskIntent`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntentOutcome {
    /// The recorded execution.
    pub execution: PluginExecution,
    /// The adapter's final answer, or the failure that ended the execution.
    pub result: TaskResult,
}

/// Dispatches plugins and intents under retry, timeout and backoff limits.
#[derive(Debug)]
pub struct Orchestrator {
    registry: AdapterRegistry,
    ledger: ExecutionLedger,
    config: OrchestratorConfig,
}

impl Orchestrator {
    /// Creates an orchestrator over the given adapters.
    #[must_use]
    pub fn new(registry: AdapterRegistry, config: OrchestratorConfig) -> Self {
        Self {
            ledger: ExecutionLedger::new(config.ledger_capacity),
            registry,
            config,
        }
    }

    /// The adapters this orchestrator dispatches to.
    #[must_use]
    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    /// The orchestrator-wide settings.
    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Runs a plugin call under the retry envelope.
    #[instrument(skip(self, plugin, config, context), fields(plugin = plugin.name()))]
    pub async fn execute_plugin(
        &self,
        plugin: &dyn Plugin,
        config: &ExecutionConfig,
        input: &str,
        context: Option<JsonValue>,
    ) -> PluginExecution {
        let execution = PluginExecution::new(plugin.name(), input, context.clone());
        let context = context.as_ref();
        let (execution, _) = self
            .run_attempts(execution, config, |cancel| plugin.call(input, context, cancel))
            .await;
        execution
    }

    /// Dispatches an intent with the orchestrator's default limits.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::UnknownTool`] when no adapter is
    /// registered for the intent's tool; nothing is recorded in that case.
    pub async fn execute_intent(
        &self,
        intent: &TaskIntent,
    ) -> Result<IntentOutcome, OrchestratorError> {
        let config = self.config.execution_defaults();
        self.execute_intent_with(intent, &config).await
    }

    /// Dispatches an intent with explicit limits.
    ///
    /// The adapter validates the intent before the first attempt. A rejected
    /// intent is recorded as a failed execution with zero attempts.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::UnknownTool`] when no adapter is
    /// registered for the intent's tool.
    #[instrument(
        skip(self, intent, config),
        fields(tool = %intent.tool, intent = %intent.intent, agent = %intent.agent_id)
    )]
    pub async fn execute_intent_with(
        &self,
        intent: &TaskIntent,
        config: &ExecutionConfig,
    ) -> Result<IntentOutcome, OrchestratorError> {
        let Some(adapter) = self.registry.get(&intent.tool) else {
            warn!("no adapter registered for tool");
            return Err(OrchestratorError::UnknownTool {
                tool: intent.tool.clone(),
            });
        };

        let mut execution = PluginExecution::new(
            intent.tool.to_ascii_lowercase(),
            intent.intent.clone(),
            Some(JsonValue::Object(intent.context.clone())),
        );

        if let Err(error) = adapter.validate(intent) {
            info!(code = %error.code, "intent rejected before first attempt");
            execution.fail(error.code.clone(), error.message.clone(), Duration::ZERO);
            self.ledger.record(execution.clone());
            return Ok(IntentOutcome {
                execution,
                result: TaskResult::failure(error),
            });
        }

        let (execution, outcome) = self
            .run_attempts(execution, config, |cancel| {
                let adapter = Arc::clone(&adapter);
                async move {
                    match adapter.execute(intent, cancel).await {
                        Ok(result) if result.success => Ok(result),
                        Ok(result) => Err(failure_from_result(result)),
                        Err(e) => Err(AttemptFailure::from(e)),
                    }
                }
            })
            .await;

        let result = match outcome {
            Ok(result) => result,
            Err(failure) => TaskResult::failure(failure.into_task_error()),
        };
        Ok(IntentOutcome { execution, result })
    }

    /// Looks up an execution in the ledger.
    #[must_use]
    pub fn get_execution(&self, id: &ExecutionId) -> Option<PluginExecution> {
        self.ledger.get(id)
    }

    /// Retained executions in submission order.
    #[must_use]
    pub fn list_executions(&self, plugin_name: Option<&str>) -> Vec<PluginExecution> {
        self.ledger.list(plugin_name)
    }

    /// Aggregate statistics over retained executions.
    #[must_use]
    pub fn get_execution_stats(&self, plugin_name: Option<&str>) -> ExecutionStats {
        self.ledger.stats(plugin_name)
    }

    async fn run_attempts<T, F, Fut>(
        &self,
        mut execution: PluginExecution,
        config: &ExecutionConfig,
        mut attempt_fn: F,
    ) -> (PluginExecution, Result<T, AttemptFailure>)
    where
        T: Serialize,
        F: FnMut(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, AttemptFailure>>,
    {
        let limit = config.attempt_limit();
        let started = Instant::now();
        let mut spent = Duration::ZERO;
        let mut attempt = 0;

        loop {
            attempt += 1;
            execution.begin_attempt();
            self.ledger.record(execution.clone());

            let budget = match config.timeout_scope {
                TimeoutScope::PerAttempt => config.timeout,
                TimeoutScope::Execution => config.timeout.saturating_sub(spent),
            };
            let cancel = CancellationToken::new();
            let attempt_started = Instant::now();
            let call = AssertUnwindSafe(attempt_fn(cancel.clone())).catch_unwind();
            let outcome = match tokio::time::timeout(budget, call).await {
                Ok(Ok(Ok(value))) => Ok(value),
                Ok(Ok(Err(failure))) => Err(AttemptError::Failed(failure)),
                Ok(Err(panic)) => Err(AttemptError::Failed(AttemptFailure::from_panic(
                    panic.as_ref(),
                ))),
                Err(_) => {
                    cancel.cancel();
                    Err(AttemptError::TimedOut { after: budget })
                }
            };
            spent += attempt_started.elapsed();

            let err = match outcome {
                Ok(value) => {
                    let output = serde_json::to_value(&value).unwrap_or(JsonValue::Null);
                    execution.complete(output, started.elapsed());
                    self.ledger.record(execution.clone());
                    info!(
                        execution_id = %execution.id,
                        attempts = execution.attempts,
                        duration_ms = execution.duration_ms,
                        "execution completed"
                    );
                    return (execution, Ok(value));
                }
                Err(err) => err,
            };

            let budget_exhausted =
                config.timeout_scope == TimeoutScope::Execution && spent >= config.timeout;
            if attempt >= limit || !err.is_retryable() || budget_exhausted {
                let timed_out = err.is_timeout();
                let failure = err.into_failure();
                if timed_out {
                    execution.time_out(failure.message.clone(), started.elapsed());
                } else {
                    execution.fail(
                        failure.code.clone(),
                        failure.message.clone(),
                        started.elapsed(),
                    );
                }
                self.ledger.record(execution.clone());
                warn!(
                    execution_id = %execution.id,
                    attempts = execution.attempts,
                    status = ?execution.status,
                    code = %failure.code,
                    error = %failure.message,
                    "execution failed"
                );
                return (execution, Err(failure));
            }

            execution.record_failure(err.code(), err.to_string());
            self.ledger.record(execution.clone());
            let delay = self.config.backoff.delay(attempt);
            debug!(
                execution_id = %execution.id,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "attempt failed, backing off"
            );
            tokio::time::sleep(delay).await;
        }
    }
}

fn failure_from_result(result: TaskResult) -> AttemptFailure {
    match result.error {
        Some(error) => AttemptFailure::from(error),
        None => AttemptFailure::new(ErrorCode::UnknownError, parse_error(&result.message)),
    }
}
