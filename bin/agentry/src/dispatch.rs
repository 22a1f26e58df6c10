//! One-shot intent dispatch.

use crate::config::EngineConfig;
use crate::error::DispatchError;
use agentry_adapter::{AdapterRegistry, GmailAdapter, NotionAdapter, TaskIntent};
use agentry_core::ErrorLogId;
use agentry_errlog::{ErrorHandler, FallbackMessages, InMemoryErrorLogStore, NewErrorLog};
use agentry_orchestrator::{Orchestrator, PluginExecution};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{info, warn};

/// What the caller sees after a dispatch.
///
/// Failures carry the tool's fallback message, never the raw error text.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchReport {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,
    /// Absent when the intent was rejected before any attempt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution: Option<PluginExecution>,
    /// Error-ledger entry for a failed dispatch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_id: Option<ErrorLogId>,
}

/// The orchestrator and error ledger wired together.
#[derive(Debug)]
pub struct Engine {
    orchestrator: Orchestrator,
    errors: ErrorHandler,
}

impl Engine {
    /// Builds an engine with the built-in adapters registered.
    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Self {
        let mut registry = AdapterRegistry::new();
        registry.register(GmailAdapter::new());
        registry.register(NotionAdapter::new());

        Self::new(
            Orchestrator::new(registry, config.orchestrator.clone()),
            ErrorHandler::new(
                Arc::new(InMemoryErrorLogStore::new()),
                FallbackMessages::with_overrides(config.fallback_messages.clone()),
            ),
        )
    }

    /// Builds an engine from its parts.
    #[must_use]
    pub fn new(orchestrator: Orchestrator, errors: ErrorHandler) -> Self {
        Self {
            orchestrator,
            errors,
        }
    }

    /// Dispatches an intent, logging terminal failures.
    ///
    /// # Errors
    ///
    /// Returns an error only if a failure cannot be logged.
    pub async fn dispatch(
        &self,
        intent: &TaskIntent,
    ) -> agentry_core::Result<DispatchReport, DispatchError> {
        let (execution, code, message) = match self.orchestrator.execute_intent(intent).await {
            Ok(outcome) => {
                if outcome.result.success {
                    info!(execution = %outcome.execution.id, "intent completed");
                    return Ok(DispatchReport {
                        success: true,
                        message: outcome.result.message,
                        data: outcome.result.data,
                        execution: Some(outcome.execution),
                        error_id: None,
                    });
                }
                let (code, message) = outcome.result.error.map_or_else(
                    || ("unknown_error".to_string(), outcome.result.message.clone()),
                    |e| (e.code.as_str().to_string(), e.message),
                );
                (Some(outcome.execution), code, message)
            }
            Err(e) => (None, e.code().as_str().to_string(), e.to_string()),
        };

        warn!(tool = %intent.tool, %code, "intent failed");
        let failure = NewErrorLog::new(
            intent.agent_id,
            intent.user_id,
            intent.tool.as_str(),
            intent.intent.as_str(),
            code,
            message,
        )
        .with_payload(JsonValue::Object(intent.context.clone()));
        let error_id = self
            .errors
            .log_error(failure)
            .await
            .map_err(|e| DispatchError::ErrorLog {
                details: e.to_string(),
            })?;

        Ok(DispatchReport {
            success: false,
            message: self
                .errors
                .get_fallback_message(&intent.tool, intent.agent_id),
            data: None,
            execution,
            error_id: Some(error_id),
        })
    }
}
