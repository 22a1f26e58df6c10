//! Free-form plugins.
//!
//! A [`Plugin`] is anything that turns an input string (and optional
//! structured context) into JSON output. Tool adapters are dispatched through
//! [`Orchestrator::execute_intent`](crate::Orchestrator::execute_intent)
//! instead; plugins cover the remaining calls, such as prompt completions.

use crate::error::AttemptFailure;
use async_trait::async_trait;
use serde_json::Value as JsonValue;
use tokio_util::sync::CancellationToken;

/// Trait for plugins run under the orchestrator's retry envelope.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Name the executions of this plugin are recorded under.
    fn name(&self) -> &str;

    /// Performs one call.
    ///
    /// The token is cancelled if the orchestrator abandons the call.
    ///
    /// # Errors
    ///
    /// Returns a classified failure; its code decides whether the
    /// orchestrator retries.
    async fn call(
        &self,
        input: &str,
        context: Option<&JsonValue>,
        cancel: CancellationToken,
    ) -> Result<JsonValue, AttemptFailure>;
}
