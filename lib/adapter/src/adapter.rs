//! Adapter trait and related types.
//!
//! Every external tool is driven through an [`Adapter`]. Adapters are
//! stateless with respect to the orchestrator: they see only the intent and
//! whatever external state they front, and they never retry or time out on
//! their own.

use crate::error::AdapterError;
use crate::intent::TaskIntent;
use crate::result::{TaskError, TaskResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Information about an adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterInfo {
    /// Tool identifier the adapter is registered under.
    pub tool: String,
    /// Human-readable name, used in user-facing text.
    pub name: String,
    /// Description of the adapter.
    pub description: String,
    /// Intents the adapter implements.
    pub intents: Vec<IntentInfo>,
}

impl AdapterInfo {
    /// Looks up an intent by name, ignoring case.
    #[must_use]
    pub fn intent(&self, name: &str) -> Option<&IntentInfo> {
        self.intents
            .iter()
            .find(|info| info.name.eq_ignore_ascii_case(name))
    }
}

/// Information about one supported intent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentInfo {
    /// Intent verb.
    pub name: String,
    /// Description of what the intent does.
    pub description: String,
    /// Context fields that must be present and non-blank.
    pub required_fields: Vec<String>,
}

impl IntentInfo {
    /// Creates intent information.
    #[must_use]
    pub fn new(name: &str, description: &str, required_fields: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            required_fields: required_fields.iter().map(|f| (*f).to_string()).collect(),
        }
    }
}

/// Trait for tool adapters.
#[async_trait]
pub trait Adapter: Send + Sync {
    /// Returns information about this adapter.
    fn info(&self) -> AdapterInfo;

    /// Checks an intent before any external call is made.
    ///
    /// The default implementation rejects intents missing from
    /// [`AdapterInfo::intents`] and intents lacking required context fields.
    ///
    /// # Errors
    ///
    /// Returns the terminal failure the intent would produce.
    fn validate(&self, intent: &TaskIntent) -> Result<(), TaskError> {
        let info = self.info();
        let Some(spec) = info.intent(&intent.intent) else {
            return Err(TaskError::unsupported_intent(&info.tool, &intent.intent));
        };
        let missing = intent.missing_fields(&spec.required_fields);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(TaskError::missing_fields(&missing))
        }
    }

    /// Executes an intent.
    ///
    /// Expected failures (unsupported intent, missing fields, resources the
    /// tool does not know) are reported as a failed [`TaskResult`]. The
    /// token is cancelled when the caller gives up on the call; adapters
    /// should check it before committing side effects.
    ///
    /// # Errors
    ///
    /// Returns an error if the call to the external tool itself fails.
    async fn execute(
        &self,
        intent: &TaskIntent,
        cancel: CancellationToken,
    ) -> Result<TaskResult, AdapterError>;
}

/// Waits out a simulated network round trip, giving up early on cancellation.
///
/// # Errors
///
/// Returns [`AdapterError::Cancelled`] if the token fires first.
pub async fn simulate_latency(
    latency: Duration,
    cancel: &CancellationToken,
) -> Result<(), AdapterError> {
    if latency.is_zero() {
        return if cancel.is_cancelled() {
            Err(AdapterError::Cancelled)
        } else {
            Ok(())
        };
    }
    tokio::select! {
        () = cancel.cancelled() => Err(AdapterError::Cancelled),
        () = tokio::time::sleep(latency) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentry_core::{AgentId, ErrorCode, UserId};
    use serde_json::json;

    struct EchoAdapter;

    #[async_trait]
    impl Adapter for EchoAdapter {
        fn info(&self) -> AdapterInfo {
            AdapterInfo {
                tool: "echo".to_string(),
                name: "Echo".to_string(),
                description: "Echoes its context".to_string(),
                intents: vec![IntentInfo::new("say", "Echo a phrase", &["phrase"])],
            }
        }

        async fn execute(
            &self,
            intent: &TaskIntent,
            _cancel: CancellationToken,
        ) -> Result<TaskResult, AdapterError> {
            if let Err(e) = self.validate(intent) {
                return Ok(e.into());
            }
            Ok(TaskResult::success("echoed", json!(intent.context)))
        }
    }

    fn intent(verb: &str) -> TaskIntent {
        TaskIntent::new(AgentId::new(), UserId::new(), "echo", verb)
    }

    #[test]
    fn default_validation_rejects_unknown_intent() {
        let err = EchoAdapter.validate(&intent("shout")).unwrap_err();
        assert_eq!(err.code, ErrorCode::UnsupportedIntent);
        assert!(err.message.contains("shout"));
    }

    #[test]
    fn default_validation_matches_intent_case_insensitively() {
        let intent = intent("SAY").with_context("phrase", json!("hi"));
        assert!(EchoAdapter.validate(&intent).is_ok());
    }

    #[tokio::test]
    async fn execute_reports_validation_failure_as_result() {
        let result = EchoAdapter
            .execute(&intent("say"), CancellationToken::new())
            .await
            .expect("no adapter error");
        assert!(!result.success);
        assert!(result.message.contains("Missing required fields"));
    }

    #[tokio::test(start_paused = true)]
    async fn simulate_latency_stops_on_cancel() {
        let token = CancellationToken::new();
        let child = token.clone();
        let handle =
            tokio::spawn(async move { simulate_latency(Duration::from_secs(60), &child).await });
        token.cancel();
        let outcome = handle.await.expect("join");
        assert_eq!(outcome, Err(AdapterError::Cancelled));
    }
}
