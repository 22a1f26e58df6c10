//! Simulated Gmail adapter.
//!
//! Sent messages live in an in-memory mailbox so that `read` and `search`
//! can find what `send` produced. No network traffic is involved.

use crate::adapter::{Adapter, AdapterInfo, IntentInfo, simulate_latency};
use crate::error::AdapterError;
use crate::intent::TaskIntent;
use crate::result::{TaskError, TaskResult};
use agentry_core::ErrorCode;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use ulid::Ulid;

/// Tool identifier.
pub const TOOL: &str = "gmail";

#[derive(Debug, Clone, Serialize)]
struct MailMessage {
    message_id: String,
    thread_id: String,
    to: String,
    subject: String,
    body: String,
    sent_at: DateTime<Utc>,
}

/// Mock Gmail adapter.
#[derive(Debug, Default)]
pub struct GmailAdapter {
    mailbox: RwLock<Vec<MailMessage>>,
    latency: Duration,
}

impl GmailAdapter {
    /// Creates an adapter that answers immediately.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the simulated round-trip latency.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Returns the number of messages sent so far.
    #[must_use]
    pub fn sent_count(&self) -> usize {
        self.mailbox
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn send(&self, intent: &TaskIntent) -> TaskResult {
        let field = |key: &str| intent.context_str(key).unwrap_or_default().to_string();
        let message = MailMessage {
            message_id: format!("msg_{}", Ulid::new()),
            thread_id: intent
                .context_str("thread_id")
                .map_or_else(|| format!("thr_{}", Ulid::new()), str::to_string),
            to: field("to"),
            subject: field("subject"),
            body: field("body"),
            sent_at: Utc::now(),
        };
        let data = json!({
            "message_id": message.message_id,
            "thread_id": message.thread_id,
            "to": message.to,
        });
        debug!(message_id = %message.message_id, "simulated gmail send");
        self.mailbox
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message);
        TaskResult::success("Email sent", data)
    }

    fn read(&self, intent: &TaskIntent) -> TaskResult {
        let message_id = intent.context_str("message_id").unwrap_or_default();
        let mailbox = self.mailbox.read().unwrap_or_else(PoisonError::into_inner);
        match mailbox.iter().find(|m| m.message_id == message_id) {
            Some(message) => TaskResult::success("Email retrieved", json!(message)),
            None => TaskResult::failure(
                TaskError::new(
                    ErrorCode::ValidationError,
                    format!("Message not found: {message_id}"),
                )
                    .with_details(json!({ "status": 404 })),
            ),
        }
    }

    fn search(&self, intent: &TaskIntent) -> TaskResult {
        let query = intent
            .context_str("query")
            .unwrap_or_default()
            .to_lowercase();
        let mailbox = self.mailbox.read().unwrap_or_else(PoisonError::into_inner);
        let hits: Vec<&MailMessage> = mailbox
            .iter()
            .filter(|m| {
                m.subject.to_lowercase().contains(&query) || m.body.to_lowercase().contains(&query)
            })
            .collect();
        TaskResult::success(
            format!("Found {} email(s)", hits.len()),
            json!({ "messages": hits }),
        )
    }
}

#[async_trait]
impl Adapter for GmailAdapter {
    fn info(&self) -> AdapterInfo {
        AdapterInfo {
            tool: TOOL.to_string(),
            name: "Gmail".to_string(),
            description: "Send, read and search email".to_string(),
            intents: vec![
                IntentInfo::new("send", "Send an email", &["to", "subject", "body"]),
                IntentInfo::new("read", "Read one email by id", &["message_id"]),
                IntentInfo::new("search", "Search sent email", &["query"]),
            ],
        }
    }

    async fn execute(
        &self,
        intent: &TaskIntent,
        cancel: CancellationToken,
    ) -> Result<TaskResult, AdapterError> {
        if let Err(e) = self.validate(intent) {
            return Ok(e.into());
        }
        simulate_latency(self.latency, &cancel).await?;

        let result = match intent.intent.to_ascii_lowercase().as_str() {
            "send" => self.send(intent),
            "read" => self.read(intent),
            "search" => self.search(intent),
            _ => TaskError::unsupported_intent(TOOL, &intent.intent).into(),
        };
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentry_core::{AgentId, UserId};

    fn intent(verb: &str) -> TaskIntent {
        TaskIntent::new(AgentId::new(), UserId::new(), TOOL, verb)
    }

    async fn run(adapter: &GmailAdapter, intent: TaskIntent) -> TaskResult {
        adapter
            .execute(&intent, CancellationToken::new())
            .await
            .expect("adapter error")
    }

    #[tokio::test]
    async fn send_without_recipient_is_validation_failure() {
        let adapter = GmailAdapter::new();
        let result = run(
            &adapter,
            intent("send")
                .with_context("subject", json!("Hi"))
                .with_context("body", json!("Hello")),
        )
        .await;

        assert!(!result.success);
        assert!(result.message.contains("Missing required fields"));
        assert_eq!(
            result.error.map(|e| e.code),
            Some(ErrorCode::ValidationError)
        );
        assert_eq!(adapter.sent_count(), 0);
    }

    #[tokio::test]
    async fn sent_message_can_be_read_and_searched() {
        let adapter = GmailAdapter::new();
        let sent = run(
            &adapter,
            intent("send")
                .with_context("to", json!("ada@example.com"))
                .with_context("subject", json!("Quarterly report"))
                .with_context("body", json!("Numbers attached")),
        )
        .await;
        assert!(sent.success);
        let message_id = sent.data.as_ref().expect("data")["message_id"]
            .as_str()
            .expect("id")
            .to_string();

        let read = run(
            &adapter,
            intent("read").with_context("message_id", json!(message_id)),
        )
        .await;
        assert!(read.success);
        assert_eq!(read.data.expect("data")["to"], "ada@example.com");

        let found = run(&adapter, intent("search").with_context("query", json!("QUARTERLY"))).await;
        assert_eq!(found.data.expect("data")["messages"].as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn reading_unknown_message_is_not_retryable() {
        let adapter = GmailAdapter::new();
        let result = run(
            &adapter,
            intent("read").with_context("message_id", json!("msg_nope")),
        )
        .await;
        assert!(!result.is_retryable());
        let error = result.error.expect("error");
        assert_eq!(error.code, ErrorCode::ValidationError);
        assert_eq!(error.details, Some(json!({ "status": 404 })));
        assert!(error.message.contains("msg_nope"));
    }

    #[tokio::test]
    async fn unsupported_intent_does_not_throw() {
        let adapter = GmailAdapter::new();
        let result = run(&adapter, intent("archive")).await;
        assert!(!result.success);
        assert!(result.message.contains("Unsupported intent"));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_send_has_no_side_effect() {
        let adapter = GmailAdapter::new().with_latency(Duration::from_secs(5));
        let token = CancellationToken::new();
        token.cancel();
        let outcome = adapter
            .execute(
                &intent("send")
                    .with_context("to", json!("a@b.c"))
                    .with_context("subject", json!("s"))
                    .with_context("body", json!("b")),
                token,
            )
            .await;
        assert_eq!(outcome, Err(AdapterError::Cancelled));
        assert_eq!(adapter.sent_count(), 0);
    }
}
