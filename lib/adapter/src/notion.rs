//! Simulated Notion adapter.

use crate::adapter::{Adapter, AdapterInfo, IntentInfo, simulate_latency};
use crate::error::AdapterError;
use crate::intent::TaskIntent;
use crate::result::{TaskError, TaskResult};
use agentry_core::ErrorCode;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value as JsonValue, json};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use ulid::Ulid;

/// Tool identifier.
pub const TOOL: &str = "notion";

#[derive(Debug, Clone, Serialize)]
struct Page {
    page_id: String,
    parent_id: String,
    title: String,
    content: JsonValue,
    created_at: DateTime<Utc>,
    last_edited_at: DateTime<Utc>,
}

/// Mock Notion adapter backed by an in-memory page table.
#[derive(Debug, Default)]
pub struct NotionAdapter {
    pages: RwLock<HashMap<String, Page>>,
    latency: Duration,
}

impl NotionAdapter {
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

    fn create(&self, intent: &TaskIntent) -> TaskResult {
        let now = Utc::now();
        let page = Page {
            page_id: format!("page_{}", Ulid::new()),
            parent_id: intent.context_str("parent_id").unwrap_or_default().to_string(),
            title: intent.context_str("title").unwrap_or_default().to_string(),
            content: intent.context.get("content").cloned().unwrap_or(JsonValue::Null),
            created_at: now,
            last_edited_at: now,
        };
        let data = json!({
            "page_id": page.page_id,
            "url": format!("https://notion.so/{}", page.page_id),
        });
        debug!(page_id = %page.page_id, "simulated notion create");
        self.pages
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(page.page_id.clone(), page);
        TaskResult::success("Page created", data)
    }

    fn update(&self, intent: &TaskIntent) -> TaskResult {
        let page_id = intent.context_str("page_id").unwrap_or_default();
        let mut pages = self.pages.write().unwrap_or_else(PoisonError::into_inner);
        let Some(page) = pages.get_mut(page_id) else {
            return TaskError::new(ErrorCode::ValidationError, format!("Page not found: {page_id}"))
                .with_details(json!({ "status": 404 }))
                .into();
        };
        if let Some(title) = intent.context_str("title") {
            page.title = title.to_string();
        }
        if let Some(content) = intent.context.get("content") {
            page.content = content.clone();
        }
        page.last_edited_at = Utc::now();
        TaskResult::success("Page updated", json!(page))
    }

    fn query(&self, intent: &TaskIntent) -> TaskResult {
        let database_id = intent.context_str("database_id").unwrap_or_default();
        let pages = self.pages.read().unwrap_or_else(PoisonError::into_inner);
        let mut results: Vec<&Page> = pages
            .values()
            .filter(|p| p.parent_id == database_id)
            .collect();
        results.sort_by_key(|p| p.created_at);
        TaskResult::success(
            format!("Found {} page(s)", results.len()),
            json!({ "results": results }),
        )
    }
}

#[async_trait]
impl Adapter for NotionAdapter {
    fn info(&self) -> AdapterInfo {
        AdapterInfo {
            tool: TOOL.to_string(),
            name: "Notion".to_string(),
            description: "Create, update and query Notion pages".to_string(),
            intents: vec![
                IntentInfo::new("create", "Create a page", &["parent_id", "title"]),
                IntentInfo::new("update", "Update a page", &["page_id"]),
                IntentInfo::new("query", "List pages in a database", &["database_id"]),
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
            "create" => self.create(intent),
            "update" => self.update(intent),
            "query" => self.query(intent),
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

    async fn run(adapter: &NotionAdapter, intent: TaskIntent) -> TaskResult {
        adapter
            .execute(&intent, CancellationToken::new())
            .await
            .expect("adapter error")
    }

    #[tokio::test]
    async fn created_page_shows_up_in_query_and_can_be_updated() {
        let adapter = NotionAdapter::new();
        let created = run(
            &adapter,
            intent("create")
                .with_context("parent_id", json!("db_tasks"))
                .with_context("title", json!("Draft plan")),
        )
        .await;
        assert!(created.success);
        let page_id = created.data.expect("data")["page_id"]
            .as_str()
            .expect("page id")
            .to_string();

        let updated = run(
            &adapter,
            intent("update")
                .with_context("page_id", json!(page_id))
                .with_context("title", json!("Final plan")),
        )
        .await;
        assert_eq!(updated.data.expect("data")["title"], "Final plan");

        let listed = run(
            &adapter,
            intent("query").with_context("database_id", json!("db_tasks")),
        )
        .await;
        let results = listed.data.expect("data")["results"].clone();
        assert_eq!(results.as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn updating_missing_page_fails_without_error() {
        let adapter = NotionAdapter::new();
        let result = run(&adapter, intent("update").with_context("page_id", json!("page_x"))).await;
        assert!(!result.success);
        assert!(!result.is_retryable());
        assert_eq!(result.error.map(|e| e.code), Some(ErrorCode::ValidationError));
    }

    #[tokio::test]
    async fn create_requires_title() {
        let adapter = NotionAdapter::new();
        let result = run(&adapter, intent("create").with_context("parent_id", json!("db"))).await;
        assert_eq!(result.message, "Missing required fields: title");
    }
}
