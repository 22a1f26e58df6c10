//! Storage seam for error logs.

use crate::error::ErrorLogError;
use crate::log::ErrorLog;
use agentry_core::{AgentId, ErrorLogId};
use async_trait::async_trait;
use std::sync::{PoisonError, RwLock};

/// Trait for error log persistence.
#[async_trait]
pub trait ErrorLogStore: Send + Sync {
    /// Stores a new record.
    async fn insert(&self, log: ErrorLog) -> Result<(), ErrorLogError>;

    /// Gets a record by ID.
    async fn get(&self, id: ErrorLogId) -> Result<Option<ErrorLog>, ErrorLogError>;

    /// Records for an agent, newest first, at most `limit` of them.
    async fn list_for_agent(
        &self,
        agent_id: AgentId,
        limit: usize,
    ) -> Result<Vec<ErrorLog>, ErrorLogError>;

    /// Unresolved records for an agent, newest first.
    async fn list_unresolved(&self, agent_id: AgentId) -> Result<Vec<ErrorLog>, ErrorLogError>;

    /// Sets `resolved`. Returns false if the record does not exist.
    async fn mark_resolved(&self, id: ErrorLogId) -> Result<bool, ErrorLogError>;
}

/// In-memory [`ErrorLogStore`] keeping records in insertion order.
#[derive(Debug, Default)]
pub struct InMemoryErrorLogStore {
    logs: RwLock<Vec<ErrorLog>>,
}

impl InMemoryErrorLogStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn newest_first(&self, filter: impl Fn(&ErrorLog) -> bool) -> Vec<ErrorLog> {
        let logs = self.logs.read().unwrap_or_else(PoisonError::into_inner);
        let mut matching: Vec<ErrorLog> = logs.iter().filter(|log| filter(log)).cloned().collect();
        // Ties keep later inserts first.
        matching.sort_by_key(|log| log.timestamp);
        matching.reverse();
        matching
    }
}

#[async_trait]
impl ErrorLogStore for InMemoryErrorLogStore {
    async fn insert(&self, log: ErrorLog) -> Result<(), ErrorLogError> {
        self.logs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(log);
        Ok(())
    }

    async fn get(&self, id: ErrorLogId) -> Result<Option<ErrorLog>, ErrorLogError> {
        let logs = self.logs.read().unwrap_or_else(PoisonError::into_inner);
        Ok(logs.iter().find(|log| log.id == id).cloned())
    }

    async fn list_for_agent(
        &self,
        agent_id: AgentId,
        limit: usize,
    ) -> Result<Vec<ErrorLog>, ErrorLogError> {
        let mut logs = self.newest_first(|log| log.agent_id == agent_id);
        logs.truncate(limit);
        Ok(logs)
    }

    async fn list_unresolved(&self, agent_id: AgentId) -> Result<Vec<ErrorLog>, ErrorLogError> {
        Ok(self.newest_first(|log| log.agent_id == agent_id && !log.resolved))
    }

    async fn mark_resolved(&self, id: ErrorLogId) -> Result<bool, ErrorLogError> {
        let mut logs = self.logs.write().unwrap_or_else(PoisonError::into_inner);
        match logs.iter_mut().find(|log| log.id == id) {
            Some(log) => {
                log.resolved = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
