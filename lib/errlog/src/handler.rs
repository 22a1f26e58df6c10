//! The error handler service.

use crate::error::ErrorLogError;
use crate::fallback::FallbackMessages;
use crate::log::{ErrorLog, NewErrorLog};
use crate::store::{ErrorLogStore, InMemoryErrorLogStore};
use agentry_core::{AgentId, ErrorLogId};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Records tool failures and answers with user-safe messages.
#[derive(Clone)]
pub struct ErrorHandler {
    store: Arc<dyn ErrorLogStore>,
    fallbacks: FallbackMessages,
}

impl std::fmt::Debug for ErrorHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorHandler")
            .field("fallbacks", &self.fallbacks)
            .finish_non_exhaustive()
    }
}

impl ErrorHandler {
    /// Creates a handler over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn ErrorLogStore>, fallbacks: FallbackMessages) -> Self {
        Self { store, fallbacks }
    }

    /// Creates a handler over a fresh in-memory store with default messages.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryErrorLogStore::new()), FallbackMessages::new())
    }

    /// Logs a failure and returns its ID.
    ///
    /// The code is normalized; codes outside the registry are kept verbatim
    /// and reported with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    #[instrument(
        skip(self, error),
        fields(agent = %error.agent_id, tool = %error.tool, action = %error.action)
    )]
    pub async fn log_error(&self, error: NewErrorLog) -> Result<ErrorLogId, ErrorLogError> {
        let log = error.into_log();
        if !log.error_code.is_known() {
            warn!(code = %log.error_code, "unrecognized error code");
        }
        let id = log.id;
        info!(
            error_id = %id,
            code = %log.error_code,
            message = %log.error_message,
            "tool failure logged"
        );
        self.store.insert(log).await?;
        Ok(id)
    }

    /// Gets one logged failure.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorLogError::NotFound`] if no such record exists.
    pub async fn get_error(&self, id: ErrorLogId) -> Result<ErrorLog, ErrorLogError> {
        self.store
            .get(id)
            .await?
            .ok_or(ErrorLogError::NotFound { id })
    }

    /// The most recent failures of an agent, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn get_agent_errors(
        &self,
        agent_id: AgentId,
        limit: usize,
    ) -> Result<Vec<ErrorLog>, ErrorLogError> {
        self.store.list_for_agent(agent_id, limit).await
    }

    /// Unresolved failures of an agent, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn get_unresolved_errors(
        &self,
        agent_id: AgentId,
    ) -> Result<Vec<ErrorLog>, ErrorLogError> {
        self.store.list_unresolved(agent_id).await
    }

    /// Marks a failure as resolved. Resolving twice is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorLogError::NotFound`] if no such record exists.
    #[instrument(skip(self))]
    pub async fn resolve_error(&self, id: ErrorLogId) -> Result<(), ErrorLogError> {
        if self.store.mark_resolved(id).await? {
            debug!("error resolved");
            Ok(())
        } else {
            Err(ErrorLogError::NotFound { id })
        }
    }

    /// The user-facing message for a failure of `tool`.
    ///
    /// The message depends on the tool only, never on the failure itself.
    pub fn get_fallback_message(&self, tool: &str, agent_id: AgentId) -> String {
        debug!(%tool, agent = %agent_id, "fallback message requested");
        self.fallbacks.message_for(tool)
    }
}
