//! The context mapping service.
//!
//! Expired mappings are treated as absent by every lookup but stay in the
//! store until [`ContextMapper::purge_expired`] sweeps them.

use crate::error::ContextError;
use crate::mapping::{ContextMapping, MappingPatch, NewContextMapping};
use crate::store::{InMemoryMappingStore, MappingStore};
use agentry_core::{AgentId, ContextMappingId, UserId};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Resolves agent context keys to external identifiers and back.
#[derive(Clone)]
pub struct ContextMapper {
    store: Arc<dyn MappingStore>,
}

impl std::fmt::Debug for ContextMapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContextMapper").finish_non_exhaustive()
    }
}

impl ContextMapper {
    /// Creates a mapper over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn MappingStore>) -> Self {
        Self { store }
    }

    /// Creates a mapper over a fresh in-memory store.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryMappingStore::new()))
    }

    /// Creates a mapping.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::Conflict`] if the key is already mapped and
    /// [`ContextError::InvalidMapping`] if a required field is blank.
    #[instrument(skip(self, mapping), fields(agent = %mapping.agent_id, tool = %mapping.tool))]
    pub async fn create_mapping(
        &self,
        mapping: NewContextMapping,
    ) -> Result<ContextMappingId, ContextError> {
        ensure_complete(&mapping)?;
        let mapping = ContextMapping::from_new(mapping, Utc::now());
        let id = mapping.id;
        self.store.insert(mapping).await?;
        debug!(mapping_id = %id, "context mapping created");
        Ok(id)
    }

    /// Live mappings for one agent and tool.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn list_mappings(
        &self,
        agent_id: AgentId,
        tool: &str,
    ) -> Result<Vec<ContextMapping>, ContextError> {
        let now = Utc::now();
        let mappings = self.store.list(agent_id, &normalize(tool)).await?;
        Ok(mappings.into_iter().filter(|m| !m.is_expired(now)).collect())
    }

    /// Resolves a context key to its external identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails. An unknown or expired key is
    /// `Ok(None)`.
    pub async fn get_external_id(
        &self,
        agent_id: AgentId,
        tool: &str,
        context_key: &str,
    ) -> Result<Option<String>, ContextError> {
        let now = Utc::now();
        let mapping = self
            .store
            .find_by_context_key(agent_id, &normalize(tool), context_key)
            .await?;
        Ok(mapping
            .filter(|m| !m.is_expired(now))
            .map(|m| m.external_id))
    }

    /// Resolves an external identifier to the context key that maps to it.
    ///
    /// When several keys map to the same identifier the oldest live one wins.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn get_context_key(
        &self,
        agent_id: AgentId,
        tool: &str,
        external_id: &str,
    ) -> Result<Option<String>, ContextError> {
        let now = Utc::now();
        let mappings = self
            .store
            .find_by_external_id(agent_id, &normalize(tool), external_id)
            .await?;
        Ok(mappings
            .into_iter()
            .find(|m| !m.is_expired(now))
            .map(|m| m.context_key))
    }

    /// Gets a live mapping by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn get_mapping(
        &self,
        id: ContextMappingId,
    ) -> Result<Option<ContextMapping>, ContextError> {
        let now = Utc::now();
        Ok(self.store.get(id).await?.filter(|m| !m.is_expired(now)))
    }

    /// Applies a patch. Returns false if the mapping does not exist.
    ///
    /// Expired rows that have not been purged can still be patched, which is
    /// how a caller extends an expiry.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    #[instrument(skip(self, patch))]
    pub async fn update_mapping(
        &self,
        id: ContextMappingId,
        patch: MappingPatch,
    ) -> Result<bool, ContextError> {
        let Some(mut mapping) = self.store.get(id).await? else {
            return Ok(false);
        };
        if patch.is_empty() {
            return Ok(true);
        }
        patch.apply(&mut mapping, Utc::now());
        self.store.update(mapping).await
    }

    /// Deletes a mapping. Returns false if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    #[instrument(skip(self))]
    pub async fn delete_mapping(&self, id: ContextMappingId) -> Result<bool, ContextError> {
        self.store.delete(id).await
    }

    /// Inserts or updates a batch of mappings owned by `user_id`.
    ///
    /// Every entry is stamped with `user_id`. An entry whose key already
    /// exists overwrites that row instead of duplicating it. Blank entries
    /// and entries for agents owned by another user are rejected before
    /// anything is written.
    ///
    /// # Errors
    ///
    /// Returns [`ContextError::InvalidMapping`] if an entry is incomplete,
    /// [`ContextError::OwnerMismatch`] if an agent belongs to another user,
    /// or an error if the store fails.
    #[instrument(skip(self, entries), fields(entries = entries.len()))]
    pub async fn bulk_upsert_mappings(
        &self,
        user_id: UserId,
        entries: Vec<NewContextMapping>,
    ) -> Result<usize, ContextError> {
        entries.iter().try_for_each(ensure_complete)?;
        let mut agents: Vec<AgentId> = entries.iter().map(|e| e.agent_id).collect();
        agents.sort_by_key(AgentId::as_ulid);
        agents.dedup();
        for agent_id in agents {
            if let Some(owner) = self.store.owner(agent_id).await? {
                if owner != user_id {
                    return Err(ContextError::OwnerMismatch {
                        agent_id,
                        owner,
                        user_id,
                    });
                }
            }
        }

        let now = Utc::now();
        let mut count = 0;
        for entry in entries {
            let mapping = ContextMapping::from_new(NewContextMapping { user_id, ..entry }, now);
            self.store.upsert(mapping).await?;
            count += 1;
        }
        info!(count, "context mappings upserted");
        Ok(count)
    }

    /// Removes mappings expired at `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    #[instrument(skip(self))]
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, ContextError> {
        let removed = self.store.delete_expired(now).await?;
        if removed > 0 {
            info!(removed, "expired context mappings purged");
        }
        Ok(removed)
    }
}

fn normalize(tool: &str) -> String {
    tool.trim().to_ascii_lowercase()
}

fn ensure_complete(mapping: &NewContextMapping) -> Result<(), ContextError> {
    let blank = mapping.blank_fields();
    if blank.is_empty() {
        Ok(())
    } else {
        Err(ContextError::InvalidMapping {
            reason: format!("blank fields: {}", blank.join(", ")),
        })
    }
}
