//! Storage seam for context mappings.

use crate::error::ContextError;
use crate::mapping::{ContextMapping, MappingKey};
use agentry_core::{AgentId, ContextMappingId, UserId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

/// Trait for mapping persistence.
///
/// Implementations enforce uniqueness of [`MappingKey`] and that all mappings
/// of an agent share one user. Lookups by agent and tool rely on the latter
/// and do not take a user.
///
/// Writes that would give an agent a second user fail with
/// [`ContextError::OwnerMismatch`].
#[async_trait]
pub trait MappingStore: Send + Sync {
    /// Inserts a mapping, failing with [`ContextError::Conflict`] if its key
    /// is taken.
    async fn insert(&self, mapping: ContextMapping) -> Result<(), ContextError>;

    /// The user owning an agent's mappings, if it has any.
    async fn owner(&self, agent_id: AgentId) -> Result<Option<UserId>, ContextError>;

    /// Gets a mapping by ID.
    async fn get(&self, id: ContextMappingId) -> Result<Option<ContextMapping>, ContextError>;

    /// Finds the mapping for a context key.
    async fn find_by_context_key(
        &self,
        agent_id: AgentId,
        tool: &str,
        context_key: &str,
    ) -> Result<Option<ContextMapping>, ContextError>;

    /// Finds mappings pointing at an external identifier, oldest first.
    async fn find_by_external_id(
        &self,
        agent_id: AgentId,
        tool: &str,
        external_id: &str,
    ) -> Result<Vec<ContextMapping>, ContextError>;

    /// Lists mappings for one agent and tool, oldest first.
    async fn list(&self, agent_id: AgentId, tool: &str)
    -> Result<Vec<ContextMapping>, ContextError>;

    /// Replaces the row with the mapping's ID. Returns false if none exists.
    async fn update(&self, mapping: ContextMapping) -> Result<bool, ContextError>;

    /// Deletes a mapping. Returns false if none exists.
    async fn delete(&self, id: ContextMappingId) -> Result<bool, ContextError>;

    /// Inserts the mapping, or overwrites the mutable fields of the row with
    /// the same key while keeping its ID and creation time.
    async fn upsert(&self, mapping: ContextMapping) -> Result<ContextMapping, ContextError>;

    /// Deletes mappings expired at `now`, returning how many were removed.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<usize, ContextError>;
}

#[derive(Debug, Default)]
struct MappingTable {
    rows: HashMap<ContextMappingId, ContextMapping>,
    by_key: HashMap<MappingKey, ContextMappingId>,
}

impl MappingTable {
    fn owner(&self, agent_id: AgentId, except: ContextMappingId) -> Option<UserId> {
        self.rows
            .values()
            .find(|m| m.agent_id == agent_id && m.id != except)
            .map(|m| m.user_id)
    }

    fn check_owner(&self, mapping: &ContextMapping) -> Result<(), ContextError> {
        match self.owner(mapping.agent_id, mapping.id) {
            Some(owner) if owner != mapping.user_id => Err(ContextError::OwnerMismatch {
                agent_id: mapping.agent_id,
                owner,
                user_id: mapping.user_id,
            }),
            _ => Ok(()),
        }
    }

    fn sorted<'a>(rows: impl Iterator<Item = &'a ContextMapping>) -> Vec<ContextMapping> {
        let mut rows: Vec<ContextMapping> = rows.cloned().collect();
        rows.sort_by_key(|m| (m.created_at, m.id.as_ulid()));
        rows
    }
}

/// In-memory [`MappingStore`] with a unique index on [`MappingKey`].
#[derive(Debug, Default)]
pub struct InMemoryMappingStore {
    table: RwLock<MappingTable>,
}

impl InMemoryMappingStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .rows
            .len()
    }

    /// Returns true if the store holds no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl MappingStore for InMemoryMappingStore {
    async fn insert(&self, mapping: ContextMapping) -> Result<(), ContextError> {
        let mut table = self.table.write().unwrap_or_else(PoisonError::into_inner);
        let key = mapping.key();
        if table.by_key.contains_key(&key) {
            return Err(ContextError::Conflict { key });
        }
        table.check_owner(&mapping)?;
        table.by_key.insert(key, mapping.id);
        table.rows.insert(mapping.id, mapping);
        Ok(())
    }

    async fn owner(&self, agent_id: AgentId) -> Result<Option<UserId>, ContextError> {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        Ok(table
            .rows
            .values()
            .find(|m| m.agent_id == agent_id)
            .map(|m| m.user_id))
    }

    async fn get(&self, id: ContextMappingId) -> Result<Option<ContextMapping>, ContextError> {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        Ok(table.rows.get(&id).cloned())
    }

    async fn find_by_context_key(
        &self,
        agent_id: AgentId,
        tool: &str,
        context_key: &str,
    ) -> Result<Option<ContextMapping>, ContextError> {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        Ok(table
            .rows
            .values()
            .find(|m| m.agent_id == agent_id && m.tool == tool && m.context_key == context_key)
            .cloned())
    }

    async fn find_by_external_id(
        &self,
        agent_id: AgentId,
        tool: &str,
        external_id: &str,
    ) -> Result<Vec<ContextMapping>, ContextError> {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        Ok(MappingTable::sorted(table.rows.values().filter(|m| {
            m.agent_id == agent_id && m.tool == tool && m.external_id == external_id
        })))
    }

    async fn list(
        &self,
        agent_id: AgentId,
        tool: &str,
    ) -> Result<Vec<ContextMapping>, ContextError> {
        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        Ok(MappingTable::sorted(
            table
                .rows
                .values()
                .filter(|m| m.agent_id == agent_id && m.tool == tool),
        ))
    }

    async fn update(&self, mapping: ContextMapping) -> Result<bool, ContextError> {
        let mut table = self.table.write().unwrap_or_else(PoisonError::into_inner);
        let Some(existing) = table.rows.get(&mapping.id) else {
            return Ok(false);
        };
        let old_key = existing.key();
        table.check_owner(&mapping)?;
        let new_key = mapping.key();
        if old_key != new_key {
            if table.by_key.contains_key(&new_key) {
                return Err(ContextError::Conflict { key: new_key });
            }
            table.by_key.remove(&old_key);
            table.by_key.insert(new_key, mapping.id);
        }
        table.rows.insert(mapping.id, mapping);
        Ok(true)
    }

    async fn delete(&self, id: ContextMappingId) -> Result<bool, ContextError> {
        let mut table = self.table.write().unwrap_or_else(PoisonError::into_inner);
        match table.rows.remove(&id) {
            Some(removed) => {
                table.by_key.remove(&removed.key());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn upsert(&self, mapping: ContextMapping) -> Result<ContextMapping, ContextError> {
        let mut table = self.table.write().unwrap_or_else(PoisonError::into_inner);
        table.check_owner(&mapping)?;
        let key = mapping.key();
        let existing = table
            .by_key
            .get(&key)
            .copied()
            .and_then(|id| table.rows.get(&id).cloned());

        let stored = match existing {
            Some(existing) => ContextMapping {
                id: existing.id,
                created_at: existing.created_at,
                ..mapping
            },
            None => {
                table.by_key.insert(key, mapping.id);
                mapping
            }
        };
        table.rows.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<usize, ContextError> {
        let mut table = self.table.write().unwrap_or_else(PoisonError::into_inner);
        let expired: Vec<ContextMappingId> = table
            .rows
            .values()
            .filter(|m| m.is_expired(now))
            .map(|m| m.id)
            .collect();
        for id in &expired {
            if let Some(removed) = table.rows.remove(id) {
                table.by_key.remove(&removed.key());
            }
        }
        Ok(expired.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::NewContextMapping;
    use agentry_core::UserId;
    use chrono::Duration;

    fn mapping(user: UserId, agent: AgentId, key: &str, external: &str) -> ContextMapping {
        ContextMapping::from_new(
            NewContextMapping::new(user, agent, "notion", key, external),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn insert_rejects_duplicate_keys() {
        let store = InMemoryMappingStore::new();
        let (user, agent) = (UserId::new(), AgentId::new());
        store
            .insert(mapping(user, agent, "notes", "page_1"))
            .await
            .expect("first insert");

        let err = store
            .insert(mapping(user, agent, "notes", "page_2"))
            .await
            .unwrap_err();
        assert!(matches!(err, ContextError::Conflict { .. }));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn agent_mappings_belong_to_one_user() {
        let store = InMemoryMappingStore::new();
        let (owner, intruder, agent) = (UserId::new(), UserId::new(), AgentId::new());
        store
            .insert(mapping(owner, agent, "notes", "page_owner"))
            .await
            .expect("insert");
        assert_eq!(store.owner(agent).await.expect("owner"), Some(owner));

        let expected = ContextError::OwnerMismatch {
            agent_id: agent,
            owner,
            user_id: intruder,
        };
        let err = store
            .insert(mapping(intruder, agent, "notes", "page_intruder"))
            .await
            .unwrap_err();
        assert_eq!(err, expected);
        let err = store
            .upsert(mapping(intruder, agent, "notes", "page_intruder"))
            .await
            .unwrap_err();
        assert_eq!(err, expected);

        let found = store
            .find_by_context_key(agent, "notion", "notes")
            .await
            .expect("find")
            .expect("exists");
        assert_eq!(found.external_id, "page_owner");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn agent_is_released_once_its_mappings_are_gone() {
        let store = InMemoryMappingStore::new();
        let agent = AgentId::new();
        let first = mapping(UserId::new(), agent, "notes", "page_1");
        store.insert(first.clone()).await.expect("insert");
        assert!(store.delete(first.id).await.expect("delete"));

        assert_eq!(store.owner(agent).await.expect("owner"), None);
        let second_user = UserId::new();
        store
            .insert(mapping(second_user, agent, "notes", "page_2"))
            .await
            .expect("new owner");
        assert_eq!(store.owner(agent).await.expect("owner"), Some(second_user));
    }

    #[tokio::test]
    async fn upsert_keeps_identity_of_existing_row() {
        let store = InMemoryMappingStore::new();
        let (user, agent) = (UserId::new(), AgentId::new());
        let original = mapping(user, agent, "notes", "page_1");
        store.insert(original.clone()).await.expect("insert");

        let stored = store
            .upsert(mapping(user, agent, "notes", "page_9"))
            .await
            .expect("upsert");

        assert_eq!(stored.id, original.id);
        assert_eq!(stored.created_at, original.created_at);
        assert_eq!(stored.external_id, "page_9");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn update_and_delete_report_missing_rows() {
        let store = InMemoryMappingStore::new();
        let row = mapping(UserId::new(), AgentId::new(), "notes", "page_1");

        assert!(!store.update(row.clone()).await.expect("update"));
        assert!(!store.delete(row.id).await.expect("delete"));

        store.insert(row.clone()).await.expect("insert");
        assert!(store.delete(row.id).await.expect("delete"));
        // The key is free again.
        store.insert(row).await.expect("reinsert");
    }

    #[tokio::test]
    async fn delete_expired_frees_keys() {
        let store = InMemoryMappingStore::new();
        let (user, agent) = (UserId::new(), AgentId::new());
        let now = Utc::now();
        let mut stale = mapping(user, agent, "notes", "page_1");
        stale.expires_at = Some(now - Duration::minutes(1));
        store.insert(stale).await.expect("insert");
        store
            .insert(mapping(user, agent, "tasks", "db_1"))
            .await
            .expect("insert");

        assert_eq!(store.delete_expired(now).await.expect("purge"), 1);
        assert_eq!(store.len(), 1);
        store
            .insert(mapping(user, agent, "notes", "page_2"))
            .await
            .expect("key reusable");
    }
}
