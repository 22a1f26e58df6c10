//! Context mapping records.

use agentry_core::{AgentId, ContextMappingId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

fn normalize_tool(tool: &str) -> String {
    tool.trim().to_ascii_lowercase()
}

/// The unique key of a mapping.
///
/// Tool names are compared case-insensitively; context keys are exact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MappingKey {
    pub user_id: UserId,
    pub agent_id: AgentId,
    pub tool: String,
    pub context_key: String,
}

impl MappingKey {
    /// Creates a key, normalizing the tool name.
    #[must_use]
    pub fn new(
        user_id: UserId,
        agent_id: AgentId,
        tool: &str,
        context_key: impl Into<String>,
    ) -> Self {
        Self {
            user_id,
            agent_id,
            tool: normalize_tool(tool),
            context_key: context_key.into(),
        }
    }
}

impl fmt::Display for MappingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.user_id, self.agent_id, self.tool, self.context_key
        )
    }
}

/// Association between an agent's context key and an external identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextMapping {
    pub id: ContextMappingId,
    pub agent_id: AgentId,
    pub user_id: UserId,
    /// Lowercased tool name.
    pub tool: String,
    pub context_key: String,
    pub external_id: String,
    pub friendly_name: Option<String>,
    pub metadata: Option<JsonValue>,
    /// After this instant the mapping no longer resolves.
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContextMapping {
    /// Builds a stored mapping from creation fields.
    #[must_use]
    pub fn from_new(new: NewContextMapping, now: DateTime<Utc>) -> Self {
        Self {
            id: ContextMappingId::new(),
            agent_id: new.agent_id,
            user_id: new.user_id,
            tool: normalize_tool(&new.tool),
            context_key: new.context_key,
            external_id: new.external_id,
            friendly_name: new.friendly_name,
            metadata: new.metadata,
            expires_at: new.expires_at,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns the unique key of this mapping.
    #[must_use]
    pub fn key(&self) -> MappingKey {
        MappingKey::new(
            self.user_id,
            self.agent_id,
            &self.tool,
            self.context_key.clone(),
        )
    }

    /// Returns whether the mapping has expired at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

/// Fields for creating a mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewContextMapping {
    pub agent_id: AgentId,
    pub user_id: UserId,
    pub tool: String,
    pub context_key: String,
    pub external_id: String,
    #[serde(default)]
    pub friendly_name: Option<String>,
    #[serde(default)]
    pub metadata: Option<JsonValue>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
}

impl NewContextMapping {
    /// Creates mapping fields without optional attributes.
    #[must_use]
    pub fn new(
        user_id: UserId,
        agent_id: AgentId,
        tool: impl Into<String>,
        context_key: impl Into<String>,
        external_id: impl Into<String>,
    ) -> Self {
        Self {
            agent_id,
            user_id,
            tool: tool.into(),
            context_key: context_key.into(),
            external_id: external_id.into(),
            friendly_name: None,
            metadata: None,
            expires_at: None,
        }
    }

    /// Sets a human-readable name.
    #[must_use]
    pub fn with_friendly_name(mut self, name: impl Into<String>) -> Self {
        self.friendly_name = Some(name.into());
        self
    }

    /// Sets free-form metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: JsonValue) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Sets the expiry instant.
    #[must_use]
    pub fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Returns the names of empty required fields.
    #[must_use]
    pub fn blank_fields(&self) -> Vec<&'static str> {
        [
            ("tool", &self.tool),
            ("context_key", &self.context_key),
            ("external_id", &self.external_id),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

/// Partial update of a mapping.
///
/// The key fields (user, agent, tool, context key) are not patchable. For the
/// nullable attributes, `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingPatch {
    #[serde(default)]
    pub external_id: Option<String>,
    #[serde(default)]
    pub friendly_name: Option<Option<String>>,
    #[serde(default)]
    pub metadata: Option<Option<JsonValue>>,
    #[serde(default)]
    pub expires_at: Option<Option<DateTime<Utc>>>,
}

impl MappingPatch {
    /// Returns whether the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.external_id.is_none()
            && self.friendly_name.is_none()
            && self.metadata.is_none()
            && self.expires_at.is_none()
    }

    /// Applies the patch and bumps `updated_at`.
    pub fn apply(self, mapping: &mut ContextMapping, now: DateTime<Utc>) {
        if let Some(external_id) = self.external_id {
            mapping.external_id = external_id;
        }
        if let Some(friendly_name) = self.friendly_name {
            mapping.friendly_name = friendly_name;
        }
        if let Some(metadata) = self.metadata {
            mapping.metadata = metadata;
        }
        if let Some(expires_at) = self.expires_at {
            mapping.expires_at = expires_at;
        }
        mapping.updated_at = now;
    }
}
