//! Adapter registry keyed by tool name.

use crate::adapter::{Adapter, AdapterInfo};
use std::collections::HashMap;
use std::sync::Arc;

/// Stores adapters by their lower-cased tool identifier.
#[derive(Default, Clone)]
pub struct AdapterRegistry {
    adapters: HashMap<String, Arc<dyn Adapter>>,
}

impl AdapterRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an adapter under the tool named in its info, replacing any
    /// adapter previously registered for that tool.
    pub fn register(&mut self, adapter: impl Adapter + 'static) {
        self.register_shared(Arc::new(adapter));
    }

    /// Registers an already shared adapter.
    pub fn register_shared(&mut self, adapter: Arc<dyn Adapter>) {
        let tool = adapter.info().tool.to_ascii_lowercase();
        self.adapters.insert(tool, adapter);
    }

    /// Looks up the adapter for a tool, ignoring case.
    #[must_use]
    pub fn get(&self, tool: &str) -> Option<Arc<dyn Adapter>> {
        self.adapters.get(&tool.to_ascii_lowercase()).cloned()
    }

    /// Returns whether a tool has an adapter.
    #[must_use]
    pub fn contains(&self, tool: &str) -> bool {
        self.adapters.contains_key(&tool.to_ascii_lowercase())
    }

    /// Registered tool identifiers, sorted.
    #[must_use]
    pub fn tools(&self) -> Vec<String> {
        let mut tools: Vec<String> = self.adapters.keys().cloned().collect();
        tools.sort();
        tools
    }

    /// Information for every registered adapter, sorted by tool.
    #[must_use]
    pub fn infos(&self) -> Vec<AdapterInfo> {
        let mut infos: Vec<AdapterInfo> = self.adapters.values().map(|a| a.info()).collect();
        infos.sort_by(|a, b| a.tool.cmp(&b.tool));
        infos
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("tools", &self.tools())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{GmailAdapter, NotionAdapter};

    #[test]
    fn lookup_ignores_case() {
        let mut registry = AdapterRegistry::new();
        registry.register(GmailAdapter::new());

        assert!(registry.get("Gmail").is_some());
        assert!(registry.contains("GMAIL"));
        assert!(registry.get("slack").is_none());
    }

    #[test]
    fn tools_are_sorted() {
        let mut registry = AdapterRegistry::new();
        registry.register(NotionAdapter::new());
        registry.register(GmailAdapter::new());

        assert_eq!(registry.tools(), vec!["gmail", "notion"]);
        assert_eq!(registry.infos()[1].name, "Notion");
    }
}
