//! User-facing fallback messages.
//!
//! Users never see raw error text. Each tool has one static message, which
//! deployments may override.

use std::collections::HashMap;

const GENERIC: &str = "Something went wrong. Please try again later.";

/// Tool-keyed fallback messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FallbackMessages {
    overrides: HashMap<String, String>,
}

impl FallbackMessages {
    /// Creates the default message set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a message set with per-tool overrides.
    #[must_use]
    pub fn with_overrides(overrides: HashMap<String, String>) -> Self {
        Self {
            overrides: overrides
                .into_iter()
                .map(|(tool, message)| (tool.trim().to_ascii_lowercase(), message))
                .collect(),
        }
    }

    /// Returns the message for a tool.
    #[must_use]
    pub fn message_for(&self, tool: &str) -> String {
        let tool = tool.trim().to_ascii_lowercase();
        if let Some(message) = self.overrides.get(&tool) {
            return message.clone();
        }
        match display_name(&tool) {
            Some(name) => format!("Something went wrong with {name}. Please try again later."),
            None => GENERIC.to_string(),
        }
    }
}

fn display_name(tool: &str) -> Option<String> {
    match tool {
        "" => None,
        "gmail" => Some("Gmail".to_string()),
        "notion" => Some("Notion".to_string()),
        "github" => Some("GitHub".to_string()),
        other => {
            let mut chars = other.chars();
            chars
                .next()
                .map(|first| first.to_uppercase().chain(chars).collect())
        }
    }
}
