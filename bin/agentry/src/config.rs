//! Centralized engine configuration.
//!
//! Loaded via the `config` crate from `AGENTRY_`-prefixed environment
//! variables, with `__` separating nested keys:
//!
//! ```text
//! AGENTRY_ORCHESTRATOR__MAX_RETRIES=5
//! AGENTRY_ORCHESTRATOR__TIMEOUT_SCOPE=per_attempt
//! AGENTRY_FALLBACK_MESSAGES__GMAIL="Gmail is unavailable right now."
//! AGENTRY_LOG_FILTER=debug
//! ```

use agentry_orchestrator::OrchestratorConfig;
use config::{Config, ConfigError, Environment, Source};
use serde::Deserialize;
use std::collections::HashMap;

/// Engine configuration composed from library configs.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EngineConfig {
    /// Retry, timeout and ledger settings.
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,

    /// Per-tool overrides of the user-facing fallback messages.
    #[serde(default)]
    pub fallback_messages: HashMap<String, String>,

    /// Tracing filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            orchestrator: OrchestratorConfig::default(),
            fallback_messages: HashMap::new(),
            log_filter: default_log_filter(),
        }
    }
}

impl EngineConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed into its field.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(
            Environment::with_prefix("AGENTRY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
    }

    fn from_source<S>(source: S) -> Result<Self, ConfigError>
    where
        S: Source + Send + Sync + 'static,
    {
        Config::builder()
            .add_source(source)
            .build()?
            .try_deserialize()
    }
}
