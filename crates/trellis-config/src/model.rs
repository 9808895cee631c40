//! Configuration schema for Trellis.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default user-visible denial text shared by every gate variant.
pub const DEFAULT_DENIAL_MESSAGE: &str =
    "You are not authorized to perform this action. If you believe this is a mistake, contact your administrator.";

/// Root config for the Trellis SDK.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TrellisConfig {
    #[serde(default, rename = "$schema")]
    pub schema: Option<String>,
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub denial: DenialConfig,
}

impl TrellisConfig {
    /// Start building a config programmatically with defaults applied.
    pub fn builder() -> TrellisConfigBuilder {
        TrellisConfigBuilder::new()
    }
}

/// Builder for assembling a `TrellisConfig` in code.
#[derive(Debug, Default, Clone)]
pub struct TrellisConfigBuilder {
    config: TrellisConfig,
}

impl TrellisConfigBuilder {
    /// Create a new builder seeded with default config values.
    pub fn new() -> Self {
        Self {
            config: TrellisConfig::default(),
        }
    }

    /// Replace the policy engine configuration.
    pub fn policy(mut self, policy: PolicyConfig) -> Self {
        self.config.policy = policy;
        self
    }

    /// Replace the retrieval configuration.
    pub fn retrieval(mut self, retrieval: RetrievalConfig) -> Self {
        self.config.retrieval = retrieval;
        self
    }

    /// Replace the history persistence configuration.
    pub fn history(mut self, history: HistoryConfig) -> Self {
        self.config.history = history;
        self
    }

    /// Replace the denial messaging configuration.
    pub fn denial(mut self, denial: DenialConfig) -> Self {
        self.config.denial = denial;
        self
    }

    /// Finalize and return the built `TrellisConfig`.
    pub fn build(self) -> TrellisConfig {
        self.config
    }
}

/// Connection settings for the relationship store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Base API URL of the store.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Store identifier.
    #[serde(default)]
    pub store_id: String,
    /// Pinned authorization model, when set.
    #[serde(default)]
    pub authorization_model_id: Option<String>,
    /// Bearer token for the store API.
    #[serde(default)]
    pub api_token: Option<String>,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            store_id: String::new(),
            authorization_model_id: None,
            api_token: None,
        }
    }
}

fn default_api_url() -> String {
    "http://localhost:8080".to_string()
}

/// Retrieval filtering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Maximum candidates requested from the inner retriever.
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Relation checked per candidate document.
    #[serde(default = "default_document_relation")]
    pub relation: String,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            relation: default_document_relation(),
        }
    }
}

fn default_top_k() -> usize {
    10
}

fn default_document_relation() -> String {
    "can_view".to_string()
}

/// Chat history persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct HistoryConfig {
    /// Root directory for session rollouts; platform data dir when unset.
    #[serde(default)]
    pub root: Option<PathBuf>,
}

/// Denial messaging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DenialConfig {
    /// User-visible text returned on every gate denial.
    #[serde(default = "default_denial_message")]
    pub message: String,
}

impl Default for DenialConfig {
    fn default() -> Self {
        Self {
            message: default_denial_message(),
        }
    }
}

fn default_denial_message() -> String {
    DEFAULT_DENIAL_MESSAGE.to_string()
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_DENIAL_MESSAGE, PolicyConfig, TrellisConfig};
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_fill_every_section() {
        let config: TrellisConfig = serde_json::from_str("{}").expect("empty config");
        assert_eq!(config.policy.api_url, "http://localhost:8080");
        assert_eq!(config.retrieval.top_k, 10);
        assert_eq!(config.retrieval.relation, "can_view");
        assert_eq!(config.denial.message, DEFAULT_DENIAL_MESSAGE);
        assert_eq!(config.history.root, None);
    }

    #[test]
    fn builder_overrides_sections() {
        let config = TrellisConfig::builder()
            .policy(PolicyConfig {
                store_id: "store-1".to_string(),
                ..PolicyConfig::default()
            })
            .build();
        assert_eq!(config.policy.store_id, "store-1");
        assert_eq!(config.retrieval.top_k, 10);
    }
}
