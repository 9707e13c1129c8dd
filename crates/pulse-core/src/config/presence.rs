//! Presence channel configuration.

use serde::{Deserialize, Serialize};

use super::retry::RetryConfig;

/// Presence channel settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceConfig {
    /// Prefix of the remote presence key; users live at `{prefix}/{user_id}`.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// Backoff used when a live listener drops and must be reopened.
    #[serde(default)]
    pub resubscribe: RetryConfig,
}

impl PresenceConfig {
    /// Remote key holding the presence value for a user.
    pub fn key_for(&self, user_id: &str) -> String {
        format!("{}/{}", self.key_prefix, user_id)
    }
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            key_prefix: default_key_prefix(),
            resubscribe: RetryConfig::default(),
        }
    }
}

fn default_key_prefix() -> String {
    "status".to_string()
}
