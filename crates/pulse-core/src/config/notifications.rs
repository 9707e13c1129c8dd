//! Notification gateway configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::retry::RetryConfig;

/// Notification gateway settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// Event bus event name used for foreground deliveries.
    #[serde(default = "default_event_name")]
    pub event_name: String,
    /// Backoff for token acquisition and registration.
    #[serde(default = "default_token_retry")]
    pub token_retry: RetryConfig,
    /// How often the token is re-read to detect rotation. `0` disables.
    #[serde(default = "default_refresh_interval")]
    pub token_refresh_interval_seconds: u64,
    /// Delay after mount before a permission prompt may be shown.
    #[serde(default = "default_prompt_delay")]
    pub prompt_delay_ms: u64,
    /// Window in which a re-delivered foreground message is suppressed.
    #[serde(default = "default_dedup_window")]
    pub dedup_window_ms: u64,
    /// Token registration endpoint on the application backend.
    #[serde(default)]
    pub backend_url: Option<String>,
}

impl NotificationsConfig {
    /// Prompt delay as a [`Duration`].
    pub fn prompt_delay(&self) -> Duration {
        Duration::from_millis(self.prompt_delay_ms)
    }

    /// Token refresh interval, if rotation polling is enabled.
    pub fn token_refresh_interval(&self) -> Option<Duration> {
        (self.token_refresh_interval_seconds > 0)
            .then(|| Duration::from_secs(self.token_refresh_interval_seconds))
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            event_name: default_event_name(),
            token_retry: default_token_retry(),
            token_refresh_interval_seconds: default_refresh_interval(),
            prompt_delay_ms: default_prompt_delay(),
            dedup_window_ms: default_dedup_window(),
            backend_url: None,
        }
    }
}

fn default_event_name() -> String {
    "notification:received".to_string()
}

fn default_token_retry() -> RetryConfig {
    RetryConfig::new(5, 1_000, 60_000)
}

fn default_refresh_interval() -> u64 {
    3600
}

fn default_prompt_delay() -> u64 {
    3000
}

fn default_dedup_window() -> u64 {
    2000
}
