//! Application configuration schemas.
//!
//! All configuration structs are deserialized via the `config` crate from
//! layered TOML files and `PULSE__*` environment variables. Each sub-module
//! represents a logical configuration section, and every field has a
//! default so an empty configuration is valid.

pub mod logging;
pub mod notifications;
pub mod presence;
pub mod retry;
pub mod worker;

use serde::{Deserialize, Serialize};

pub use self::logging::LoggingConfig;
pub use self::notifications::NotificationsConfig;
pub use self::presence::PresenceConfig;
pub use self::retry::RetryConfig;
pub use self::worker::WorkerConfig;

use crate::error::AppError;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Presence channel settings.
    #[serde(default)]
    pub presence: PresenceConfig,
    /// Notification gateway settings.
    #[serde(default)]
    pub notifications: NotificationsConfig,
    /// Background worker settings.
    #[serde(default)]
    pub worker: WorkerConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges `config/default` with the `config/{env}` overlay and
    /// environment variables prefixed with `PULSE__`.
    pub fn load(env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("PULSE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))
    }

    /// Parse configuration from an inline TOML document.
    pub fn from_toml(source: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()?;
        Ok(config.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AppConfig::from_toml("").expect("empty config");
        assert_eq!(config.presence.key_prefix, "status");
        assert_eq!(config.notifications.event_name, "notification:received");
        assert_eq!(config.notifications.prompt_delay_ms, 3000);
        assert_eq!(config.worker.default_icon, "/logo192.png");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_sections_override() {
        let config = AppConfig::from_toml(
            r#"
            [presence]
            key_prefix = "presence"

            [presence.resubscribe]
            max_attempts = 2

            [notifications]
            backend_url = "https://api.example.test/push-tokens"
            token_refresh_interval_seconds = 0
            "#,
        )
        .expect("config");

        assert_eq!(config.presence.key_prefix, "presence");
        assert_eq!(config.presence.resubscribe.max_attempts, 2);
        assert_eq!(config.presence.resubscribe.base_delay_ms, 500);
        assert_eq!(
            config.notifications.backend_url.as_deref(),
            Some("https://api.example.test/push-tokens")
        );
        assert_eq!(config.notifications.token_refresh_interval_seconds, 0);
        assert_eq!(config.notifications.token_retry.max_attempts, 5);
    }
}
