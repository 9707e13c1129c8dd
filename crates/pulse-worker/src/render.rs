//! Payload to notification mapping and a log-backed renderer.

use serde::Serialize;
use serde_json::{Map, Value};

use pulse_core::config::WorkerConfig;
use pulse_core::result::AppResult;
use pulse_core::traits::{NotificationRenderer, RenderOptions};
use pulse_core::types::InboundMessage;

/// What the user sees for one background delivery.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedNotification {
    /// Title line.
    pub title: String,
    /// Body text.
    pub body: String,
    /// Icon URL.
    pub icon: String,
    /// Application data forwarded to the click handler.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
}

impl RenderedNotification {
    /// Fill in what the message leaves out from the worker defaults.
    pub fn from_message(message: InboundMessage, config: &WorkerConfig) -> Self {
        let title = if message.title.trim().is_empty() {
            config.default_title.clone()
        } else {
            message.title
        };
        let icon = message
            .icon
            .filter(|icon| !icon.trim().is_empty())
            .unwrap_or_else(|| config.default_icon.clone());

        Self {
            title,
            body: message.body,
            icon,
            data: message.data,
        }
    }

    /// Options handed to the renderer.
    pub fn options(&self) -> RenderOptions {
        RenderOptions {
            icon: self.icon.clone(),
            data: self.data.clone(),
        }
    }
}

/// Renderer for headless hosts: writes each notification to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogRenderer;

impl NotificationRenderer for LogRenderer {
    fn show(&self, title: &str, body: &str, options: &RenderOptions) -> AppResult<()> {
        tracing::info!(
            "System notification '{}' [{}]: {}",
            title,
            options.icon,
            body
        );
        Ok(())
    }
}
