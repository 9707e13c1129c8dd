//! Background notification handler.

use std::sync::Arc;

use serde_json::Value;

use pulse_core::config::WorkerConfig;
use pulse_core::error::AppError;
use pulse_core::traits::NotificationRenderer;
use pulse_core::types::InboundMessage;

use crate::render::RenderedNotification;

/// Error from a background delivery.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// The renderer refused the notification.
    #[error("Failed to render notification: {0}")]
    Render(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(#[from] AppError),
}

/// Renders background push messages as system notifications.
///
/// Malformed payloads are not dropped: whatever can be read is shown, and
/// the rest comes from the worker defaults.
#[derive(Debug)]
pub struct BackgroundNotificationHandler {
    /// System notification primitive.
    renderer: Arc<dyn NotificationRenderer>,
    /// Fallback title and icon.
    config: WorkerConfig,
}

impl BackgroundNotificationHandler {
    /// Create a handler.
    pub fn new(renderer: Arc<dyn NotificationRenderer>, config: WorkerConfig) -> Self {
        Self { renderer, config }
    }

    /// Decode `payload` and show it. Returns what was shown.
    pub fn handle(&self, payload: &Value) -> Result<RenderedNotification, DeliveryError> {
        let message = match InboundMessage::from_value(payload) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!("Background push payload unreadable, using defaults: {}", e);
                InboundMessage::default()
            }
        };
        if !message.is_complete() {
            tracing::warn!(
                "Background push message missing {:?}, filling from defaults",
                message.missing_fields()
            );
        }

        let rendered = RenderedNotification::from_message(message, &self.config);
        self.renderer
            .show(&rendered.title, &rendered.body, &rendered.options())
            .map_err(|e| DeliveryError::Render(e.to_string()))?;

        tracing::debug!("Rendered background notification '{}'", rendered.title);
        Ok(rendered)
    }
}
