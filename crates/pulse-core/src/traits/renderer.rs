//! System notification rendering primitive (background context only).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::result::AppResult;

/// Options passed alongside title and body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderOptions {
    /// Icon URL shown with the notification.
    pub icon: String,
    /// Application data attached to the notification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
}

/// Displays a system-level notification.
pub trait NotificationRenderer: Send + Sync + std::fmt::Debug + 'static {
    /// Show a notification.
    fn show(&self, title: &str, body: &str, options: &RenderOptions) -> AppResult<()>;
}
