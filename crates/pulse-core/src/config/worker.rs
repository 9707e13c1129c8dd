//! Background worker configuration.

use serde::{Deserialize, Serialize};

/// Background worker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Icon used when a payload does not carry one.
    #[serde(default = "default_icon")]
    pub default_icon: String,
    /// Title used when a payload does not carry one.
    #[serde(default = "default_title")]
    pub default_title: String,
    /// Capacity of the delivery queue feeding the worker.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            default_icon: default_icon(),
            default_title: default_title(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

fn default_icon() -> String {
    "/logo192.png".to_string()
}

fn default_title() -> String {
    "New notification".to_string()
}

fn default_queue_capacity() -> usize {
    64
}
