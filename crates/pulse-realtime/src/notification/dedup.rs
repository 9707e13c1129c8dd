//! Suppression of re-delivered push messages within a time window.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

/// Entries kept before old ones are swept.
const SWEEP_THRESHOLD: usize = 256;

/// Remembers recently seen message keys.
#[derive(Debug)]
pub struct MessageDeduplicator {
    /// Window duration
    window: Duration,
    /// Last seen time per key
    last_seen: Mutex<HashMap<String, Instant>>,
}

impl MessageDeduplicator {
    /// Create a deduplicator with the given window.
    pub fn new(window_ms: u64) -> Self {
        Self {
            window: Duration::from_millis(window_ms),
            last_seen: Mutex::new(HashMap::new()),
        }
    }

    /// Returns `true` if a message with `key` should be delivered, `false`
    /// if the same key was seen inside the window.
    pub fn should_deliver(&self, key: &str) -> bool {
        let mut map = self.last_seen.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();

        if let Some(last) = map.get(key) {
            if now.duration_since(*last) < self.window {
                return false;
            }
        }

        if map.len() >= SWEEP_THRESHOLD {
            let window = self.window;
            map.retain(|_, seen| now.duration_since(*seen) < window);
        }
        map.insert(key.to_string(), now);
        true
    }

    /// Number of remembered keys.
    pub fn len(&self) -> usize {
        self.last_seen.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Whether no key is remembered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
