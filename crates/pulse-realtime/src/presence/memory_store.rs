//! In-memory presence store for single-process deployments.
//!
//! Behaves like the remote store: a listener receives the current value as
//! soon as it opens and every change afterwards, and `None` when the key is
//! deleted.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::Value;
use tokio::sync::mpsc;

use pulse_core::error::AppError;
use pulse_core::result::AppResult;
use pulse_core::traits::{ListenerId, PresenceStore, RemoteListener};

#[derive(Debug)]
struct Listener {
    key: String,
    tx: mpsc::UnboundedSender<Option<Value>>,
}

/// Process-local presence store.
#[derive(Debug)]
pub struct MemoryPresenceStore {
    /// Key → current value.
    values: DashMap<String, Value>,
    /// Listener ID → listener.
    listeners: DashMap<u64, Listener>,
    /// Next listener ID.
    next_id: AtomicU64,
    /// When set, new subscriptions fail.
    unavailable: AtomicBool,
}

impl MemoryPresenceStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            values: DashMap::new(),
            listeners: DashMap::new(),
            next_id: AtomicU64::new(1),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Write a value and notify listeners on `key`.
    pub fn set(&self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value.clone());
        self.notify(key, Some(value));
    }

    /// Delete a value and notify listeners on `key`.
    pub fn remove(&self, key: &str) {
        self.values.remove(key);
        self.notify(key, None);
    }

    /// Current value at `key`.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).map(|v| v.value().clone())
    }

    /// Drop every listener on `key`, as the remote side does when a
    /// connection is lost.
    pub fn drop_listeners(&self, key: &str) -> usize {
        let before = self.listeners.len();
        self.listeners.retain(|_, l| l.key != key);
        before - self.listeners.len()
    }

    /// Make new subscriptions fail (or succeed again).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of open listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Number of open listeners on `key`.
    pub fn listener_count_for(&self, key: &str) -> usize {
        self.listeners.iter().filter(|l| l.key == key).count()
    }

    fn notify(&self, key: &str, value: Option<Value>) {
        for listener in self.listeners.iter().filter(|l| l.key == key) {
            let _ = listener.tx.send(value.clone());
        }
    }
}

impl Default for MemoryPresenceStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PresenceStore for MemoryPresenceStore {
    async fn subscribe(&self, key: &str) -> AppResult<RemoteListener> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::subscription_failure(format!(
                "presence store unavailable for '{key}'"
            )));
        }

        let (tx, updates) = mpsc::unbounded_channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        // Holding the key's entry blocks writers until the listener is
        // registered, so no write falls between the read and the insert.
        let entry = self.values.entry(key.to_string());
        let current = match &entry {
            Entry::Occupied(occupied) => Some(occupied.get().clone()),
            Entry::Vacant(_) => None,
        };
        let _ = tx.send(current);
        self.listeners.insert(
            id,
            Listener {
                key: key.to_string(),
                tx,
            },
        );
        drop(entry);
        tracing::trace!("Opened presence listener {} on '{}'", id, key);

        Ok(RemoteListener {
            id: ListenerId(id),
            updates,
        })
    }

    fn unsubscribe(&self, id: ListenerId) {
        if self.listeners.remove(&id.0).is_some() {
            tracing::trace!("Closed presence listener {}", id.0);
        }
    }
}
