//! Event bus registry.
//!
//! Handlers are stored by value under their event name, each with its own
//! [`SubscriptionId`]. `publish` copies the handler list before dispatching,
//! so handlers may subscribe or unsubscribe while a publish is in flight
//! without affecting that publish.
//!
//! An unsubscribe made from outside any dispatch on the calling thread also
//! retires the entry, so a publish already running on another thread skips
//! it from then on.

use std::cell::Cell;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;

use super::subscription::{ScopedSubscription, SubscriptionHandle, SubscriptionId};

/// A registered event handler.
pub type EventHandler = Arc<dyn Fn(&Value) + Send + Sync>;

struct HandlerEntry {
    id: SubscriptionId,
    handler: EventHandler,
    /// Cleared when the entry is retired outside a dispatch.
    live: Arc<AtomicBool>,
}

thread_local! {
    /// Publishes currently dispatching on this thread.
    static DISPATCH_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Marks the current thread as dispatching until dropped.
struct DispatchScope;

impl DispatchScope {
    fn enter() -> Self {
        DISPATCH_DEPTH.with(|depth| depth.set(depth.get() + 1));
        Self
    }

    fn active() -> bool {
        DISPATCH_DEPTH.with(|depth| depth.get() > 0)
    }
}

impl Drop for DispatchScope {
    fn drop(&mut self) {
        DISPATCH_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Process-local publish/subscribe registry.
///
/// Construct one at process start and pass it to every component that
/// produces or consumes events.
pub struct EventBus {
    /// Event name → handlers in registration order.
    handlers: DashMap<String, Vec<HandlerEntry>>,
    /// Next registration identifier.
    next_id: AtomicU64,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self {
            handlers: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register `handler` for `event`.
    ///
    /// Registering the same closure twice creates two independent entries.
    pub fn subscribe<F>(&self, event: &str, handler: F) -> SubscriptionHandle
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers
            .entry(event.to_string())
            .or_default()
            .push(HandlerEntry {
                id,
                handler: Arc::new(handler),
                live: Arc::new(AtomicBool::new(true)),
            });

        tracing::trace!("Subscribed handler {:?} to '{}'", id, event);

        SubscriptionHandle {
            event: event.to_string(),
            id,
        }
    }

    /// Register a handler that is released when the returned guard drops.
    pub fn subscribe_scoped<F>(self: &Arc<Self>, event: &str, handler: F) -> ScopedSubscription
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        let handle = self.subscribe(event, handler);
        ScopedSubscription::new(Arc::clone(self), handle)
    }

    /// Remove the handler registered under `handle`.
    ///
    /// Returns `false` when the handle was already released.
    pub fn unsubscribe(&self, handle: &SubscriptionHandle) -> bool {
        let mut removed = false;
        if let Some(mut entries) = self.handlers.get_mut(&handle.event) {
            if let Some(pos) = entries.iter().position(|e| e.id == handle.id) {
                let entry = entries.remove(pos);
                // Inside a dispatch the captured list must stay intact.
                if !DispatchScope::active() {
                    entry.live.store(false, Ordering::SeqCst);
                }
                removed = true;
            }
            if entries.is_empty() {
                drop(entries);
                self.handlers
                    .remove_if(&handle.event, |_, entries| entries.is_empty());
            }
        }

        if removed {
            tracing::trace!("Unsubscribed handler {:?} from '{}'", handle.id, handle.event);
        }
        removed
    }

    /// Invoke every handler registered for `event`, in registration order,
    /// with the same payload. A publish with no handlers is a no-op.
    pub fn publish(&self, event: &str, payload: Value) {
        let snapshot: Vec<(EventHandler, Arc<AtomicBool>)> = match self.handlers.get(event) {
            Some(entries) => entries
                .iter()
                .map(|e| (Arc::clone(&e.handler), Arc::clone(&e.live)))
                .collect(),
            None => {
                tracing::trace!("No handlers for '{}'", event);
                return;
            }
        };

        tracing::debug!("Publishing '{}' to {} handler(s)", event, snapshot.len());

        let _scope = DispatchScope::enter();
        for (handler, live) in snapshot {
            if live.load(Ordering::SeqCst) {
                handler(&payload);
            }
        }
    }

    /// Serialize `payload` and publish it. Serialization failures are logged
    /// and nothing is published.
    pub fn publish_json<T: Serialize>(&self, event: &str, payload: &T) {
        match serde_json::to_value(payload) {
            Ok(value) => self.publish(event, value),
            Err(e) => tracing::error!("Failed to serialize payload for '{}': {}", event, e),
        }
    }

    /// Number of handlers currently registered for `event`.
    pub fn handler_count(&self, event: &str) -> usize {
        self.handlers.get(event).map(|e| e.len()).unwrap_or(0)
    }

    /// Number of event names with at least one handler.
    pub fn event_count(&self) -> usize {
        self.handlers.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("events", &self.handlers.len())
            .field("next_id", &self.next_id.load(Ordering::Relaxed))
            .finish()
    }
}
