//! Subscription handles returned by the event bus.

use std::sync::Arc;

use super::event_bus::EventBus;

/// Opaque identifier of one registered handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub(crate) u64);

/// Token identifying a registration; pass it back to
/// [`EventBus::unsubscribe`] to remove exactly that handler.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    pub(crate) event: String,
    pub(crate) id: SubscriptionId,
}

impl SubscriptionHandle {
    /// The event name this handle is registered for.
    pub fn event(&self) -> &str {
        &self.event
    }

    /// The registration identifier.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }
}

/// A subscription that is released when dropped.
///
/// Components hold one of these per handler so teardown cannot leave a
/// handler behind whose captured state is gone.
#[derive(Debug)]
pub struct ScopedSubscription {
    bus: Arc<EventBus>,
    handle: Option<SubscriptionHandle>,
}

impl ScopedSubscription {
    pub(crate) fn new(bus: Arc<EventBus>, handle: SubscriptionHandle) -> Self {
        Self {
            bus,
            handle: Some(handle),
        }
    }

    /// The underlying handle.
    pub fn handle(&self) -> Option<&SubscriptionHandle> {
        self.handle.as_ref()
    }

    /// Release the subscription now.
    pub fn release(mut self) {
        self.unsubscribe();
    }

    fn unsubscribe(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.bus.unsubscribe(&handle);
        }
    }
}

impl Drop for ScopedSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
