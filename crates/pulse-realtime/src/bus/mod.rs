//! Process-local publish/subscribe event bus.

pub mod event_bus;
pub mod events;
pub mod subscription;

pub use event_bus::{EventBus, EventHandler};
pub use subscription::{ScopedSubscription, SubscriptionHandle, SubscriptionId};
