//! Notification gateway: permission, device token lifecycle, and foreground
//! delivery onto the event bus.

pub mod backend;
pub mod dedup;
pub mod foreground;
pub mod gateway;
pub mod memory;
pub mod permission;
pub mod token;

pub use backend::HttpTokenBackend;
pub use gateway::NotificationGateway;
pub use memory::{MemoryPushService, MemoryTokenBackend};
pub use permission::{PermissionTracker, PromptGate};
pub use token::{TokenRegistrar, TokenStatus};
