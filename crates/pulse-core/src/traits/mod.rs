//! Collaborator traits defined in `pulse-core` and implemented by the
//! transports that reach the remote store, the push service, the
//! application backend, and the system notification surface.

pub mod presence_store;
pub mod push;
pub mod renderer;

pub use presence_store::{ListenerId, PresenceStore, RemoteListener};
pub use push::{PushService, TokenBackend};
pub use renderer::{NotificationRenderer, RenderOptions};
