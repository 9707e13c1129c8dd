//! Data shapes shared by the foreground application and the background worker.

pub mod id;
pub mod message;
pub mod permission;
pub mod presence;
pub mod token;

pub use id::UserId;
pub use message::InboundMessage;
pub use permission::PermissionState;
pub use presence::PresenceRecord;
pub use token::NotificationToken;
