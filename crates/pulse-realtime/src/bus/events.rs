//! Event names shared by producers and consumers on the bus.
//!
//! Components never reference each other through the bus, only these names.

/// A push message arrived while the application was in the foreground.
/// Payload: the decoded `InboundMessage`.
pub const NOTIFICATION_RECEIVED: &str = "notification:received";

/// The notification permission changed. Payload: `{"state": "granted"}`.
pub const PERMISSION_CHANGED: &str = "notification:permission";

/// A device token was registered with the backend. Payload: `{}`.
pub const TOKEN_REGISTERED: &str = "notification:token_registered";
