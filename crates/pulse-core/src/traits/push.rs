//! Push-delivery service and token backend traits.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::{NotificationToken, PermissionState};

/// The platform push-delivery service as seen from the foreground context.
#[async_trait]
pub trait PushService: Send + Sync + std::fmt::Debug + 'static {
    /// Current permission as reported by the platform, without prompting.
    fn permission(&self) -> PermissionState;

    /// Ask the user for notification permission.
    async fn request_permission(&self) -> AppResult<PermissionState>;

    /// Obtain the device token. Fails with `ServiceUnavailable` when the
    /// service cannot issue one right now.
    async fn issue_token(&self) -> AppResult<NotificationToken>;
}

/// The application backend endpoint that records device tokens.
#[async_trait]
pub trait TokenBackend: Send + Sync + std::fmt::Debug + 'static {
    /// Register a new or rotated token.
    async fn register_token(&self, token: &NotificationToken) -> AppResult<()>;
}
