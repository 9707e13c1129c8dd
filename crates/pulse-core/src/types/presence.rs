//! Presence snapshot of one tracked user.

use serde::{Deserialize, Serialize};

use super::id::UserId;

/// Latest known presence of a user.
///
/// `last_seen` is the raw timestamp written by the remote heartbeat, kept
/// as-is so the snapshot reflects exactly what the remote store holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresenceRecord {
    /// The user this record describes.
    pub user_id: UserId,
    /// Whether the user is currently online.
    pub online: bool,
    /// Last-seen timestamp, if the remote store has one.
    pub last_seen: Option<i64>,
}

impl PresenceRecord {
    /// The reset state: offline with no last-seen timestamp.
    pub fn offline(user_id: UserId) -> Self {
        Self {
            user_id,
            online: false,
            last_seen: None,
        }
    }

    /// Whether this record is the reset state.
    pub fn is_reset(&self) -> bool {
        !self.online && self.last_seen.is_none()
    }
}
