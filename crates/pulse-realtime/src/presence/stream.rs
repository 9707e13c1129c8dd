//! Caller-side view of a tracked user's presence.

use futures::Stream;
use tokio::sync::watch;

use pulse_core::types::{PresenceRecord, UserId};

/// Handle returned by [`PresenceChannel::track`](super::PresenceChannel::track).
///
/// Yields snapshots in the remote store's order, collapsed to the latest
/// value when the caller falls behind. The sequence ends once the user is
/// untracked, and cannot be restarted; call `track` again for a new one.
#[derive(Debug)]
pub struct PresenceStream {
    user_id: UserId,
    receiver: watch::Receiver<PresenceRecord>,
}

impl PresenceStream {
    pub(crate) fn new(user_id: UserId, receiver: watch::Receiver<PresenceRecord>) -> Self {
        Self { user_id, receiver }
    }

    /// A stream that holds the offline snapshot and has already ended.
    pub(crate) fn ended(user_id: UserId) -> Self {
        let (sender, receiver) = watch::channel(PresenceRecord::offline(user_id.clone()));
        drop(sender);
        Self { user_id, receiver }
    }

    /// The tracked user.
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Latest known snapshot.
    pub fn current(&self) -> PresenceRecord {
        self.receiver.borrow().clone()
    }

    /// Wait for the next snapshot. Returns `None` once the subscription has
    /// been released.
    pub async fn next(&mut self) -> Option<PresenceRecord> {
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    /// Convert into a [`futures::Stream`] of snapshots.
    pub fn into_stream(self) -> impl Stream<Item = PresenceRecord> + Send + 'static {
        futures::stream::unfold(self, |mut this| async move {
            let record = this.next().await?;
            Some((record, this))
        })
    }
}
