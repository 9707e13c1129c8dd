//! Per-user snapshot feed shared by the channel and its listener task.
//!
//! All transitions go through one lock so that a release racing with an
//! update can never deliver that update after the release.

use std::sync::Mutex;

use tokio::sync::watch;

use pulse_core::traits::{ListenerId, PresenceStore};
use pulse_core::types::{PresenceRecord, UserId};

#[derive(Debug)]
struct FeedState {
    /// `None` once the feed is closed.
    sender: Option<watch::Sender<PresenceRecord>>,
    /// Remote listener currently feeding this user.
    listener: Option<ListenerId>,
}

/// Latest snapshot for one tracked user.
#[derive(Debug)]
pub struct PresenceFeed {
    user_id: UserId,
    state: Mutex<FeedState>,
}

impl PresenceFeed {
    /// Create a feed starting at the offline reset state.
    pub fn new(user_id: UserId) -> (Self, watch::Receiver<PresenceRecord>) {
        let (sender, receiver) = watch::channel(PresenceRecord::offline(user_id.clone()));
        let feed = Self {
            user_id,
            state: Mutex::new(FeedState {
                sender: Some(sender),
                listener: None,
            }),
        };
        (feed, receiver)
    }

    /// The user this feed describes.
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// A new receiver, or `None` when the feed is closed.
    pub fn subscribe(&self) -> Option<watch::Receiver<PresenceRecord>> {
        self.lock().sender.as_ref().map(watch::Sender::subscribe)
    }

    /// Whether the feed still delivers snapshots.
    pub fn is_open(&self) -> bool {
        self.lock().sender.is_some()
    }

    /// Latest snapshot.
    pub fn current(&self) -> PresenceRecord {
        match &self.lock().sender {
            Some(sender) => sender.borrow().clone(),
            None => PresenceRecord::offline(self.user_id.clone()),
        }
    }

    /// Replace the snapshot. Receivers are notified only when it changed.
    /// Returns `false` once the feed is closed.
    pub fn publish(&self, record: PresenceRecord) -> bool {
        let state = self.lock();
        let Some(sender) = &state.sender else {
            return false;
        };
        sender.send_if_modified(|current| {
            if *current == record {
                false
            } else {
                *current = record;
                true
            }
        });
        true
    }

    /// Record the listener now feeding this user. If the feed was closed in
    /// the meantime the listener is released immediately and `false` is
    /// returned.
    pub fn attach(&self, store: &dyn PresenceStore, id: ListenerId) -> bool {
        let mut state = self.lock();
        if state.sender.is_none() {
            store.unsubscribe(id);
            return false;
        }
        state.listener = Some(id);
        true
    }

    /// Forget a listener the remote side already dropped.
    pub fn detach(&self) -> Option<ListenerId> {
        self.lock().listener.take()
    }

    /// Release the listener, reset the snapshot to offline, and close the
    /// feed. Receivers observe the reset and then the end of the stream.
    /// Closing an already closed feed does nothing.
    pub fn close(&self, store: &dyn PresenceStore) -> bool {
        let mut state = self.lock();
        let Some(sender) = state.sender.take() else {
            return false;
        };
        if let Some(id) = state.listener.take() {
            store.unsubscribe(id);
        }
        sender.send_if_modified(|current| {
            if current.is_reset() {
                false
            } else {
                *current = PresenceRecord::offline(self.user_id.clone());
                true
            }
        });
        true
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FeedState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}
