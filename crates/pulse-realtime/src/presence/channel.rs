//! Presence channel: one live remote subscription per tracked user.
//!
//! `track` opens the listener (or reuses the open one) and hands out a
//! [`PresenceStream`]; a background task decodes remote values into the
//! user's [`PresenceFeed`]. `untrack` releases the listener synchronously,
//! resets the snapshot to offline, and ends every stream for that user.
//!
//! When the remote side drops a listener on its own, the snapshot falls back
//! to offline and the task reopens it with capped exponential backoff. If all
//! attempts fail the feed closes; the next `track` call starts over.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use pulse_core::config::PresenceConfig;
use pulse_core::result::AppResult;
use pulse_core::traits::PresenceStore;
use pulse_core::types::{PresenceRecord, UserId};

use super::decode::decode_record;
use super::feed::PresenceFeed;
use super::stream::PresenceStream;
use crate::retry::{Backoff, RetryOutcome, retry_with_backoff};

/// State kept for one tracked user.
#[derive(Debug)]
struct TrackedUser {
    feed: Arc<PresenceFeed>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl TrackedUser {
    fn release(self, store: &dyn PresenceStore) {
        self.cancel.cancel();
        self.feed.close(store);
        self.task.abort();
    }
}

/// Tracks presence for any number of users.
#[derive(Debug)]
pub struct PresenceChannel {
    /// Remote presence store.
    store: Arc<dyn PresenceStore>,
    /// User ID → tracking state.
    tracked: Mutex<HashMap<UserId, TrackedUser>>,
    /// Configuration.
    config: PresenceConfig,
}

impl PresenceChannel {
    /// Create a channel over `store`.
    pub fn new(store: Arc<dyn PresenceStore>, config: PresenceConfig) -> Self {
        Self {
            store,
            tracked: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Start (or join) tracking `user_id`.
    ///
    /// Fails only with `InvalidArgument` for an empty or malformed id. If the
    /// remote listener cannot be opened the failure is logged and the
    /// returned stream is offline and already ended; calling `track` again
    /// retries.
    pub async fn track(&self, user_id: &str) -> AppResult<PresenceStream> {
        let user_id = UserId::parse(user_id)?;
        let mut tracked = self.tracked.lock().await;
        self.sweep_closed(&mut tracked);

        if let Some(existing) = tracked.get(&user_id) {
            if let Some(receiver) = existing.feed.subscribe() {
                tracing::debug!("Reusing presence subscription for '{}'", user_id);
                return Ok(PresenceStream::new(user_id, receiver));
            }
        }

        let key = self.config.key_for(user_id.as_str());
        let listener = match self.store.subscribe(&key).await {
            Ok(listener) => listener,
            Err(e) => {
                tracing::warn!(
                    "Presence subscription for '{}' failed, reporting offline: {}",
                    user_id,
                    e
                );
                return Ok(PresenceStream::ended(user_id));
            }
        };

        let (feed, receiver) = PresenceFeed::new(user_id.clone());
        let feed = Arc::new(feed);
        feed.attach(self.store.as_ref(), listener.id);

        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_listener(
            Arc::clone(&self.store),
            Arc::clone(&feed),
            key,
            listener.updates,
            Backoff::from_config(&self.config.resubscribe),
            cancel.clone(),
        ));

        tracing::info!("Tracking presence for '{}'", user_id);
        tracked.insert(user_id.clone(), TrackedUser { feed, cancel, task });

        Ok(PresenceStream::new(user_id, receiver))
    }

    /// Stop tracking `user_id`.
    ///
    /// Returns whether a subscription was released. Untracking a user that
    /// is not tracked is a no-op.
    pub async fn untrack(&self, user_id: &str) -> AppResult<bool> {
        let user_id = UserId::parse(user_id)?;
        let removed = self.tracked.lock().await.remove(&user_id);
        match removed {
            Some(entry) => {
                entry.release(self.store.as_ref());
                tracing::info!("Stopped tracking presence for '{}'", user_id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Stop tracking every user.
    pub async fn untrack_all(&self) -> usize {
        let drained: Vec<_> = self.tracked.lock().await.drain().collect();
        let count = drained.len();
        for (_, entry) in drained {
            entry.release(self.store.as_ref());
        }
        if count > 0 {
            tracing::info!("Stopped tracking presence for {} user(s)", count);
        }
        count
    }

    /// Latest snapshot for `user_id`, or the offline reset state if the user
    /// is not tracked.
    pub async fn snapshot(&self, user_id: &str) -> AppResult<PresenceRecord> {
        let user_id = UserId::parse(user_id)?;
        let tracked = self.tracked.lock().await;
        Ok(match tracked.get(&user_id) {
            Some(entry) => entry.feed.current(),
            None => PresenceRecord::offline(user_id),
        })
    }

    /// Whether `user_id` has an open subscription.
    pub async fn is_tracked(&self, user_id: &str) -> bool {
        let Ok(user_id) = UserId::parse(user_id) else {
            return false;
        };
        self.tracked
            .lock()
            .await
            .get(&user_id)
            .is_some_and(|entry| entry.feed.is_open())
    }

    /// Number of users with an open subscription.
    pub async fn tracked_count(&self) -> usize {
        let mut tracked = self.tracked.lock().await;
        self.sweep_closed(&mut tracked);
        tracked.len()
    }

    /// Drop entries whose feed was closed by an exhausted resubscribe.
    fn sweep_closed(&self, tracked: &mut HashMap<UserId, TrackedUser>) {
        let closed: Vec<UserId> = tracked
            .iter()
            .filter(|(_, entry)| !entry.feed.is_open())
            .map(|(user_id, _)| user_id.clone())
            .collect();
        for user_id in closed {
            if let Some(entry) = tracked.remove(&user_id) {
                entry.release(self.store.as_ref());
                tracing::debug!("Dropped closed presence feed for '{}'", user_id);
            }
        }
    }
}

impl Drop for PresenceChannel {
    fn drop(&mut self) {
        for (_, entry) in self.tracked.get_mut().drain() {
            entry.release(self.store.as_ref());
        }
    }
}

/// Feed remote values into `feed` until cancelled, reopening the listener
/// when the remote side drops it.
async fn run_listener(
    store: Arc<dyn PresenceStore>,
    feed: Arc<PresenceFeed>,
    key: String,
    mut updates: mpsc::UnboundedReceiver<Option<Value>>,
    backoff: Backoff,
    cancel: CancellationToken,
) {
    let user_id = feed.user_id().clone();

    loop {
        loop {
            let update = tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                update = updates.recv() => update,
            };
            let Some(value) = update else { break };
            if !feed.publish(decode_record(&user_id, value.as_ref())) {
                return;
            }
        }

        feed.detach();
        if !feed.publish(PresenceRecord::offline(user_id.clone())) {
            return;
        }
        tracing::warn!("Presence listener for '{}' dropped, resubscribing", user_id);

        let store_ref = store.as_ref();
        let key_ref = key.as_str();
        match retry_with_backoff(&backoff, &cancel, |_| store_ref.subscribe(key_ref)).await {
            RetryOutcome::Succeeded { value, attempts } => {
                if !feed.attach(store_ref, value.id) {
                    return;
                }
                tracing::info!(
                    "Presence listener for '{}' reopened after {} attempt(s)",
                    user_id,
                    attempts
                );
                updates = value.updates;
            }
            RetryOutcome::Exhausted {
                last_error,
                attempts,
            } => {
                tracing::error!(
                    "Giving up on presence for '{}' after {} attempt(s): {}",
                    user_id,
                    attempts,
                    last_error
                );
                feed.close(store_ref);
                return;
            }
            RetryOutcome::Aborted { error, .. } => {
                tracing::error!("Presence for '{}' cannot be reopened: {}", user_id, error);
                feed.close(store_ref);
                return;
            }
            RetryOutcome::Cancelled => return,
        }
    }
}
