//! Remote presence store trait.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::result::AppResult;

/// Identifier of one open remote listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// A live listener on one remote key.
///
/// Each item on `updates` is the current remote value: `Some(value)` when
/// the key exists, `None` when it was deleted. The channel closes when the
/// remote side drops the listener.
#[derive(Debug)]
pub struct RemoteListener {
    /// Handle used to release the listener.
    pub id: ListenerId,
    /// Remote values in the store's chronological order.
    pub updates: mpsc::UnboundedReceiver<Option<Value>>,
}

/// Read-only subscription access to the remote presence store.
///
/// The store is keyed by `status/{user_id}`; writes are done elsewhere by
/// the heartbeat mechanism.
#[async_trait]
pub trait PresenceStore: Send + Sync + std::fmt::Debug + 'static {
    /// Open a listener on `key`. Fails with `SubscriptionFailure` when the
    /// remote channel cannot be opened.
    async fn subscribe(&self, key: &str) -> AppResult<RemoteListener>;

    /// Release a listener. Releasing an unknown listener is a no-op.
    fn unsubscribe(&self, id: ListenerId);
}
