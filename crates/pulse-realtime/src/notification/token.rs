//! Device token acquisition, registration, and rotation.
//!
//! A token is registered with the backend when first obtained and again
//! whenever the push service hands out a different one. Failures never
//! reach the user: the first attempt runs inline, and if it fails a single
//! background task keeps retrying with backoff.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use pulse_core::config::RetryConfig;
use pulse_core::result::AppResult;
use pulse_core::traits::{PushService, TokenBackend};
use pulse_core::types::NotificationToken;

use crate::retry::{Backoff, RetryOutcome, retry_with_backoff};

/// Registration state of the device token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenStatus {
    /// No token is registered with the backend.
    Unregistered,
    /// This token is registered with the backend.
    Registered(NotificationToken),
}

impl TokenStatus {
    /// The registered token, if any.
    pub fn token(&self) -> Option<&NotificationToken> {
        match self {
            Self::Registered(token) => Some(token),
            Self::Unregistered => None,
        }
    }
}

/// Obtains device tokens and keeps the backend registration current.
#[derive(Debug)]
pub struct TokenRegistrar {
    /// Push service issuing tokens.
    push: Arc<dyn PushService>,
    /// Backend recording tokens.
    backend: Arc<dyn TokenBackend>,
    /// Current registration state.
    status: watch::Sender<TokenStatus>,
    /// Serializes registrations so a rotation cannot interleave with a retry.
    registration: Mutex<()>,
    /// Backoff for background retries.
    backoff: Backoff,
    /// Set while a background retry task is running.
    retrying: AtomicBool,
    /// Cancels background retries on shutdown.
    cancel: CancellationToken,
}

impl TokenRegistrar {
    /// Create a registrar.
    pub fn new(
        push: Arc<dyn PushService>,
        backend: Arc<dyn TokenBackend>,
        retry: &RetryConfig,
        cancel: CancellationToken,
    ) -> Self {
        let (status, _) = watch::channel(TokenStatus::Unregistered);
        Self {
            push,
            backend,
            status,
            registration: Mutex::new(()),
            backoff: Backoff::from_config(retry),
            retrying: AtomicBool::new(false),
            cancel,
        }
    }

    /// Current registration state.
    pub fn status(&self) -> TokenStatus {
        self.status.borrow().clone()
    }

    /// Observe registration changes.
    pub fn watch(&self) -> watch::Receiver<TokenStatus> {
        self.status.subscribe()
    }

    /// Whether a background retry is in progress.
    pub fn is_retrying(&self) -> bool {
        self.retrying.load(Ordering::SeqCst)
    }

    /// Ask the push service for the current token and register it if it is
    /// new. Returns whether a registration was made.
    pub async fn acquire_and_register(&self) -> AppResult<bool> {
        let token = self.push.issue_token().await?;
        self.register(token).await
    }

    /// Register `token` unless it is the one already registered.
    pub async fn register(&self, token: NotificationToken) -> AppResult<bool> {
        let _guard = self.registration.lock().await;

        let unchanged = self.status.borrow().token() == Some(&token);
        if unchanged {
            tracing::trace!("Device token unchanged, skipping registration");
            return Ok(false);
        }

        match self.backend.register_token(&token).await {
            Ok(()) => {
                tracing::info!("Registered device token {:?}", token);
                self.status.send_replace(TokenStatus::Registered(token));
                Ok(true)
            }
            Err(e) => {
                // The previous token is stale once the service issued a new one.
                self.status.send_replace(TokenStatus::Unregistered);
                Err(e)
            }
        }
    }

    /// Forget the registered token, e.g. after permission was revoked.
    pub fn invalidate(&self) {
        if self.status.send_replace(TokenStatus::Unregistered) != TokenStatus::Unregistered {
            tracing::info!("Device token invalidated");
        }
    }

    /// Try once inline; on failure hand the work to a background retry.
    pub async fn ensure_registered(self: &Arc<Self>) {
        if let Err(e) = self.acquire_and_register().await {
            tracing::warn!("Device token registration failed, retrying in background: {}", e);
            self.spawn_retry();
        }
    }

    /// Start the background retry task unless one is already running.
    pub fn spawn_retry(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if self.retrying.swap(true, Ordering::SeqCst) {
            tracing::debug!("Token retry already running");
            return None;
        }

        let this = Arc::clone(self);
        Some(tokio::spawn(async move {
            let first_delay = this.backoff.delay_after(1);
            let waited = tokio::select! {
                biased;
                _ = this.cancel.cancelled() => false,
                _ = tokio::time::sleep(first_delay) => true,
            };

            if waited {
                let outcome =
                    retry_with_backoff(&this.backoff, &this.cancel, |_| this.acquire_and_register())
                        .await;
                match outcome {
                    RetryOutcome::Succeeded { attempts, .. } => {
                        tracing::info!("Device token registered after {} retry attempt(s)", attempts)
                    }
                    RetryOutcome::Exhausted {
                        last_error,
                        attempts,
                    } => tracing::error!(
                        "Device token still unregistered after {} retry attempt(s): {}",
                        attempts,
                        last_error
                    ),
                    RetryOutcome::Aborted { error, .. } => {
                        tracing::error!("Device token registration abandoned: {}", error)
                    }
                    RetryOutcome::Cancelled => tracing::debug!("Token retry cancelled"),
                }
            }

            this.retrying.store(false, Ordering::SeqCst);
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::memory::{MemoryPushService, MemoryTokenBackend};
    use pulse_core::types::PermissionState;

    fn granted(token: &str) -> Arc<MemoryPushService> {
        let push = MemoryPushService::new(PermissionState::Granted, token);
        push.set_permission(PermissionState::Granted);
        Arc::new(push)
    }

    fn registrar(
        push: &Arc<MemoryPushService>,
        backend: &Arc<MemoryTokenBackend>,
    ) -> Arc<TokenRegistrar> {
        Arc::new(TokenRegistrar::new(
            push.clone(),
            backend.clone(),
            &RetryConfig::new(4, 100, 1_000),
            CancellationToken::new(),
        ))
    }

    #[tokio::test]
    async fn test_registers_once_per_token() {
        let push = granted("tok-1");
        let backend = Arc::new(MemoryTokenBackend::new());
        let registrar = registrar(&push, &backend);

        assert!(registrar.acquire_and_register().await.unwrap());
        assert!(!registrar.acquire_and_register().await.unwrap());
        assert_eq!(backend.registered(), vec![NotificationToken::new("tok-1")]);
        assert_eq!(
            registrar.status(),
            TokenStatus::Registered(NotificationToken::new("tok-1"))
        );
    }

    #[tokio::test]
    async fn test_rotation_registers_new_token() {
        let push = granted("tok-1");
        let backend = Arc::new(MemoryTokenBackend::new());
        let registrar = registrar(&push, &backend);

        registrar.acquire_and_register().await.unwrap();
        push.rotate_token("tok-2");
        assert!(registrar.acquire_and_register().await.unwrap());

        assert_eq!(
            backend.registered(),
            vec![NotificationToken::new("tok-1"), NotificationToken::new("tok-2")]
        );
    }

    #[tokio::test]
    async fn test_failed_registration_marks_unregistered() {
        let push = granted("tok-1");
        let backend = Arc::new(MemoryTokenBackend::new());
        let registrar = registrar(&push, &backend);

        backend.fail_next(1);
        assert!(registrar.acquire_and_register().await.is_err());
        assert_eq!(registrar.status(), TokenStatus::Unregistered);
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_retry_recovers() {
        let push = granted("tok-1");
        let backend = Arc::new(MemoryTokenBackend::new());
        let registrar = registrar(&push, &backend);

        push.fail_next_tokens(2);
        registrar.ensure_registered().await;
        assert!(registrar.is_retrying());
        assert_eq!(registrar.status(), TokenStatus::Unregistered);

        let mut status = registrar.watch();
        tokio::time::timeout(std::time::Duration::from_secs(60), status.wait_for(|s| s.token().is_some()))
            .await
            .expect("retry should register the token")
            .expect("status sender alive");

        assert_eq!(push.token_requests(), 3);
        assert_eq!(backend.registered().len(), 1);
    }

    #[tokio::test]
    async fn test_only_one_retry_task() {
        let push = granted("tok-1");
        let backend = Arc::new(MemoryTokenBackend::new());
        let registrar = registrar(&push, &backend);

        let first = registrar.spawn_retry();
        let second = registrar.spawn_retry();
        assert!(first.is_some());
        assert!(second.is_none());
    }
}
