//! Notification gateway.
//!
//! Owns the permission state machine and the device token lifecycle, and
//! routes foreground push messages onto the event bus. Nothing here fails
//! the caller: permission and token problems end up as state.

use std::sync::Arc;

use serde_json::{Value, json};
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use pulse_core::config::NotificationsConfig;
use pulse_core::traits::{PushService, TokenBackend};
use pulse_core::types::{InboundMessage, NotificationToken, PermissionState};

use super::foreground::ForegroundRouter;
use super::permission::{PermissionTracker, PromptGate};
use super::token::{TokenRegistrar, TokenStatus};
use crate::bus::EventBus;
use crate::bus::events::{PERMISSION_CHANGED, TOKEN_REGISTERED};

/// Foreground-side notification coordinator.
#[derive(Debug)]
pub struct NotificationGateway {
    /// Platform push service.
    push: Arc<dyn PushService>,
    /// Event bus shared with the rest of the process.
    bus: Arc<EventBus>,
    /// Permission state machine.
    permission: PermissionTracker,
    /// Serializes permission prompts.
    prompting: Mutex<()>,
    /// Device token lifecycle.
    tokens: Arc<TokenRegistrar>,
    /// Foreground message routing.
    foreground: ForegroundRouter,
    /// Gateway settings.
    config: NotificationsConfig,
    /// Stops background tasks.
    cancel: CancellationToken,
}

impl NotificationGateway {
    /// Create a gateway. The initial permission is whatever the platform
    /// currently reports.
    pub fn new(
        push: Arc<dyn PushService>,
        backend: Arc<dyn TokenBackend>,
        bus: Arc<EventBus>,
        config: NotificationsConfig,
    ) -> Self {
        let cancel = CancellationToken::new();
        let tokens = Arc::new(TokenRegistrar::new(
            Arc::clone(&push),
            backend,
            &config.token_retry,
            cancel.child_token(),
        ));
        let foreground =
            ForegroundRouter::new(Arc::clone(&bus), config.event_name.clone(), config.dedup_window_ms);
        let permission = PermissionTracker::new(push.permission());

        tracing::info!(
            "Notification gateway started with permission '{}'",
            permission.current().as_str()
        );

        Self {
            push,
            bus,
            permission,
            prompting: Mutex::new(()),
            tokens,
            foreground,
            config,
            cancel,
        }
    }

    /// Current permission state.
    pub fn permission_state(&self) -> PermissionState {
        self.permission.current()
    }

    /// Observe permission changes.
    pub fn watch_permission(&self) -> watch::Receiver<PermissionState> {
        self.permission.watch()
    }

    /// A prompt gate using the configured mount delay.
    pub fn prompt_gate(&self) -> PromptGate {
        PromptGate::new(self.permission.watch(), self.config.prompt_delay())
    }

    /// Current device token registration.
    pub fn token_status(&self) -> TokenStatus {
        self.tokens.status()
    }

    /// Observe token registration changes.
    pub fn watch_token(&self) -> watch::Receiver<TokenStatus> {
        self.tokens.watch()
    }

    /// Event name used for foreground deliveries.
    pub fn event_name(&self) -> &str {
        self.foreground.event_name()
    }

    /// Bring the token lifecycle up to date with the permission the
    /// platform reported at construction. Call once after mount; a session
    /// that starts out granted never goes through `request_permission`.
    pub async fn start(&self) -> PermissionState {
        let state = self.permission.current();
        if state == PermissionState::Granted {
            tracing::debug!("Permission already granted, registering device token");
            self.tokens.ensure_registered().await;
        }
        state
    }

    /// User-initiated permission request.
    ///
    /// From `default` this prompts once; a grant proceeds straight to token
    /// registration, a denial requests no token. From `denied` nothing is
    /// prompted. A failed prompt counts as a denial.
    pub async fn request_permission(&self) -> PermissionState {
        let _guard = self.prompting.lock().await;

        match self.permission.current() {
            PermissionState::Denied => {
                tracing::debug!("Permission denied for this session, not prompting");
                return PermissionState::Denied;
            }
            PermissionState::Granted => {
                self.tokens.ensure_registered().await;
                return PermissionState::Granted;
            }
            PermissionState::Default => {}
        }

        let decision = match self.push.request_permission().await {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!("Permission request failed, treating as denied: {}", e);
                PermissionState::Denied
            }
        };

        if self.permission.transition(decision) {
            self.publish_permission(decision);
        }

        if decision == PermissionState::Granted {
            self.tokens.ensure_registered().await;
        }

        self.permission.current()
    }

    /// Re-read the platform permission after the user changed it outside
    /// the gateway. This is the only way out of `denied`.
    pub async fn refresh_permission(&self) -> PermissionState {
        let platform = self.push.permission();
        if !self.permission.resync(platform) {
            return platform;
        }

        self.publish_permission(platform);
        if platform == PermissionState::Granted {
            self.tokens.ensure_registered().await;
        } else {
            // Any move away from granted revokes the token.
            self.tokens.invalidate();
        }
        platform
    }

    /// Re-read the token from the push service and register it if it
    /// rotated. Returns whether a registration was made. Failures are
    /// handed to the background retry.
    pub async fn sync_token(&self) -> bool {
        if self.permission.current() != PermissionState::Granted {
            return false;
        }

        match self.tokens.acquire_and_register().await {
            Ok(changed) => changed,
            Err(e) => {
                tracing::warn!("Token sync failed, retrying in background: {}", e);
                self.tokens.spawn_retry();
                false
            }
        }
    }

    /// Entry point for push services that announce a rotated token.
    pub async fn on_token_rotated(&self, token: NotificationToken) -> bool {
        if self.permission.current() != PermissionState::Granted {
            tracing::debug!("Ignoring token rotation without granted permission");
            return false;
        }

        tracing::info!("Push service rotated device token");
        match self.tokens.register(token).await {
            Ok(changed) => changed,
            Err(e) => {
                tracing::warn!("Rotated token registration failed, retrying in background: {}", e);
                self.tokens.spawn_retry();
                false
            }
        }
    }

    /// Periodically re-read the token to catch rotations the push service
    /// does not announce. Returns `None` when polling is disabled.
    pub fn spawn_token_refresh(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        let period = self.config.token_refresh_interval()?;
        let this = Arc::clone(self);

        Some(tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            loop {
                tokio::select! {
                    biased;
                    _ = this.cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        if this.sync_token().await {
                            tracing::info!("Token refresh registered a rotated token");
                        }
                    }
                }
            }
            tracing::debug!("Token refresh stopped");
        }))
    }

    /// Publish `TOKEN_REGISTERED` on the bus whenever a token becomes
    /// registered, including registrations made by background retries.
    pub fn spawn_token_events(&self) -> JoinHandle<()> {
        let mut status = self.tokens.watch();
        let bus = Arc::clone(&self.bus);
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    changed = status.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let registered = status.borrow_and_update().token().is_some();
                        if registered {
                            bus.publish(TOKEN_REGISTERED, json!({}));
                        }
                    }
                }
            }
        })
    }

    /// Route one foreground push message onto the bus.
    pub fn handle_foreground(&self, payload: &Value) -> Option<InboundMessage> {
        self.foreground.route(payload)
    }

    /// Route foreground deliveries until the channel closes or the gateway
    /// shuts down.
    pub async fn run_foreground(&self, mut deliveries: mpsc::Receiver<Value>) {
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                delivery = deliveries.recv() => match delivery {
                    Some(payload) => {
                        self.handle_foreground(&payload);
                    }
                    None => break,
                },
            }
        }
        tracing::debug!("Foreground delivery loop stopped");
    }

    /// Stop background tasks.
    pub fn shutdown(&self) {
        self.cancel.cancel();
        tracing::info!("Notification gateway shut down");
    }

    fn publish_permission(&self, state: PermissionState) {
        self.bus
            .publish(PERMISSION_CHANGED, json!({ "state": state.as_str() }));
    }
}

impl Drop for NotificationGateway {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::memory::{MemoryPushService, MemoryTokenBackend};
    use std::sync::Mutex as StdMutex;
    use std::time::Duration;

    struct Fixture {
        push: Arc<MemoryPushService>,
        backend: Arc<MemoryTokenBackend>,
        bus: Arc<EventBus>,
        gateway: Arc<NotificationGateway>,
    }

    fn fixture(answer: PermissionState) -> Fixture {
        let push = Arc::new(MemoryPushService::new(answer, "tok-1"));
        let backend = Arc::new(MemoryTokenBackend::new());
        let bus = Arc::new(EventBus::new());
        let gateway = Arc::new(NotificationGateway::new(
            push.clone(),
            backend.clone(),
            bus.clone(),
            NotificationsConfig::default(),
        ));
        Fixture {
            push,
            backend,
            bus,
            gateway,
        }
    }

    fn capture(bus: &EventBus, event: &str) -> Arc<StdMutex<Vec<Value>>> {
        let seen: Arc<StdMutex<Vec<Value>>> = Arc::default();
        let sink = seen.clone();
        bus.subscribe(event, move |p| sink.lock().unwrap().push(p.clone()));
        seen
    }

    #[tokio::test]
    async fn test_grant_registers_token() {
        let f = fixture(PermissionState::Granted);
        let events = capture(&f.bus, PERMISSION_CHANGED);

        assert_eq!(f.gateway.request_permission().await, PermissionState::Granted);
        assert_eq!(f.backend.registered(), vec![NotificationToken::new("tok-1")]);
        assert_eq!(
            f.gateway.token_status(),
            TokenStatus::Registered(NotificationToken::new("tok-1"))
        );
        assert_eq!(*events.lock().unwrap(), vec![json!({"state": "granted"})]);
    }

    #[tokio::test]
    async fn test_denial_requests_no_token() {
        let f = fixture(PermissionState::Denied);

        assert_eq!(f.gateway.request_permission().await, PermissionState::Denied);
        assert_eq!(f.gateway.permission_state(), PermissionState::Denied);
        assert_eq!(f.push.token_requests(), 0);
        assert!(f.backend.registered().is_empty());
    }

    #[tokio::test]
    async fn test_denied_never_reprompts() {
        let f = fixture(PermissionState::Denied);
        f.gateway.request_permission().await;

        f.push.set_answer(PermissionState::Granted);
        assert_eq!(f.gateway.request_permission().await, PermissionState::Denied);
        assert_eq!(f.push.permission_requests(), 1);
    }

    #[tokio::test]
    async fn test_dismissed_prompt_stays_default() {
        let f = fixture(PermissionState::Default);

        assert_eq!(f.gateway.request_permission().await, PermissionState::Default);
        assert_eq!(f.push.token_requests(), 0);
        assert!(f.gateway.prompt_gate().should_prompt());
    }

    #[tokio::test]
    async fn test_refresh_leaves_denied_after_user_action() {
        let f = fixture(PermissionState::Denied);
        f.gateway.request_permission().await;

        f.push.set_permission(PermissionState::Granted);
        assert_eq!(f.gateway.refresh_permission().await, PermissionState::Granted);
        assert_eq!(f.backend.registered().len(), 1);
    }

    #[tokio::test]
    async fn test_revocation_invalidates_token() {
        let f = fixture(PermissionState::Granted);
        f.gateway.request_permission().await;

        f.push.set_permission(PermissionState::Denied);
        f.gateway.refresh_permission().await;
        assert_eq!(f.gateway.token_status(), TokenStatus::Unregistered);
    }

    #[tokio::test]
    async fn test_reset_to_default_invalidates_token() {
        let f = fixture(PermissionState::Granted);
        f.gateway.request_permission().await;

        f.push.set_permission(PermissionState::Default);
        assert_eq!(f.gateway.refresh_permission().await, PermissionState::Default);
        assert_eq!(f.gateway.token_status(), TokenStatus::Unregistered);
    }

    #[tokio::test]
    async fn test_start_registers_when_already_granted() {
        let push = Arc::new(MemoryPushService::new(PermissionState::Granted, "tok-1"));
        push.set_permission(PermissionState::Granted);
        let backend = Arc::new(MemoryTokenBackend::new());
        let config = NotificationsConfig {
            token_refresh_interval_seconds: 0,
            ..NotificationsConfig::default()
        };
        let gateway = NotificationGateway::new(
            push.clone(),
            backend.clone(),
            Arc::new(EventBus::new()),
            config,
        );
        assert!(!gateway.prompt_gate().should_prompt());

        assert_eq!(gateway.start().await, PermissionState::Granted);
        assert_eq!(
            gateway.token_status(),
            TokenStatus::Registered(NotificationToken::new("tok-1"))
        );
        assert_eq!(push.permission_requests(), 0);
        assert_eq!(backend.registered(), vec![NotificationToken::new("tok-1")]);
    }

    #[tokio::test]
    async fn test_start_without_grant_requests_nothing() {
        let f = fixture(PermissionState::Granted);
        assert_eq!(f.gateway.start().await, PermissionState::Default);
        assert_eq!(f.push.token_requests(), 0);
    }

    #[tokio::test]
    async fn test_rotation_reregisters() {
        let f = fixture(PermissionState::Granted);
        f.gateway.request_permission().await;

        assert!(!f.gateway.sync_token().await);
        f.push.rotate_token("tok-2");
        assert!(f.gateway.sync_token().await);
        assert!(f.gateway.on_token_rotated(NotificationToken::new("tok-3")).await);

        assert_eq!(
            f.backend.registered(),
            vec![
                NotificationToken::new("tok-1"),
                NotificationToken::new("tok-2"),
                NotificationToken::new("tok-3"),
            ]
        );
    }

    #[tokio::test]
    async fn test_rotation_ignored_without_permission() {
        let f = fixture(PermissionState::Default);
        assert!(!f.gateway.on_token_rotated(NotificationToken::new("tok-9")).await);
        assert!(!f.gateway.sync_token().await);
        assert!(f.backend.registered().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_task_catches_rotation() {
        let f = fixture(PermissionState::Granted);
        f.gateway.request_permission().await;
        let task = f.gateway.spawn_token_refresh().expect("refresh enabled");

        f.push.rotate_token("tok-2");
        let mut status = f.gateway.watch_token();
        tokio::time::timeout(
            Duration::from_secs(7200),
            status.wait_for(|s| s.token() == Some(&NotificationToken::new("tok-2"))),
        )
        .await
        .expect("rotation detected")
        .expect("status sender alive");

        f.gateway.shutdown();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_token_events_published() {
        let f = fixture(PermissionState::Granted);
        let events = capture(&f.bus, TOKEN_REGISTERED);
        let task = f.gateway.spawn_token_events();

        f.gateway.request_permission().await;
        for _ in 0..50 {
            if !events.lock().unwrap().is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert_eq!(events.lock().unwrap().len(), 1);

        f.gateway.shutdown();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_foreground_loop_routes_until_closed() {
        let f = fixture(PermissionState::Default);
        let seen = capture(&f.bus, f.gateway.event_name());
        let (tx, rx) = mpsc::channel(4);

        tx.send(json!({"title": "Like", "body": "Someone liked your post"}))
            .await
            .unwrap();
        drop(tx);
        f.gateway.run_foreground(rx).await;

        assert_eq!(
            *seen.lock().unwrap(),
            vec![json!({"title": "Like", "body": "Someone liked your post"})]
        );
    }
}
