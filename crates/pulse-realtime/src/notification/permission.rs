//! Permission state tracking and the delayed prompt gate.

use std::time::Duration;

use tokio::sync::watch;

use pulse_core::types::PermissionState;

/// Process-wide mirror of the platform notification permission.
///
/// `Denied` is terminal for the session: [`PermissionTracker::transition`]
/// refuses to leave it. Only [`PermissionTracker::resync`], driven by an
/// explicit user action outside the gateway, may move away from it.
#[derive(Debug)]
pub struct PermissionTracker {
    state: watch::Sender<PermissionState>,
}

impl PermissionTracker {
    /// Start from the state the platform reports.
    pub fn new(initial: PermissionState) -> Self {
        let (state, _) = watch::channel(initial);
        Self { state }
    }

    /// Current state.
    pub fn current(&self) -> PermissionState {
        *self.state.borrow()
    }

    /// Observe state changes.
    pub fn watch(&self) -> watch::Receiver<PermissionState> {
        self.state.subscribe()
    }

    /// Apply a state change produced by the gateway.
    ///
    /// Returns `true` when the state changed.
    pub fn transition(&self, next: PermissionState) -> bool {
        let current = self.current();
        if current == PermissionState::Denied && next != PermissionState::Denied {
            tracing::debug!(
                "Ignoring permission transition denied -> {} for this session",
                next.as_str()
            );
            return false;
        }
        self.set(current, next)
    }

    /// Adopt whatever the platform reports, including leaving `Denied`.
    pub fn resync(&self, platform: PermissionState) -> bool {
        self.set(self.current(), platform)
    }

    fn set(&self, current: PermissionState, next: PermissionState) -> bool {
        if current == next {
            return false;
        }
        self.state.send_replace(next);
        tracing::info!(
            "Notification permission: {} -> {}",
            current.as_str(),
            next.as_str()
        );
        true
    }
}

/// Decides whether a permission banner should be shown.
///
/// The banner waits a fixed delay after mount so first-time visitors are not
/// prompted immediately, then shows only if the user has not decided yet.
#[derive(Debug)]
pub struct PromptGate {
    permission: watch::Receiver<PermissionState>,
    delay: Duration,
}

impl PromptGate {
    /// Create a gate over a permission receiver.
    pub fn new(permission: watch::Receiver<PermissionState>, delay: Duration) -> Self {
        Self { permission, delay }
    }

    /// Wait out the mount delay and report whether to prompt.
    pub async fn wait(&mut self) -> bool {
        tokio::time::sleep(self.delay).await;
        self.should_prompt()
    }

    /// Whether a prompt is appropriate right now.
    pub fn should_prompt(&self) -> bool {
        *self.permission.borrow() == PermissionState::Default
    }
}
