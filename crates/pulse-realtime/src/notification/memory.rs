//! In-process push service and token backend for single-process
//! deployments and local development.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;

use pulse_core::error::AppError;
use pulse_core::result::AppResult;
use pulse_core::traits::{PushService, TokenBackend};
use pulse_core::types::{NotificationToken, PermissionState};

/// Push service that answers permission prompts with a preset decision and
/// issues a locally held token.
#[derive(Debug)]
pub struct MemoryPushService {
    /// Platform permission.
    permission: Mutex<PermissionState>,
    /// Decision returned to the next prompt.
    answer: Mutex<PermissionState>,
    /// Token handed out by `issue_token`.
    token: Mutex<NotificationToken>,
    /// Remaining token requests that fail.
    failing_tokens: AtomicU32,
    /// Number of prompts shown.
    permission_requests: AtomicU32,
    /// Number of token requests.
    token_requests: AtomicU32,
}

impl MemoryPushService {
    /// Create a service whose prompt resolves to `answer`.
    pub fn new(answer: PermissionState, token: &str) -> Self {
        Self {
            permission: Mutex::new(PermissionState::Default),
            answer: Mutex::new(answer),
            token: Mutex::new(NotificationToken::new(token)),
            failing_tokens: AtomicU32::new(0),
            permission_requests: AtomicU32::new(0),
            token_requests: AtomicU32::new(0),
        }
    }

    /// Set the platform permission directly, as a settings change would.
    pub fn set_permission(&self, state: PermissionState) {
        *lock(&self.permission) = state;
    }

    /// Change the decision returned by the next prompt.
    pub fn set_answer(&self, state: PermissionState) {
        *lock(&self.answer) = state;
    }

    /// Replace the token, as the service does on rotation.
    pub fn rotate_token(&self, token: &str) {
        *lock(&self.token) = NotificationToken::new(token);
    }

    /// Make the next `n` token requests fail with `ServiceUnavailable`.
    pub fn fail_next_tokens(&self, n: u32) {
        self.failing_tokens.store(n, Ordering::SeqCst);
    }

    /// Number of permission prompts shown.
    pub fn permission_requests(&self) -> u32 {
        self.permission_requests.load(Ordering::SeqCst)
    }

    /// Number of token requests received.
    pub fn token_requests(&self) -> u32 {
        self.token_requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PushService for MemoryPushService {
    fn permission(&self) -> PermissionState {
        *lock(&self.permission)
    }

    async fn request_permission(&self) -> AppResult<PermissionState> {
        self.permission_requests.fetch_add(1, Ordering::SeqCst);
        let answer = *lock(&self.answer);
        *lock(&self.permission) = answer;
        Ok(answer)
    }

    async fn issue_token(&self) -> AppResult<NotificationToken> {
        self.token_requests.fetch_add(1, Ordering::SeqCst);
        if take_one(&self.failing_tokens) {
            return Err(AppError::service_unavailable("push service unavailable"));
        }
        if *lock(&self.permission) != PermissionState::Granted {
            return Err(AppError::permission_denied(
                "tokens are only issued with granted permission",
            ));
        }
        Ok(lock(&self.token).clone())
    }
}

/// Token backend that keeps registrations in memory.
#[derive(Debug, Default)]
pub struct MemoryTokenBackend {
    /// Tokens registered so far, oldest first.
    registered: Mutex<Vec<NotificationToken>>,
    /// Remaining registrations that fail.
    failing: AtomicU32,
}

impl MemoryTokenBackend {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` registrations fail.
    pub fn fail_next(&self, n: u32) {
        self.failing.store(n, Ordering::SeqCst);
    }

    /// Tokens registered so far, oldest first.
    pub fn registered(&self) -> Vec<NotificationToken> {
        lock(&self.registered).clone()
    }
}

#[async_trait]
impl TokenBackend for MemoryTokenBackend {
    async fn register_token(&self, token: &NotificationToken) -> AppResult<()> {
        if take_one(&self.failing) {
            return Err(AppError::token_registration("backend unavailable"));
        }
        lock(&self.registered).push(token.clone());
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// Decrement `counter` if it is positive; returns whether it was.
fn take_one(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}
