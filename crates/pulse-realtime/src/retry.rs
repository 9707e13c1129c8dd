//! Capped exponential backoff for background retries.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use pulse_core::config::RetryConfig;
use pulse_core::error::AppError;

/// Backoff schedule derived from a [`RetryConfig`].
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    max_attempts: u32,
}

impl Backoff {
    /// Build a schedule from configuration.
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            base: config.base_delay(),
            max: config.max_delay(),
            max_attempts: config.max_attempts.max(1),
        }
    }

    /// Delay to wait after the given failed attempt (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(20);
        self.base.saturating_mul(1u32 << exp).min(self.max)
    }

    /// Maximum number of attempts.
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

/// Outcome of a retried operation.
#[derive(Debug)]
pub enum RetryOutcome<T> {
    /// The operation succeeded on the given attempt.
    Succeeded { value: T, attempts: u32 },
    /// Every attempt failed; carries the last error.
    Exhausted { last_error: AppError, attempts: u32 },
    /// A non-transient error stopped the retries.
    Aborted { error: AppError, attempts: u32 },
    /// The cancellation token fired while waiting.
    Cancelled,
}

/// Run `op` until it succeeds, fails permanently, runs out of attempts, or
/// `cancel` fires. Only errors for which [`AppError::is_transient`] holds are
/// retried.
pub async fn retry_with_backoff<F, Fut, T>(
    backoff: &Backoff,
    cancel: &CancellationToken,
    mut op: F,
) -> RetryOutcome<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return RetryOutcome::Cancelled,
            result = op(attempt) => result,
        };

        match result {
            Ok(value) => {
                return RetryOutcome::Succeeded {
                    value,
                    attempts: attempt,
                };
            }
            Err(error) if !error.is_transient() => {
                return RetryOutcome::Aborted {
                    error,
                    attempts: attempt,
                };
            }
            Err(error) if attempt >= backoff.max_attempts() => {
                return RetryOutcome::Exhausted {
                    last_error: error,
                    attempts: attempt,
                };
            }
            Err(error) => {
                let delay = backoff.delay_after(attempt);
                tracing::debug!(
                    "Attempt {}/{} failed ({}), retrying in {:?}",
                    attempt,
                    backoff.max_attempts(),
                    error,
                    delay
                );
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return RetryOutcome::Cancelled,
                    _ = sleep(delay) => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn backoff(max_attempts: u32) -> Backoff {
        Backoff::from_config(&RetryConfig::new(max_attempts, 100, 1_000))
    }

    #[test]
    fn test_delay_doubles_and_caps() {
        let b = backoff(10);
        assert_eq!(b.delay_after(1), Duration::from_millis(100));
        assert_eq!(b.delay_after(2), Duration::from_millis(200));
        assert_eq!(b.delay_after(4), Duration::from_millis(800));
        assert_eq!(b.delay_after(5), Duration::from_millis(1_000));
        assert_eq!(b.delay_after(40), Duration::from_millis(1_000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let outcome = retry_with_backoff(&backoff(5), &CancellationToken::new(), |_| {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(AppError::service_unavailable("busy"))
                } else {
                    Ok("token")
                }
            }
        })
        .await;

        match outcome {
            RetryOutcome::Succeeded { value, attempts } => {
                assert_eq!(value, "token");
                assert_eq!(attempts, 3);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausts_attempts() {
        let outcome: RetryOutcome<()> =
            retry_with_backoff(&backoff(3), &CancellationToken::new(), |_| async {
                Err(AppError::service_unavailable("down"))
            })
            .await;
        assert!(matches!(outcome, RetryOutcome::Exhausted { attempts: 3, .. }));
    }

    #[tokio::test]
    async fn test_permanent_error_aborts() {
        let outcome: RetryOutcome<()> =
            retry_with_backoff(&backoff(3), &CancellationToken::new(), |_| async {
                Err(AppError::permission_denied("revoked"))
            })
            .await;
        assert!(matches!(outcome, RetryOutcome::Aborted { attempts: 1, .. }));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let outcome: RetryOutcome<()> = retry_with_backoff(&backoff(3), &cancel, |_| async {
            Err(AppError::service_unavailable("down"))
        })
        .await;
        assert!(matches!(outcome, RetryOutcome::Cancelled));
    }
}
