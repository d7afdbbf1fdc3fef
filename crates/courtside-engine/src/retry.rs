//! Bounded retry with exponential backoff.
//!
//! Only retryable provider errors (network failures, 429, 5xx) are retried.
//! Business outcomes, auth failures and markup changes are returned on the
//! first attempt.

use std::future::Future;
use std::time::Duration;

use courtside_providers::{AbortHandle, ProviderError, ProviderResult};
use tracing::warn;

/// Retry configuration.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Always at least 1.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_backoff: Duration,
    /// Upper bound for any single delay.
    pub max_backoff: Duration,
    /// Backoff multiplier.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Builder: set the attempt budget.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Builder: set backoff parameters.
    pub fn with_backoff(mut self, initial: Duration, max: Duration, multiplier: f64) -> Self {
        self.initial_backoff = initial;
        self.max_backoff = max;
        self.multiplier = multiplier;
        self
    }

    /// Calculates the delay after `failures` consecutive failures.
    pub fn backoff_delay(&self, failures: u32) -> Duration {
        if failures == 0 {
            return Duration::ZERO;
        }

        let base = self.initial_backoff.as_secs_f64();
        let multiplier = self.multiplier.powi(failures as i32 - 1);
        let delay = base * multiplier;
        let max = self.max_backoff.as_secs_f64();

        Duration::from_secs_f64(delay.min(max))
    }

    /// Returns the delay before another attempt, or `None` if `error` must be
    /// returned as is.
    pub fn next_delay(&self, error: &ProviderError, attempt: u32) -> Option<Duration> {
        if !error.is_retryable() || attempt >= self.max_attempts {
            return None;
        }
        Some(self.backoff_delay(attempt))
    }
}

/// Runs `op` until it succeeds, fails with a non-retryable error, or the
/// attempt budget is spent. Backoff sleeps are cut short by `abort`.
pub async fn retry<T, F, Fut>(
    policy: &RetryPolicy,
    abort: &AbortHandle,
    label: &str,
    mut op: F,
) -> ProviderResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProviderResult<T>>,
{
    let mut attempt = 1;
    loop {
        abort.check(label)?;
        match op().await {
            Ok(value) => return Ok(value),
            Err(error) => match policy.next_delay(&error, attempt) {
                Some(delay) => {
                    warn!(
                        operation = label,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "Retrying after transient failure"
                    );
                    abort.sleep(delay).await?;
                    attempt += 1;
                }
                None => return Err(error),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courtside_providers::ProviderErrorCode;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> RetryPolicy {
        RetryPolicy::default().with_backoff(Duration::from_millis(1), Duration::from_millis(4), 2.0)
    }

    #[test]
    fn backoff_grows_and_caps() {
        let policy = RetryPolicy::default().with_backoff(Duration::from_secs(1), Duration::from_secs(5), 2.0);
        assert_eq!(policy.backoff_delay(0), Duration::ZERO);
        assert_eq!(policy.backoff_delay(1), Duration::from_secs(1));
        assert_eq!(policy.backoff_delay(2), Duration::from_secs(2));
        assert_eq!(policy.backoff_delay(3), Duration::from_secs(4));
        assert_eq!(policy.backoff_delay(4), Duration::from_secs(5));
    }

    #[test]
    fn only_transient_errors_get_a_delay() {
        let policy = RetryPolicy::default();
        assert!(policy.next_delay(&ProviderError::network("reset"), 1).is_some());
        assert!(policy.next_delay(&ProviderError::network("reset"), 3).is_none());
        assert!(policy.next_delay(&ProviderError::authentication("no"), 1).is_none());
        assert!(policy.next_delay(&ProviderError::markup_shape("gone"), 1).is_none());
    }

    #[tokio::test]
    async fn retries_network_errors_then_succeeds() {
        let calls = &AtomicU32::new(0);
        let result = retry(&fast(), &AbortHandle::new(), "login", move || async move {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(ProviderError::network("timeout"))
            } else {
                Ok("session")
            }
        })
        .await;
        assert_eq!(result.unwrap(), "session");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_budget() {
        let calls = &AtomicU32::new(0);
        let result: ProviderResult<()> = retry(&fast(), &AbortHandle::new(), "fetch", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ProviderError::server("503"))
        })
        .await;
        assert_eq!(result.unwrap_err().code(), ProviderErrorCode::ServerError);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn business_errors_are_not_retried() {
        let calls = &AtomicU32::new(0);
        let result: ProviderResult<()> = retry(&fast(), &AbortHandle::new(), "confirm", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ProviderError::markup_shape("token missing"))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn abort_stops_retrying() {
        let abort = AbortHandle::new();
        abort.abort();
        let result: ProviderResult<()> = retry(&fast(), &abort, "login", || async { Ok(()) }).await;
        assert!(result.unwrap_err().is_cancelled());
    }
}
