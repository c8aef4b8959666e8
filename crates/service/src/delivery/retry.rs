use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::observability::SMS_RETRIES_TOTAL;

/// Errors that can tell whether another attempt might succeed.
pub trait Retryable: std::fmt::Display {
    fn is_retryable(&self) -> bool;
}

/// Bounded exponential backoff. Disabled means exactly one attempt.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    max_attempts: u32,
    backoff_base: Duration,
    backoff_max: Duration,
    enabled: bool,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff_base: Duration, backoff_max: Duration, enabled: bool) -> Self {
        Self { max_attempts: max_attempts.max(1), backoff_base, backoff_max, enabled }
    }

    pub fn single_attempt() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO, false)
    }

    pub fn from_config(cfg: &configs::RetryConfig) -> Self {
        Self::new(
            cfg.max_attempts,
            Duration::from_millis(cfg.backoff_base_ms),
            Duration::from_millis(cfg.backoff_max_ms),
            cfg.enabled,
        )
    }

    pub fn max_attempts(&self) -> u32 {
        if self.enabled { self.max_attempts } else { 1 }
    }

    /// Delay before retry number `attempt` (1-based): base * 2^(attempt-1), capped.
    pub fn backoff(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let factor = 2_u32.saturating_pow(attempt - 1);
        self.backoff_base.saturating_mul(factor).min(self.backoff_max)
    }

    async fn wait_before_retry(&self, attempt: u32) {
        let d = self.backoff(attempt);
        debug!(?d, attempt, "retrying delivery");
        sleep(d).await;
    }
}

impl Default for RetryPolicy {
    fn default() -> Self { Self::single_attempt() }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// the policy's attempts are used up. Returns the last error on failure.
pub async fn retry_with_policy<F, Fut, T, E>(policy: &RetryPolicy, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: Retryable,
{
    let max = policy.max_attempts();
    let mut attempt = 0;
    loop {
        if attempt > 0 {
            SMS_RETRIES_TOTAL.inc();
            policy.wait_before_retry(attempt).await;
        }
        match operation().await {
            Ok(v) => {
                if attempt > 0 {
                    debug!(retries = attempt, "delivery succeeded after retries");
                }
                return Ok(v);
            }
            Err(e) => {
                attempt += 1;
                if attempt >= max || !e.is_retryable() {
                    if attempt > 1 {
                        warn!(attempts = attempt, error = %e, "giving up on delivery");
                    }
                    return Err(e);
                }
                warn!(attempt, error = %e, "delivery attempt failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[derive(Debug)]
    struct Flaky(bool);

    impl std::fmt::Display for Flaky {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "flaky (retryable: {})", self.0)
        }
    }

    impl Retryable for Flaky {
        fn is_retryable(&self) -> bool { self.0 }
    }

    fn policy(enabled: bool) -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(10), enabled)
    }

    #[tokio::test]
    async fn succeeds_after_retryable_failures() {
        let counter = Arc::new(AtomicU32::new(0));
        let c = counter.clone();
        let result = retry_with_policy(&policy(true), || {
            let c = c.clone();
            async move {
                if c.fetch_add(1, Ordering::SeqCst) < 2 { Err(Flaky(true)) } else { Ok(42) }
            }
        })
        .await;
        assert_eq!(result.ok(), Some(42));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn stops_at_max_attempts() {
        let counter = Arc::new(AtomicU32::new(0));
        let c = counter.clone();
        let result = retry_with_policy(&policy(true), || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(Flaky(true))
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_error_stops_immediately() {
        let counter = Arc::new(AtomicU32::new(0));
        let c = counter.clone();
        let result = retry_with_policy(&policy(true), || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(Flaky(false))
            }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn disabled_policy_makes_one_attempt() {
        let counter = Arc::new(AtomicU32::new(0));
        let c = counter.clone();
        let _ = retry_with_policy(&policy(false), || {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(Flaky(true))
            }
        })
        .await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let p = RetryPolicy::new(10, Duration::from_millis(100), Duration::from_millis(350), true);
        assert_eq!(p.backoff(1), Duration::from_millis(100));
        assert_eq!(p.backoff(2), Duration::from_millis(200));
        assert_eq!(p.backoff(3), Duration::from_millis(350));
        assert_eq!(p.backoff(40), Duration::from_millis(350));
    }
}
