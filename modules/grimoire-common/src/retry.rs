use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

/// Upper bound on the random jitter added to each backoff.
const MAX_JITTER_MS: u64 = 250;

/// Bounded retry with exponential backoff (`base * 3^attempt + jitter`).
///
/// Exhaustion hands back the last outcome unchanged, so callers keep their
/// log-and-continue handling as the outer fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Single attempt, no retry.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Delay before retry number `attempt` (0-based), without jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(3u32.saturating_pow(attempt))
    }

    /// Run `op` until it succeeds, `should_retry` rejects the outcome, or
    /// attempts run out.
    pub async fn run<T, E, F, Fut, R>(&self, operation: &str, mut op: F, should_retry: R) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
        R: Fn(&Result<T, E>) -> bool,
    {
        let mut attempt = 0;
        loop {
            let outcome = op().await;
            attempt += 1;

            if attempt >= self.max_attempts || !should_retry(&outcome) {
                return outcome;
            }

            let delay = self.backoff(attempt - 1) + self.jitter();
            match &outcome {
                Err(e) => warn!(operation, attempt, error = %e, delay_ms = delay.as_millis() as u64, "Retrying after error"),
                Ok(_) => warn!(operation, attempt, delay_ms = delay.as_millis() as u64, "Retrying after retryable response"),
            }
            tokio::time::sleep(delay).await;
        }
    }

    fn jitter(&self) -> Duration {
        if self.base_delay.is_zero() {
            return Duration::ZERO;
        }
        Duration::from_millis(rand::rng().random_range(0..MAX_JITTER_MS))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(500))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy::new(max_attempts, Duration::ZERO)
    }

    #[tokio::test]
    async fn retries_until_success() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, String> = fast(3)
            .run(
                "flaky",
                || async {
                    let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                    if n < 3 { Err(format!("attempt {n}")) } else { Ok(n) }
                },
                |r| r.is_err(),
            )
            .await;

        assert_eq!(result, Ok(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_back_last_error_when_exhausted() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = fast(2)
            .run(
                "always-fails",
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err("down".to_string())
                },
                |r| r.is_err(),
            )
            .await;

        assert_eq!(result, Err("down".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn non_retryable_outcome_returns_immediately() {
        let calls = AtomicU32::new(0);
        let _: Result<(), String> = fast(5)
            .run(
                "permanent",
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err("bad request".to_string())
                },
                |_| false,
            )
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn backoff_grows_by_powers_of_three() {
        let policy = RetryPolicy::new(4, Duration::from_millis(100));
        assert_eq!(policy.backoff(0), Duration::from_millis(100));
        assert_eq!(policy.backoff(1), Duration::from_millis(300));
        assert_eq!(policy.backoff(2), Duration::from_millis(900));
    }

    #[test]
    fn zero_attempts_is_clamped_to_one() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
        assert_eq!(RetryPolicy::none().max_attempts, 1);
    }
}
