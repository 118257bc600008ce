//! Transport retry policy for ARM requests.
//!
//! ARM throttles with `429` and occasionally answers `5xx` during
//! deployments. Requests that fail that way are retried with:
//! - Exponential backoff with a configurable base and cap
//! - Jitter (full or equal) so parallel runs do not retry in lockstep
//! - A server-provided `Retry-After` hint taking precedence when present
//!
//! # Example
//!
//! ```rust,ignore
//! use azure_rm::retry::RetryPolicy;
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::exponential(4, Duration::from_secs(1), Duration::from_secs(30));
//! let value = policy
//!     .execute(|| async { client.send().await }, |e| e.is_retryable(), |_| None)
//!     .await?;
//! ```

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Backoff strategy for calculating delay between retries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Constant delay between retries.
    Constant,

    /// Linear backoff: delay = initial_delay * (attempt + 1)
    Linear,

    /// Exponential backoff: delay = initial_delay * multiplier^attempt
    Exponential {
        /// Multiplier for exponential growth (default: 2.0)
        multiplier: f64,
    },
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        Self::Exponential { multiplier: 2.0 }
    }
}

impl BackoffStrategy {
    /// Calculate the delay for a given attempt number (0-indexed).
    pub fn calculate_delay(&self, attempt: u32, initial_delay: Duration) -> Duration {
        let base_millis = initial_delay.as_millis() as f64;

        let delay_millis = match self {
            Self::Constant => base_millis,
            Self::Linear => base_millis * (f64::from(attempt) + 1.0),
            Self::Exponential { multiplier } => base_millis * multiplier.powf(f64::from(attempt)),
        };

        Duration::from_millis(delay_millis as u64)
    }
}

/// Jitter strategy for adding randomness to delays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JitterStrategy {
    /// No jitter - use exact calculated delay.
    None,

    /// Full jitter: random value between 0 and calculated delay.
    #[default]
    Full,

    /// Equal jitter: half the delay plus random jitter over the other half.
    Equal,
}

impl JitterStrategy {
    /// Apply jitter to a calculated delay.
    pub fn apply(&self, delay: Duration) -> Duration {
        let delay_millis = delay.as_millis() as u64;
        let mut rng = rand::thread_rng();

        let jittered = match self {
            Self::None => delay_millis,
            Self::Full => {
                if delay_millis > 0 {
                    rng.gen_range(0..=delay_millis)
                } else {
                    0
                }
            }
            Self::Equal => {
                let half = delay_millis / 2;
                if half > 0 {
                    half + rng.gen_range(0..=half)
                } else {
                    delay_millis
                }
            }
        };

        Duration::from_millis(jittered)
    }
}

/// Retry policy configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts (0 means no retries, just the initial attempt).
    pub max_retries: u32,

    /// Initial delay before the first retry.
    #[serde(with = "humantime_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (caps exponential growth and `Retry-After`).
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,

    /// Backoff strategy for calculating delays.
    pub backoff: BackoffStrategy,

    /// Jitter strategy for adding randomness.
    pub jitter: JitterStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 4,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            backoff: BackoffStrategy::default(),
            jitter: JitterStrategy::default(),
        }
    }
}

impl RetryPolicy {
    /// Create a policy that never retries.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Create a policy with exponential backoff and full jitter.
    pub fn exponential(max_retries: u32, initial_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay,
            max_delay,
            backoff: BackoffStrategy::Exponential { multiplier: 2.0 },
            jitter: JitterStrategy::Full,
        }
    }

    /// Calculate the delay for a given attempt, before any server hint.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_delay = self.backoff.calculate_delay(attempt, self.initial_delay);
        self.jitter.apply(base_delay.min(self.max_delay))
    }

    /// Execute an async operation, retrying errors accepted by `is_retryable`.
    ///
    /// `retry_after` may return a server-provided delay which replaces the
    /// computed backoff (still capped by `max_delay`). The last error is
    /// returned once retries are exhausted.
    pub async fn execute<F, Fut, T, E, R, H>(
        &self,
        mut operation: F,
        is_retryable: R,
        retry_after: H,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
        R: Fn(&E) -> bool,
        H: Fn(&E) -> Option<Duration>,
    {
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        debug!("Request succeeded after {} retries", attempt);
                    }
                    return Ok(result);
                }
                Err(e) => {
                    if attempt >= self.max_retries || !is_retryable(&e) {
                        return Err(e);
                    }

                    let delay = retry_after(&e)
                        .map(|hint| hint.min(self.max_delay))
                        .unwrap_or_else(|| self.delay_for_attempt(attempt));

                    warn!(
                        "Attempt {} of {} failed: {}; retrying in {:?}",
                        attempt + 1,
                        self.max_retries + 1,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_exponential_backoff() {
        let backoff = BackoffStrategy::Exponential { multiplier: 2.0 };
        let initial = Duration::from_millis(100);
        assert_eq!(backoff.calculate_delay(0, initial), Duration::from_millis(100));
        assert_eq!(backoff.calculate_delay(1, initial), Duration::from_millis(200));
        assert_eq!(backoff.calculate_delay(3, initial), Duration::from_millis(800));
    }

    #[test]
    fn test_linear_and_constant_backoff() {
        let initial = Duration::from_millis(50);
        assert_eq!(BackoffStrategy::Linear.calculate_delay(2, initial), Duration::from_millis(150));
        assert_eq!(BackoffStrategy::Constant.calculate_delay(7, initial), initial);
    }

    #[test]
    fn test_jitter_bounds() {
        let delay = Duration::from_millis(1000);
        for _ in 0..50 {
            assert!(JitterStrategy::Full.apply(delay) <= delay);
            let equal = JitterStrategy::Equal.apply(delay);
            assert!(equal >= Duration::from_millis(500) && equal <= delay);
        }
        assert_eq!(JitterStrategy::None.apply(delay), delay);
    }

    #[test]
    fn test_delay_capped_by_max() {
        let policy = RetryPolicy {
            jitter: JitterStrategy::None,
            max_delay: Duration::from_secs(5),
            ..Default::default()
        };
        assert_eq!(policy.delay_for_attempt(10), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_execute_retries_until_success() {
        let policy = RetryPolicy {
            max_retries: 3,
            initial_delay: Duration::from_millis(1),
            jitter: JitterStrategy::None,
            ..Default::default()
        };
        let calls = AtomicU32::new(0);

        let result: Result<u32, String> = policy
            .execute(
                || async {
                    let n = calls.fetch_add(1, Ordering::SeqCst);
                    if n < 2 {
                        Err("throttled".to_string())
                    } else {
                        Ok(n)
                    }
                },
                |_| true,
                |_| None,
            )
            .await;

        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_execute_stops_on_permanent_error() {
        let policy = RetryPolicy::exponential(5, Duration::from_millis(1), Duration::from_millis(2));
        let calls = AtomicU32::new(0);

        let result: Result<(), String> = policy
            .execute(
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err("conflict".to_string())
                },
                |e| e != "conflict",
                |_| None,
            )
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_retry_policy() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = RetryPolicy::no_retry()
            .execute(
                || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err("boom".to_string())
                },
                |_| true,
                |_| Some(Duration::from_millis(1)),
            )
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_server_hint_is_capped() {
        let policy = RetryPolicy::exponential(1, Duration::from_secs(30), Duration::from_millis(5));
        let calls = AtomicU32::new(0);
        let started = std::time::Instant::now();

        let result: Result<(), String> = tokio_test::block_on(policy.execute(
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("throttled".to_string())
            },
            |_| true,
            |_| Some(Duration::from_secs(120)),
        ));

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
