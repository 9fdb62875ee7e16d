//! Bounded retry with linear backoff
//!
//! The policy is deliberately small: a fixed number of extra attempts, a base
//! delay that grows linearly with the attempt number, and a switch deciding
//! whether a deadline overrun counts as a transient failure.
//!
//! # Example
//!
//! ```rust,no_run
//! use marina_core::retry::{retry, RetryConfig};
//!
//! # async fn run() {
//! let result = retry(&RetryConfig::default(), |_: &std::io::Error| true, |_attempt| async {
//!     // Potentially flaky operation
//!     Ok::<_, std::io::Error>("success")
//! })
//! .await;
//! # }
//! ```

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Retry configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Extra attempts after the first one
    pub retry_attempts: u32,
    /// Delay unit; attempt `n` waits `base_delay * n`
    pub base_delay: Duration,
    /// Treat a timed-out attempt as retryable
    #[serde(default)]
    pub retry_on_timeout: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retry_attempts: 2,
            base_delay: Duration::from_millis(300),
            retry_on_timeout: false,
        }
    }
}

impl RetryConfig {
    /// Create a config for quick retries
    pub fn quick() -> Self {
        Self {
            retry_attempts: 2,
            base_delay: Duration::from_millis(50),
            retry_on_timeout: false,
        }
    }

    /// Create a config for patient retries
    pub fn patient() -> Self {
        Self {
            retry_attempts: 4,
            base_delay: Duration::from_millis(500),
            retry_on_timeout: false,
        }
    }

    /// Create a config with no retries
    pub fn no_retry() -> Self {
        Self {
            retry_attempts: 0,
            base_delay: Duration::ZERO,
            retry_on_timeout: false,
        }
    }

    /// Total attempts including the first
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.retry_attempts.saturating_add(1)
    }

    /// Calculate the delay before a given attempt (0-based; the first attempt has none)
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

/// Retry result with attempt information
#[derive(Debug)]
pub struct RetryResult<T> {
    /// The successful result
    pub value: T,
    /// Number of attempts made
    pub attempts: u32,
    /// Total time spent, including backoff
    pub total_duration: Duration,
}

/// Run `f` until it succeeds, fails with an error `should_retry` rejects, or
/// the attempt budget is spent. The last error is returned on exhaustion.
///
/// `f` receives the 0-based attempt number.
pub async fn retry<F, Fut, T, E, P>(
    config: &RetryConfig,
    should_retry: P,
    mut f: F,
) -> Result<RetryResult<T>, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    let start = Instant::now();
    let max_attempts = config.max_attempts();
    let mut attempt = 0;

    loop {
        if attempt > 0 {
            let delay = config.delay_for_attempt(attempt);
            debug!(attempt, delay_ms = delay.as_millis(), "Retrying after delay");
            tokio::time::sleep(delay).await;
        }

        match f(attempt).await {
            Ok(value) => {
                return Ok(RetryResult {
                    value,
                    attempts: attempt + 1,
                    total_duration: start.elapsed(),
                });
            }
            Err(e) if should_retry(&e) && attempt + 1 < max_attempts => {
                debug!(attempt = attempt + 1, error = %e, "Attempt failed, will retry");
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(retry_attempts: u32) -> RetryConfig {
        RetryConfig {
            retry_attempts,
            base_delay: Duration::from_millis(100),
            retry_on_timeout: false,
        }
    }

    #[tokio::test]
    async fn test_retry_success_first_attempt() {
        let result = retry(&RetryConfig::default(), |_: &String| true, |_| async {
            Ok::<_, String>("success")
        })
        .await
        .unwrap();

        assert_eq!(result.value, "success");
        assert_eq!(result.attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_success_after_failures() {
        let result = retry(&fast(2), |_: &String| true, |attempt| async move {
            if attempt < 2 {
                Err("not yet".to_string())
            } else {
                Ok("success")
            }
        })
        .await
        .unwrap();

        assert_eq!(result.value, "success");
        assert_eq!(result.attempts, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_exhausts_budget_with_linear_delays() {
        let calls = AtomicU32::new(0);
        let start = Instant::now();

        let result = retry(&fast(2), |_: &String| true, |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Err::<(), _>(format!("failure {attempt}")) }
        })
        .await;

        assert_eq!(result.unwrap_err(), "failure 2");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        // 100ms before attempt 1, 200ms before attempt 2
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(300));
        assert!(elapsed < Duration::from_millis(350));
    }

    #[tokio::test]
    async fn test_non_retryable_error_stops_immediately() {
        let calls = AtomicU32::new(0);

        let result = retry(&fast(5), |e: &String| e != "fatal", |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>("fatal".to_string()) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_delay_calculation() {
        let config = fast(3);

        assert_eq!(config.delay_for_attempt(0), Duration::ZERO);
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(config.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(300));
    }

    #[test]
    fn test_presets() {
        assert_eq!(RetryConfig::default().max_attempts(), 3);
        assert_eq!(RetryConfig::no_retry().max_attempts(), 1);
        assert!(!RetryConfig::patient().retry_on_timeout);
    }
}
