//! Retry with exponential backoff.
//!
//! Used by the catalog adapter for transient fetch failures and by the
//! realtime client's reconnect loop.

use std::future::Future;
use std::time::Duration;

use tracing::{info, warn};

/// Backoff configuration.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Multiplier applied after each retry.
    pub backoff_multiplier: f64,
    /// Cap on the delay between retries.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(200),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    /// The next delay after `current`, exponential with cap.
    pub fn next_delay(&self, current: Duration) -> Duration {
        Duration::from_secs_f64(
            (current.as_secs_f64() * self.backoff_multiplier).min(self.max_delay.as_secs_f64()),
        )
    }
}

/// Run an async operation, retrying transient failures with exponential
/// backoff. `should_retry` decides whether an error is transient;
/// permanent errors bail immediately.
pub async fn retry_with_backoff<F, Fut, T, E>(
    config: RetryConfig,
    mut operation: F,
    should_retry: impl Fn(&E) -> bool,
    operation_name: &str,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut delay = config.initial_delay;

    for attempt in 1..=config.max_attempts {
        match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    info!(operation = operation_name, attempt, "succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) => {
                if attempt == config.max_attempts || !should_retry(&err) {
                    warn!(
                        operation = operation_name,
                        attempt,
                        error = %err,
                        "operation failed permanently"
                    );
                    return Err(err);
                }

                warn!(
                    operation = operation_name,
                    attempt,
                    error = %err,
                    retry_in_ms = delay.as_millis() as u64,
                    "transient failure, retrying"
                );
                tokio::time::sleep(delay).await;
                delay = config.next_delay(delay);
            }
        }
    }

    unreachable!("loop exits via return")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn delay_grows_and_caps() {
        let config = RetryConfig {
            max_attempts: 5,
            initial_delay: Duration::from_millis(100),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_millis(300),
        };
        let d1 = config.next_delay(Duration::from_millis(100));
        assert_eq!(d1, Duration::from_millis(200));
        let d2 = config.next_delay(d1);
        assert_eq!(d2, Duration::from_millis(300));
        let d3 = config.next_delay(d2);
        assert_eq!(d3, Duration::from_millis(300));
    }

    #[tokio::test]
    async fn retries_transient_then_succeeds() {
        let attempts = AtomicU32::new(0);
        let config = RetryConfig {
            initial_delay: Duration::from_millis(1),
            ..Default::default()
        };

        let result: Result<u32, String> = retry_with_backoff(
            config,
            || {
                let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n < 3 {
                        Err("blip".to_string())
                    } else {
                        Ok(n)
                    }
                }
            },
            |_| true,
            "test_op",
        )
        .await;

        assert_eq!(result.unwrap(), 3);
    }

    #[tokio::test]
    async fn permanent_error_bails_immediately() {
        let attempts = AtomicU32::new(0);
        let result: Result<(), String> = retry_with_backoff(
            RetryConfig::default(),
            || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err("fatal".to_string()) }
            },
            |_| false,
            "test_op",
        )
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
