//! Bounded retry with exponential backoff and jitter
//!
//! Used for the two relay loops: restarting the whole pipeline after a
//! connection failure, and resubmitting an already-signed payload after an
//! unconfirmed result. Both loops give up with
//! [`RelayError::RetriesExhausted`] once the attempt budget is spent.

use crate::errors::{RelayError, RelayResult};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, warn};

/// Retry configuration with jitter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts (including initial attempt)
    pub max_attempts: u32,
    /// Base backoff delay in milliseconds
    pub base_backoff_ms: u64,
    /// Maximum backoff delay in milliseconds
    pub max_backoff_ms: u64,
    /// Jitter factor (0.0 to 1.0)
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_backoff_ms: 100,
            max_backoff_ms: 5000,
            jitter_factor: 0.2,
        }
    }
}

impl RetryConfig {
    /// No sleeping between attempts
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_backoff_ms: 0,
            max_backoff_ms: 0,
            jitter_factor: 0.0,
        }
    }

    /// Backoff before the attempt following `attempt` (0-indexed)
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let exp_backoff = (self.base_backoff_ms as f64) * 2_f64.powi(attempt.min(30) as i32);
        let capped_backoff = exp_backoff.min(self.max_backoff_ms as f64);

        let jitter_range = capped_backoff * self.jitter_factor.clamp(0.0, 1.0);
        let jitter = if jitter_range > 0.0 {
            rand::thread_rng().gen_range(-jitter_range..=jitter_range)
        } else {
            0.0
        };

        Duration::from_millis((capped_backoff + jitter).max(0.0) as u64)
    }
}

/// Retry `operation` while `should_retry` accepts its error
///
/// Errors rejected by `should_retry` are returned immediately. When every
/// attempt fails with a retryable error the last one is wrapped in
/// [`RelayError::RetriesExhausted`].
pub async fn retry_with_backoff<F, Fut, T, P>(
    operation_name: &str,
    config: &RetryConfig,
    should_retry: P,
    mut operation: F,
) -> RelayResult<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = RelayResult<T>>,
    P: Fn(&RelayError) -> bool,
{
    let start_time = Instant::now();
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        if attempt > 0 {
            debug!(
                operation = operation_name,
                attempt = attempt + 1,
                max_attempts,
                "Retrying operation"
            );
        }

        let err = match operation(attempt).await {
            Ok(result) => {
                if attempt > 0 {
                    debug!(
                        operation = operation_name,
                        attempts = attempt + 1,
                        duration_ms = start_time.elapsed().as_millis() as u64,
                        "Operation succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(err) => err,
        };

        if !should_retry(&err) {
            return Err(err);
        }

        attempt += 1;
        if attempt >= max_attempts {
            warn!(
                operation = operation_name,
                attempts = attempt,
                error = %err,
                "All retry attempts exhausted"
            );
            return Err(RelayError::RetriesExhausted {
                attempts: attempt,
                last_error: Box::new(err),
            });
        }

        let backoff = config.calculate_backoff(attempt - 1);
        debug!(
            operation = operation_name,
            attempt,
            backoff_ms = backoff.as_millis() as u64,
            error = %err,
            "Retryable error, backing off"
        );
        sleep(backoff).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_backoff_is_capped() {
        let config = RetryConfig {
            max_attempts: 10,
            base_backoff_ms: 100,
            max_backoff_ms: 1_000,
            jitter_factor: 0.0,
        };
        assert_eq!(config.calculate_backoff(0), Duration::from_millis(100));
        assert_eq!(config.calculate_backoff(2), Duration::from_millis(400));
        assert_eq!(config.calculate_backoff(8), Duration::from_millis(1_000));
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let config = RetryConfig {
            max_attempts: 3,
            base_backoff_ms: 1_000,
            max_backoff_ms: 1_000,
            jitter_factor: 0.5,
        };
        for _ in 0..50 {
            let backoff = config.calculate_backoff(0).as_millis();
            assert!((500..=1_500).contains(&backoff));
        }
    }

    #[tokio::test]
    async fn test_succeeds_after_retryable_errors() {
        let calls = AtomicU32::new(0);
        let result = retry_with_backoff(
            "flaky",
            &RetryConfig::immediate(5),
            RelayError::is_connection_failure,
            |_| async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(RelayError::network("rpc", "refused"))
                } else {
                    Ok(7)
                }
            },
        )
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: RelayResult<()> = retry_with_backoff(
            "fatal",
            &RetryConfig::immediate(5),
            RelayError::is_connection_failure,
            |_| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(RelayError::validation("no pool"))
            },
        )
        .await;

        assert!(matches!(result, Err(RelayError::Validation(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhaustion_wraps_last_error() {
        let result: RelayResult<()> = retry_with_backoff(
            "unconfirmed",
            &RetryConfig::immediate(4),
            RelayError::is_resubmittable,
            |attempt| async move {
                Err(RelayError::ChainUnconfirmed {
                    signature: format!("sig-{}", attempt),
                })
            },
        )
        .await;

        match result {
            Err(RelayError::RetriesExhausted { attempts, last_error }) => {
                assert_eq!(attempts, 4);
                assert_eq!(last_error.to_string(), "Transaction sig-3 was not confirmed");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
