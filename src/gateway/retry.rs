//! Bounded exponential-backoff retry for outbound gateway calls.
//!
//! Only transport failures are retried; business rejections surface on the
//! first attempt. Callers see the wrapped call's own result shape.

use std::future::Future;
use std::time::Duration;

use super::GatewayResult;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first call
    pub max_attempts: u32,
    /// Wait after attempt n is base_delay * 2^(n-1)
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Policy with near-zero delays, for tests
    pub fn immediate() -> Self {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
        }
    }

    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> GatewayResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = GatewayResult<T>>,
    {
        let mut attempt = 1u32;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt < self.max_attempts => {
                    let delay = self.base_delay * 2u32.saturating_pow(attempt - 1);
                    tracing::warn!(
                        operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient gateway failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    if err.is_transient() {
                        tracing::error!(
                            operation,
                            attempt,
                            error = %err,
                            "gateway call failed after retries"
                        );
                    }
                    return Err(err);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::GatewayError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn transient() -> GatewayError {
        GatewayError::Transport("connection reset".to_string())
    }

    #[tokio::test]
    async fn test_succeeds_on_third_attempt() {
        let calls = AtomicU32::new(0);
        let result = RetryPolicy::immediate()
            .run("create_payment", || {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n < 3 {
                        Err(transient())
                    } else {
                        Ok("checkout")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "checkout");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_stops_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let result: GatewayResult<()> = RetryPolicy::immediate()
            .run("create_payment", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(transient()) }
            })
            .await;

        assert!(matches!(result, Err(GatewayError::Transport(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_business_rejection_is_not_retried() {
        let calls = AtomicU32::new(0);
        let result: GatewayResult<()> = RetryPolicy::immediate()
            .run("create_payment", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(GatewayError::Business("invalid amount".to_string())) }
            })
            .await;

        assert!(matches!(result, Err(GatewayError::Business(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_first_try_success_calls_once() {
        let calls = AtomicU32::new(0);
        let result = RetryPolicy::immediate()
            .run("get_payment_status", || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(42) }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
