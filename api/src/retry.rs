//! Bounded retry with exponential back-off for transient failures.

#[cfg(test)]
#[path = "retry_test.rs"]
mod retry_test;

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::{ApiError, ErrorCode};

/// Largest shift applied to the base delay.
const MAX_BACKOFF_SHIFT: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub attempts: usize,
    /// Delay before the second attempt; doubles after each further failure.
    pub base_ms: u64,
}

impl RetryPolicy {
    /// A policy that never retries.
    #[must_use]
    pub fn once() -> Self {
        Self { attempts: 1, base_ms: 0 }
    }

    /// Back-off slept after failed attempt number `attempt` (1-based).
    #[must_use]
    pub fn delay(&self, attempt: usize) -> Duration {
        let shift = u32::try_from(attempt.saturating_sub(1)).unwrap_or(MAX_BACKOFF_SHIFT).min(MAX_BACKOFF_SHIFT);
        Duration::from_millis(self.base_ms.saturating_mul(1 << shift))
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempts are used up. The last error is returned.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, ApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.retryable() && attempt < attempts => {
                    let delay = self.delay(attempt);
                    warn!(
                        error = %e,
                        code = e.error_code(),
                        attempt,
                        total = attempts,
                        delay = ?delay,
                        "{label} failed; retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
