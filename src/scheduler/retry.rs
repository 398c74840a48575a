//! Bounded retry policy for task iterations
//!
//! A transient failure inside one iteration is retried a fixed number of
//! times with exponential backoff. The policy never makes an iteration
//! succeed; it only bounds how hard one iteration tries before the caller
//! gives up and waits for the next tick.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use tracing::warn;

/// Bounded attempt count with exponential backoff between attempts
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Must be at least 1.
    pub max_attempts: u32,

    /// Delay before the second attempt; doubles after each further failure.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Run `op`, retrying on error up to the attempt bound.
    ///
    /// Returns the first success, or the last error once attempts are
    /// exhausted.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut delay = self.backoff;

        for attempt in 1..=attempts {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < attempts => {
                    warn!("attempt {attempt}/{attempts} failed: {e:#}, retrying in {delay:?}");
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                Err(e) => return Err(e),
            }
        }

        unreachable!("retry loop always returns")
    }
}
