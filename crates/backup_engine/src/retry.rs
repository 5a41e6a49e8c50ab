use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use backup_logging::{backup_debug, backup_warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Wait before the attempt following `attempt_index` (zero based).
    pub fn delay_for(&self, attempt_index: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt_index))
    }
}

/// Run `op` until it succeeds or `policy.max_attempts` attempts have failed.
///
/// Every error is retried the same way; the last one is returned. A policy
/// with zero attempts still runs `op` once.
pub async fn with_retry<T, E, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let attempts = policy.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                backup_warn!("Attempt {}/{} failed: {}", attempt + 1, attempts, err);
                if attempt + 1 >= attempts {
                    return Err(err);
                }
                let delay = policy.delay_for(attempt);
                backup_debug!("Retrying in {}ms", delay.as_millis());
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
