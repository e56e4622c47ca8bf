use std::future::Future;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::warn;

use super::stage::Stage;
use crate::ui::ProgressReporter;
use crate::videos::VideoApiError;

/// Ceiling applied to a server-provided `retry-after`.
pub const MAX_RETRY_AFTER_MS: u64 = 60_000;

/// Configuration for retry behavior on transient remote failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt.
    pub max_retries: u32,
    /// Base delay in milliseconds for exponential backoff.
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
        }
    }
}

impl RetryConfig {
    /// Delay before retry number `attempt` (1-based) using exponential
    /// backoff: delay = base_delay_ms * 2^(attempt - 1)
    pub fn delay_for_attempt(&self, attempt: u32) -> u64 {
        self.base_delay_ms
            .saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)))
    }

    /// Backoff delay, stretched to honor a server-provided `retry-after`
    /// capped at [`MAX_RETRY_AFTER_MS`].
    fn delay_for(&self, attempt: u32, err: &VideoApiError) -> Duration {
        let backoff = self.delay_for_attempt(attempt);
        let ms = err
            .retry_after_ms()
            .map_or(backoff, |after| after.min(MAX_RETRY_AFTER_MS).max(backoff));
        Duration::from_millis(ms)
    }
}

/// A remote call that did not succeed within the retry budget.
#[derive(Debug)]
pub struct RetryFailure {
    /// Total attempts made, including the first.
    pub attempts: u32,
    pub error: VideoApiError,
    /// The deadline passed while the failure was still transient.
    pub deadline_reached: bool,
}

/// Runs `op` until it succeeds, fails permanently, or the retry budget for
/// transient failures is spent.
///
/// With a `deadline`, no backoff sleep extends past it, and a transient
/// failure seen at or after it ends the loop with `deadline_reached` set.
pub async fn with_retry<T, F, Fut>(
    retry: &RetryConfig,
    stage: Stage,
    reporter: &dyn ProgressReporter,
    deadline: Option<Instant>,
    mut op: F,
) -> Result<T, RetryFailure>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, VideoApiError>>,
{
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt <= retry.max_retries => {
                let mut delay = retry.delay_for(attempt, &err);
                if let Some(deadline) = deadline {
                    let left = deadline.saturating_duration_since(Instant::now());
                    if left.is_zero() {
                        return Err(RetryFailure {
                            attempts: attempt,
                            error: err,
                            deadline_reached: true,
                        });
                    }
                    delay = delay.min(left);
                }
                warn!(
                    %stage,
                    attempt,
                    max_retries = retry.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "transient failure, retrying"
                );
                reporter.retrying(stage, attempt, retry.max_retries, &err.to_string(), delay);
                sleep(delay).await;
            }
            Err(error) => {
                let deadline_reached = error.is_transient()
                    && deadline.is_some_and(|deadline| Instant::now() >= deadline);
                return Err(RetryFailure {
                    attempts: attempt,
                    error,
                    deadline_reached,
                });
            }
        }
    }
}
