//! Exponential backoff with jitter around store calls

use crate::config::ErrorHandlingConfig;
use crate::error::{GsiError, Result};
use std::future::Future;
use std::time::Duration;

/// Exponential backoff calculator with additive jitter
#[derive(Debug, Clone)]
pub struct Backoff {
    base_ms: u64,
    max_ms: u64,
    jitter_ratio: f64,
    attempt: u32,
}

impl Backoff {
    /// Create a new backoff starting at `base_ms` with a cap of `max_ms`.
    ///
    /// No jitter until [`Backoff::with_jitter_ratio`] is applied.
    pub fn new(base_ms: u64, max_ms: u64) -> Self {
        Self {
            base_ms,
            max_ms,
            jitter_ratio: 0.0,
            attempt: 0,
        }
    }

    /// Add up to `ratio * capped_delay` of uniform random jitter to each delay.
    pub fn with_jitter_ratio(mut self, ratio: f64) -> Self {
        self.jitter_ratio = ratio.max(0.0);
        self
    }

    /// Delay before jitter for a given attempt: `min(base * 2^attempt, max)`.
    pub fn capped_delay_ms(&self, attempt: u32) -> u64 {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        self.base_ms.saturating_mul(factor).min(self.max_ms)
    }

    /// Get the next delay duration and increment the attempt counter.
    pub fn next_delay(&mut self) -> Duration {
        let capped = self.capped_delay_ms(self.attempt);
        let jitter = if self.jitter_ratio > 0.0 {
            (rand::random::<f64>() * self.jitter_ratio * capped as f64) as u64
        } else {
            0
        };
        self.attempt = self.attempt.saturating_add(1);
        Duration::from_millis(capped.saturating_add(jitter))
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

/// Jitter applied by [`execute`]: up to 20% of the capped delay
pub const RETRY_JITTER_RATIO: f64 = 0.2;

/// Run `operation` with classification-aware retries.
///
/// Attempts `0..=config.max_retries`. A failure is retried when `is_retryable`
/// says so, or (without a predicate) when its store error code is in
/// `config.retryable_error_codes`. Non-retryable failures and the failure of
/// the final attempt are returned immediately without sleeping.
pub async fn execute<T, F, Fut>(
    mut operation: F,
    config: &ErrorHandlingConfig,
    is_retryable: Option<&(dyn Fn(&GsiError) -> bool + Send + Sync)>,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut backoff = Backoff::new(config.base_delay_ms, config.max_delay_ms)
        .with_jitter_ratio(RETRY_JITTER_RATIO);

    loop {
        let attempt = backoff.attempt();
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        let retryable = match is_retryable {
            Some(predicate) => predicate(&err),
            None => err
                .error_code()
                .is_some_and(|code| config.is_retryable_code(code)),
        };

        if !retryable || attempt >= config.max_retries {
            if retryable {
                tracing::warn!(attempts = attempt + 1, error = %err, "Retries exhausted");
            }
            return Err(err);
        }

        let delay = backoff.next_delay();
        tracing::debug!(
            attempt,
            code = err.error_code().unwrap_or("unknown"),
            ?delay,
            "Retryable store error, backing off"
        );
        tokio::time::sleep(delay).await;
    }
}
