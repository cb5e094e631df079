//! Capped exponential backoff for scheduled full revalidations.
//!
//! A full revalidation fails when the Neos inventory cannot be fetched, which
//! is common right after startup while Neos is still booting. Triggers wrap
//! the reconciliation in [`retry_with_backoff`]:
//!
//! - delay `n` (0-indexed) is `initial_delay * multiplier^n`, capped at `max_delay`
//! - retrying stops once the next delay would exceed `max_elapsed`
//! - an optional `max_retries` bounds the number of retries independently
//! - cancellation stops the loop between attempts and interrupts the sleep

use std::fmt::Display;
use std::future::Future;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Configuration for exponential backoff retry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryConfig {
    /// Delay before the first retry.
    pub initial_delay: Duration,

    /// Cap for the exponential growth of a single delay.
    pub max_delay: Duration,

    /// Growth factor between consecutive delays.
    pub multiplier: f64,

    /// Total time budget, measured from the first attempt.
    pub max_elapsed: Duration,

    /// Maximum number of retries (not including the initial attempt).
    /// `None` retries until `max_elapsed` is spent.
    pub max_retries: Option<u32>,
}

impl RetryConfig {
    /// Default policy for full revalidations.
    ///
    /// 500ms, 750ms, 1.125s, ... capped at 60s, for up to 15 minutes.
    pub const DEFAULT: Self = Self {
        initial_delay: Duration::from_millis(500),
        max_delay: Duration::from_secs(60),
        multiplier: 1.5,
        max_elapsed: Duration::from_secs(15 * 60),
        max_retries: None,
    };

    /// Computes the delay before retry `attempt` (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(attempt.min(i32::MAX as u32) as i32);
        let delay_secs = self.initial_delay.as_secs_f64() * factor;
        let capped_secs = delay_secs.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped_secs.max(0.0))
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Result of [`retry_with_backoff`].
#[derive(Debug)]
pub enum RetryResult<T, E> {
    /// The operation succeeded.
    Success(T),

    /// Every permitted attempt failed.
    Exhausted {
        /// The last error encountered.
        last_error: E,
        /// Number of attempts made (including the initial attempt).
        attempts: u32,
    },

    /// Cancellation was requested before the operation succeeded.
    Cancelled {
        /// Number of attempts made before cancellation.
        attempts: u32,
    },
}

/// Runs `operation` until it succeeds, the retry budget is spent, or
/// `cancel` fires.
///
/// Every error is retried. Each failed attempt that will be retried is
/// logged at warn level with the upcoming delay.
pub async fn retry_with_backoff<T, E, F, Fut>(
    config: RetryConfig,
    cancel: &CancellationToken,
    mut operation: F,
) -> RetryResult<T, E>
where
    E: Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let start = Instant::now();
    let max_retries = config.max_retries.unwrap_or(u32::MAX);
    let mut attempts = 0u32;

    loop {
        if cancel.is_cancelled() {
            return RetryResult::Cancelled { attempts };
        }

        let error = match operation().await {
            Ok(value) => return RetryResult::Success(value),
            Err(e) => e,
        };
        attempts += 1;

        let retries_used = attempts - 1;
        let delay = config.delay_for_attempt(retries_used);
        if retries_used >= max_retries || start.elapsed() + delay > config.max_elapsed {
            return RetryResult::Exhausted {
                last_error: error,
                attempts,
            };
        }

        warn!(
            attempt = attempts,
            retry_in_ms = delay.as_millis() as u64,
            error = %error,
            "Attempt failed, retrying"
        );

        tokio::select! {
            _ = cancel.cancelled() => return RetryResult::Cancelled { attempts },
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
