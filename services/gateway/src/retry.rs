//! Retry loop with jittered exponential backoff.
//!
//! Applied inside the circuit breaker's `call`, so every attempt the loop
//! makes is one the breaker already admitted. Only transport-class errors
//! whose rendered message matches the configured allow-list are retried; a
//! decline is a successful transaction from the transport's point of view
//! and never reaches this loop as an error.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::{GatewayError, Result};

/// Retry policy knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts = `max_retries + 1`.
    pub max_retries: u32,
    /// Base delay before the first retry.
    pub base_delay: Duration,
    /// Ceiling on any single delay.
    pub max_delay: Duration,
    /// Fraction of the exponential delay randomized away, `0.0..=1.0`.
    pub jitter_ratio: f64,
    /// Case-insensitive substrings an error message must contain to retry.
    pub retryable_markers: Vec<String>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            jitter_ratio: 0.5,
            retryable_markers: vec![
                "timeout".to_string(),
                "connection".to_string(),
                "temporar".to_string(),
                "unavailable".to_string(),
                "refused".to_string(),
                "reset".to_string(),
                "network".to_string(),
            ],
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn no_retries() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Whether an error qualifies for another attempt.
    ///
    /// The error kind gates first: validation, parse, decline, breaker, and
    /// cancellation errors never retry no matter what their text says. For
    /// transport-class errors the rendered message must then match the
    /// allow-list (an empty list accepts any transport error).
    pub fn is_retryable(&self, err: &GatewayError) -> bool {
        if !err.is_retryable() {
            return false;
        }
        if self.retryable_markers.is_empty() {
            return true;
        }
        let rendered = err.to_string().to_ascii_lowercase();
        self.retryable_markers
            .iter()
            .any(|marker| rendered.contains(&marker.to_ascii_lowercase()))
    }

    /// Delay before attempt `attempt` (1-based over retries).
    ///
    /// Exponential in the attempt number, capped at `max_delay`, with up to
    /// `jitter_ratio` of the value randomized in both directions so callers
    /// retrying in lockstep decorrelate.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
            .min(self.max_delay);
        if self.jitter_ratio <= 0.0 {
            return exp;
        }
        let jitter = exp.as_secs_f64() * self.jitter_ratio.min(1.0);
        let spread = rand::thread_rng().gen_range(-jitter..=jitter);
        let jittered = (exp.as_secs_f64() + spread).max(0.0);
        Duration::from_secs_f64(jittered).min(self.max_delay)
    }
}

/// Run `operation` under the policy, honoring cancellation between attempts.
///
/// Cancellation during a backoff sleep exits immediately with `Cancelled`;
/// cancellation during a send is the operation's own responsibility (each
/// channel threads the token through its I/O).
pub async fn retry_with_backoff<F, Fut, T>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut operation: F,
) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    for attempt in 0..=policy.max_retries {
        if attempt > 0 {
            let delay = policy.delay_for_attempt(attempt);
            tokio::select! {
                _ = cancel.cancelled() => return Err(GatewayError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
        if cancel.is_cancelled() {
            return Err(GatewayError::Cancelled);
        }

        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt < policy.max_retries && policy.is_retryable(&err) {
                    tracing::warn!(
                        attempt,
                        error = %err,
                        "channel call failed, will retry"
                    );
                    continue;
                }
                return Err(err);
            }
        }
    }
    unreachable!("retry loop returns from its final attempt")
}
