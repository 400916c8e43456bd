//! Fixed-delay retry for backend calls.
//!
//! Every attempt is separated by the same delay. There is no backoff growth
//! and no jitter: latency is dominated by model inference, and the backend's
//! transient failure rate is low.

use crate::errors::{BackendError, WeaverError};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for retry behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts, including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Delay between attempts in milliseconds.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_delay_ms() -> u64 {
    5000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: default_delay_ms(),
        }
    }
}

impl RetryConfig {
    /// Creates a new retry config.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the total attempts. Values below 1 are treated as 1.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Sets the delay between attempts.
    #[must_use]
    pub fn with_delay_ms(mut self, delay: u64) -> Self {
        self.delay_ms = delay;
        self
    }

    /// The delay as a `Duration`.
    #[must_use]
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Errors that know whether another attempt could help.
pub trait Retryable {
    /// Returns true if the operation may succeed when repeated.
    fn is_retryable(&self) -> bool;
}

impl Retryable for BackendError {
    fn is_retryable(&self) -> bool {
        BackendError::is_retryable(self)
    }
}

impl Retryable for WeaverError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Backend(e) => e.is_retryable(),
            Self::Config(_) | Self::Template(_) | Self::Validation(_) => false,
            _ => true,
        }
    }
}

impl Retryable for String {
    fn is_retryable(&self) -> bool {
        true
    }
}

/// A value together with the number of attempts it took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempted<T> {
    /// The success value or the last error.
    pub value: T,
    /// Attempts made (1-indexed).
    pub attempts: u32,
}

/// State tracking for retry operations.
#[derive(Debug, Default, Clone, Copy)]
pub struct RetryState {
    /// Attempts made so far.
    pub attempt: u32,
}

/// Outcome of a retry decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after the specified delay.
    Retry(Duration),
    /// No more attempts, give up.
    GiveUp,
    /// Don't retry, the error is not retryable.
    NotRetryable,
}

/// Decides what to do after a failed attempt.
#[must_use]
pub fn should_retry<E: Retryable>(state: &RetryState, config: &RetryConfig, error: &E) -> RetryDecision {
    if !error.is_retryable() {
        return RetryDecision::NotRetryable;
    }
    if state.attempt >= config.max_attempts {
        return RetryDecision::GiveUp;
    }
    RetryDecision::Retry(config.delay())
}

/// Executes an operation with retry logic.
///
/// # Errors
///
/// Returns the last error, with the attempt count, once attempts are
/// exhausted or a non-retryable error occurs.
pub async fn with_retry<T, E, F, Fut>(
    config: &RetryConfig,
    key: &str,
    operation: F,
) -> Result<Attempted<T>, Attempted<E>>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: Retryable + std::fmt::Display,
{
    with_retry_notify(config, key, operation, |_, _, _| {}).await
}

/// Like [`with_retry`], calling `on_retry(attempt, &error, delay)` before
/// each wait.
///
/// # Errors
///
/// See [`with_retry`].
pub async fn with_retry_notify<T, E, F, Fut, N>(
    config: &RetryConfig,
    key: &str,
    mut operation: F,
    mut on_retry: N,
) -> Result<Attempted<T>, Attempted<E>>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: Retryable + std::fmt::Display,
    N: FnMut(u32, &E, Duration),
{
    let mut state = RetryState::default();

    loop {
        state.attempt += 1;
        match operation().await {
            Ok(value) => {
                return Ok(Attempted {
                    value,
                    attempts: state.attempt,
                })
            }
            Err(e) => match should_retry(&state, config, &e) {
                RetryDecision::Retry(delay) => {
                    tracing::warn!(
                        key,
                        attempt = state.attempt,
                        max_attempts = config.max_attempts,
                        delay_ms = config.delay_ms,
                        error = %e,
                        "Retrying after error"
                    );
                    on_retry(state.attempt, &e, delay);
                    tokio::time::sleep(delay).await;
                }
                RetryDecision::GiveUp | RetryDecision::NotRetryable => {
                    tracing::error!(key, attempts = state.attempt, error = %e, "Giving up");
                    return Err(Attempted {
                        value: e,
                        attempts: state.attempt,
                    });
                }
            },
        }
    }
}
