//! Retry with exponential backoff
//!
//! Used for the few steps where a transient browser failure is worth a second
//! attempt (launching Chrome, loading the watch page). Element waits are
//! bounded polls and never go through here.

use futures::future::BoxFuture;
use std::fmt::Display;
use std::future::Future;
use std::ops::ControlFlow;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for retry behavior
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of retry attempts after the first try
    pub max_retries: u32,

    /// Base delay in milliseconds for exponential backoff
    pub base_delay_ms: u64,

    /// Maximum delay in milliseconds (caps exponential growth)
    pub max_delay_ms: u64,

    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 1000,
            max_delay_ms: 10_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Create a retry configuration with custom max retries
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// A configuration that never retries
    pub fn none() -> Self {
        Self::new(0)
    }

    /// Delay before the given attempt (attempt 0 runs immediately)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let exponential =
            self.base_delay_ms as f64 * self.backoff_multiplier.powi((attempt - 1) as i32);
        Duration::from_millis((exponential as u64).min(self.max_delay_ms))
    }
}

/// Run `operation` until it succeeds, retries run out, or `should_retry`
/// rejects the error
///
/// Returns the last error when every attempt failed.
pub async fn retry_if<T, E, F, Fut, P>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
    should_retry: P,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    P: Fn(&E) -> bool,
{
    let mut attempt = 0;

    loop {
        backoff(config, operation_name, attempt).await;

        let result = operation().await;
        match settle(config, operation_name, attempt, result, &should_retry) {
            ControlFlow::Break(result) => return result,
            ControlFlow::Continue(()) => attempt += 1,
        }
    }
}

/// Like [`retry_if`], for operations that borrow mutable state
///
/// Each attempt gets `context` reborrowed for the lifetime of its future, so
/// the operation can call `&mut self` methods on it.
pub async fn retry_with_context<C, T, E, F, P>(
    config: &RetryConfig,
    operation_name: &str,
    context: &mut C,
    mut operation: F,
    should_retry: P,
) -> Result<T, E>
where
    C: ?Sized,
    F: for<'c> FnMut(&'c mut C) -> BoxFuture<'c, Result<T, E>>,
    E: Display,
    P: Fn(&E) -> bool,
{
    let mut attempt = 0;

    loop {
        backoff(config, operation_name, attempt).await;

        let result = operation(&mut *context).await;
        match settle(config, operation_name, attempt, result, &should_retry) {
            ControlFlow::Break(result) => return result,
            ControlFlow::Continue(()) => attempt += 1,
        }
    }
}

async fn backoff(config: &RetryConfig, operation_name: &str, attempt: u32) {
    let delay = config.delay_for(attempt);
    if !delay.is_zero() {
        debug!(
            operation = operation_name,
            attempt,
            delay_ms = delay.as_millis() as u64,
            "Retrying after delay"
        );
        tokio::time::sleep(delay).await;
    }
}

/// Return the result, or continue when the error may be retried
fn settle<T, E, P>(
    config: &RetryConfig,
    operation_name: &str,
    attempt: u32,
    result: Result<T, E>,
    should_retry: &P,
) -> ControlFlow<Result<T, E>>
where
    E: Display,
    P: Fn(&E) -> bool,
{
    match result {
        Ok(value) => {
            if attempt > 0 {
                debug!(operation = operation_name, attempt, "Succeeded after retry");
            }
            ControlFlow::Break(Ok(value))
        }
        Err(e) if attempt < config.max_retries && should_retry(&e) => {
            warn!(
                operation = operation_name,
                attempt,
                max_retries = config.max_retries,
                error = %e,
                "Operation failed, will retry"
            );
            ControlFlow::Continue(())
        }
        Err(e) => ControlFlow::Break(Err(e)),
    }
}

/// Retry every error
pub async fn with_retry<T, E, F, Fut>(
    config: &RetryConfig,
    operation_name: &str,
    operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    retry_if(config, operation_name, operation, |_| true).await
}
