//! Retry logic.
//!
//! # Responsibilities
//! - Decide whether a failure is worth another attempt (via [`Classify`])
//! - Sleep between attempts following a [`BackoffPolicy`]
//! - Abort a pending sleep as soon as the caller's deadline or token fires
//!
//! The executor holds no per-call state: every `execute` starts with a
//! fresh attempt counter and the initial backoff.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::config::schema::RetryConfig;
use crate::resilience::backoff::BackoffPolicy;
use crate::resilience::timeouts::{CallContext, Cancellation};
use crate::resilience::Classify;

/// One failed attempt that is about to be retried.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryAttempt {
    /// 1-based number of the attempt that failed.
    pub attempt: u32,
    /// Delay before the next attempt.
    pub backoff: Duration,
    /// Rendered error of the failed attempt.
    pub error: String,
}

/// Terminal failure of a retried call.
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// The error was not retryable; returned exactly as produced.
    #[error("{0}")]
    Permanent(E),

    /// Every attempt failed with a retryable error.
    #[error("max retries exceeded after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: E },

    /// The caller gave up while an attempt or backoff was pending.
    #[error("retry aborted: {0}")]
    Cancelled(Cancellation),
}

impl<E> RetryError<E> {
    /// The underlying call error, if there was one.
    pub fn into_inner(self) -> Option<E> {
        match self {
            RetryError::Permanent(e) | RetryError::Exhausted { last: e, .. } => Some(e),
            RetryError::Cancelled(_) => None,
        }
    }
}

impl<E: Classify> Classify for RetryError<E> {
    fn is_retryable(&self) -> bool {
        false
    }

    fn cancellation(&self) -> Option<Cancellation> {
        match self {
            RetryError::Cancelled(reason) => Some(*reason),
            RetryError::Permanent(e) | RetryError::Exhausted { last: e, .. } => e.cancellation(),
        }
    }
}

type RetryObserver = Arc<dyn Fn(&RetryAttempt) + Send + Sync>;

/// Bounded exponential-backoff retry executor.
#[derive(Clone)]
pub struct RetryExecutor {
    max_retries: u32,
    backoff: BackoffPolicy,
    observer: Option<RetryObserver>,
}

impl RetryExecutor {
    /// `max_retries` retries after the first attempt, spaced by `backoff`.
    pub fn new(max_retries: u32, backoff: BackoffPolicy) -> Self {
        Self {
            max_retries,
            backoff,
            observer: None,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_retries, BackoffPolicy::from(config))
    }

    /// Invoke `observer` for every attempt that is about to be retried.
    pub fn with_observer(mut self, observer: impl Fn(&RetryAttempt) + Send + Sync + 'static) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn backoff(&self) -> &BackoffPolicy {
        &self.backoff
    }

    /// Run `op` until it succeeds, fails permanently, or retries run out.
    ///
    /// `op` receives the 1-based attempt number.
    pub async fn execute<F, Fut, T, E>(&self, ctx: &CallContext, mut op: F) -> Result<T, RetryError<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Classify + fmt::Display,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            ctx.check().map_err(RetryError::Cancelled)?;

            let error = match op(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::debug!(
                            correlation_id = %ctx.correlation_id(),
                            attempt,
                            "Call succeeded after retry"
                        );
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            if let Some(reason) = error.cancellation() {
                return Err(RetryError::Cancelled(reason));
            }

            if !error.is_retryable() {
                tracing::debug!(
                    correlation_id = %ctx.correlation_id(),
                    attempt,
                    error = %error,
                    "Non-retryable failure"
                );
                return Err(RetryError::Permanent(error));
            }

            if attempt > self.max_retries {
                tracing::warn!(
                    correlation_id = %ctx.correlation_id(),
                    attempts = attempt,
                    error = %error,
                    "Max retries exceeded"
                );
                return Err(RetryError::Exhausted { attempts: attempt, last: error });
            }

            let backoff = self.backoff.delay(attempt);
            let record = RetryAttempt {
                attempt,
                backoff,
                error: error.to_string(),
            };
            tracing::warn!(
                correlation_id = %ctx.correlation_id(),
                attempt,
                backoff_ms = backoff.as_millis() as u64,
                error = %record.error,
                "Request failed, retrying"
            );
            if let Some(observer) = &self.observer {
                observer(&record);
            }

            ctx.run(tokio::time::sleep(backoff))
                .await
                .map_err(RetryError::Cancelled)?;
        }
    }
}

impl Default for RetryExecutor {
    fn default() -> Self {
        Self::new(3, BackoffPolicy::default())
    }
}

impl fmt::Debug for RetryExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryExecutor")
            .field("max_retries", &self.max_retries)
            .field("backoff", &self.backoff)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}
