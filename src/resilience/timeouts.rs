//! Deadline and cancellation propagation.
//!
//! A [`CallContext`] travels with every orchestrated call: through the
//! breaker, into the retry executor's backoff sleeps, and into the
//! transport's network I/O. Whichever fires first (explicit cancellation
//! or the deadline) aborts the pending wait.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Why a call was abandoned by its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cancellation {
    Cancelled,
    DeadlineExceeded,
}

impl fmt::Display for Cancellation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cancellation::Cancelled => write!(f, "cancelled by caller"),
            Cancellation::DeadlineExceeded => write!(f, "deadline exceeded"),
        }
    }
}

/// Per-call correlation id, deadline and cancellation signal.
#[derive(Debug, Clone)]
pub struct CallContext {
    correlation_id: String,
    deadline: Option<Instant>,
    token: CancellationToken,
}

impl CallContext {
    /// Create a context with a fresh correlation id and no deadline.
    pub fn new() -> Self {
        Self::with_correlation_id(Uuid::new_v4().to_string())
    }

    /// Create a context that reuses the caller's correlation id.
    pub fn with_correlation_id(correlation_id: impl Into<String>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            deadline: None,
            token: CancellationToken::new(),
        }
    }

    /// Bound the call to `timeout` from now. An earlier deadline is kept.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Bound the call to an absolute deadline. An earlier deadline is kept.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) if current < deadline => current,
            _ => deadline,
        });
        self
    }

    /// Tie the call to an externally owned cancellation token.
    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    /// A context sharing id and deadline whose token is cancelled with this one.
    pub fn child(&self) -> Self {
        Self {
            correlation_id: self.correlation_id.clone(),
            deadline: self.deadline,
            token: self.token.child_token(),
        }
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, if one is set.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Cancel this call (and every child context).
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Non-blocking check used before starting new work.
    pub fn check(&self) -> Result<(), Cancellation> {
        if self.token.is_cancelled() {
            return Err(Cancellation::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(Cancellation::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Resolves once the call is cancelled or its deadline passes.
    pub async fn done(&self) -> Cancellation {
        match self.deadline {
            Some(deadline) => tokio::select! {
                _ = self.token.cancelled() => Cancellation::Cancelled,
                _ = tokio::time::sleep_until(deadline) => Cancellation::DeadlineExceeded,
            },
            None => {
                self.token.cancelled().await;
                Cancellation::Cancelled
            }
        }
    }

    /// Drive `fut` to completion unless the call is abandoned first.
    ///
    /// On cancellation `fut` is dropped, so no work continues in the background.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, Cancellation> {
        self.check()?;
        tokio::select! {
            biased;
            reason = self.done() => Err(reason),
            output = fut => Ok(output),
        }
    }
}

impl Default for CallContext {
    fn default() -> Self {
        Self::new()
    }
}
