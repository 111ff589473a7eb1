//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to the counterparty:
//!     → circuit_breaker.rs (admit or reject; Open never reaches the network)
//!     → retries.rs (classify failure, back off, try again while budget remains)
//!     → timeouts.rs (caller deadline / cancellation aborts any wait or I/O)
//! ```
//!
//! # Design Decisions
//! - Retries run inside the breaker gate; only the terminal outcome is counted
//! - Errors classify themselves through [`Classify`]
//! - Caller-side cancellation never counts as a breaker failure

pub mod backoff;
pub mod circuit_breaker;
pub mod retries;
pub mod timeouts;

pub use backoff::BackoffPolicy;
pub use circuit_breaker::{BreakerError, BreakerSettings, CircuitBreaker, CircuitState, CircuitStats};
pub use retries::{RetryAttempt, RetryError, RetryExecutor};
pub use timeouts::{CallContext, Cancellation};

/// Failure classification consulted by the retry executor and breaker.
pub trait Classify {
    /// Whether another attempt may succeed (timeouts, network errors, 5xx).
    fn is_retryable(&self) -> bool;

    /// Set when the failure is the caller giving up, not the remote failing.
    fn cancellation(&self) -> Option<Cancellation> {
        None
    }
}
