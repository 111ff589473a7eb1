//! Orchestration of DICT operations.
//!
//! # Data Flow
//! ```text
//! caller → Bridge::<operation>
//!     → dict validation
//!     → Translator::to_wire → Signer::sign → bacen::build_envelope
//!     → CircuitBreaker::execute → RetryExecutor::execute → Transport::send
//!     → bacen::parse_response → Translator::from_wire
//!     → EventDispatcher (mutating operations, never awaited)
//! ```
//!
//! # Design Decisions
//! - Collaborators are trait objects so tests run without a network
//! - Every failure is an [`OperationError`] carrying operation and correlation id
//! - Health checks bypass the breaker

pub mod error;
pub mod health;
pub mod orchestrator;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{BridgeError, ErrorClass, OperationError};
pub use health::{ComponentHealth, HealthReport, HealthStatus};
pub use orchestrator::Bridge;
