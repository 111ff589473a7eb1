//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Config → Logging/metrics → Signer, SOAP client, breaker → Bridge
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     Trigger → admin API stops accepting → event dispatcher drains → exit
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Shutdown has a grace period; undelivered events are cancelled after it

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
