//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured tracing events keyed by correlation id)
//!     → metrics.rs (per-breaker collectors, per-operation counters)
//!     → redact.rs (masking applied before any sensitive value is logged)
//!
//! Consumers:
//!     → stdout (tracing-subscriber fmt layer)
//!     → Prometheus scrape endpoint
//! ```
//!
//! # Design Decisions
//! - Breaker counters live in an injected collector, not in globals
//! - Key values, tax ids and account numbers never reach a log line unmasked

pub mod logging;
pub mod metrics;
pub mod redact;

pub use metrics::CircuitMetrics;
pub use redact::mask;
