//! Resilient bridge to the Bacen DICT directory.

pub mod admin;
pub mod bacen;
pub mod bridge;
pub mod config;
pub mod dict;
pub mod events;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod signer;
pub mod translate;

pub use bridge::{Bridge, BridgeError, HealthReport, HealthStatus, OperationError};
pub use config::BridgeConfig;
pub use lifecycle::Shutdown;
pub use resilience::CallContext;
