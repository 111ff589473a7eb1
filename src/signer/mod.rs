//! XML signing capability.
//!
//! The bridge never holds the ICP-Brasil key itself; the signing service
//! does. Signing failures are terminal for the call and are not retried
//! here.

pub mod http;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::resilience::{CallContext, Cancellation};

pub use http::HttpSigner;

/// Output of the signing service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedXml {
    /// Body XML with the enveloped signature applied.
    pub xml: String,
    /// Detached signature for the WS-Security header, when the service returns one.
    pub signature: Option<String>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SignerError {
    #[error("signer unavailable: {0}")]
    Unavailable(String),

    #[error("signer rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("invalid signer response: {0}")]
    InvalidResponse(String),

    #[error("{0}")]
    Cancelled(Cancellation),
}

#[async_trait]
pub trait Signer: Send + Sync {
    async fn sign(&self, ctx: &CallContext, xml: &str) -> Result<SignedXml, SignerError>;

    /// Check the signing service, returning its latency.
    async fn health_check(&self, ctx: &CallContext) -> Result<Duration, SignerError>;
}
