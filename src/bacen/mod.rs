//! Counterparty (Bacen DICT) transport subsystem.
//!
//! # Data Flow
//! ```text
//! signed body XML
//!     → envelope.rs (SOAP 1.2 envelope, optional WS-Security header)
//!     → BacenRequest (operation, payload, correlation id)
//!     → transport.rs (Transport trait) → client.rs (pooled mTLS POST)
//!     → 2xx body checked for an embedded fault
//!     → BacenResponse → envelope.rs (body bytes extracted)
//! ```
//!
//! # Design Decisions
//! - TLS material is validated at construction; the client is immutable afterwards
//! - Development mode must be switched on explicitly and is logged loudly
//! - reqwest errors are mapped to [`TransportError`] and never leave this module

pub mod client;
pub mod envelope;
pub mod tls;
pub mod transport;
pub mod types;

pub use client::SoapClient;
pub use envelope::{build_envelope, detect_fault, parse_response, EnvelopeError};
pub use tls::{certificate_status, CertificateStatus, TlsError};
pub use transport::Transport;
pub use types::{BacenRequest, BacenResponse, Fault, Operation, SetupError, TransportError};
