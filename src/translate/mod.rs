//! Mapping between caller requests and the counterparty's XML schema.
//!
//! The bridge only sees the [`Translator`] capability; [`XmlTranslator`]
//! is the default schema, built on quick-xml's serde support.

mod wire;
pub mod xml;

use thiserror::Error;

use crate::bacen::Operation;
use crate::dict::{DictRequest, DictResponse};

pub use xml::XmlTranslator;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TranslationError {
    #[error("failed to encode {operation} request: {message}")]
    Encode { operation: Operation, message: String },

    #[error("failed to decode {operation} response: {message}")]
    Decode { operation: Operation, message: String },

    #[error("invalid value '{value}' for {field}")]
    InvalidField { field: &'static str, value: String },

    #[error("expected {expected} response, got {actual}")]
    UnexpectedResponse { expected: &'static str, actual: &'static str },
}

pub trait Translator: Send + Sync {
    /// Render the request body (the element placed inside the SOAP body).
    fn to_wire(&self, request: &DictRequest, correlation_id: &str) -> Result<String, TranslationError>;

    /// Decode the SOAP body content returned for `operation`.
    fn from_wire(&self, operation: Operation, body: &[u8]) -> Result<DictResponse, TranslationError>;
}
