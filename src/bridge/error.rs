use serde::Serialize;
use thiserror::Error;

use crate::bacen::{Fault, Operation, TransportError};
use crate::dict::ValidationError;
use crate::resilience::{BreakerError, Cancellation, Classify, RetryError};
use crate::signer::SignerError;
use crate::translate::TranslationError;

/// Why an orchestrated call failed.
#[derive(Debug, Clone, Error)]
pub enum BridgeError {
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    #[error("translation failed: {0}")]
    Translation(#[from] TranslationError),

    #[error("signing failed: {0}")]
    Signing(SignerError),

    /// The breaker rejected the call; nothing was sent.
    #[error("circuit '{name}' is open")]
    CircuitOpen { name: String },

    #[error("transport failure: {0}")]
    Transport(TransportError),

    /// The counterparty answered with a SOAP fault.
    #[error("counterparty fault: {0}")]
    ProtocolFault(Fault),

    #[error("malformed response envelope: {0}")]
    Parse(String),

    #[error("max retries exceeded after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: TransportError },

    #[error("call {0}")]
    Cancelled(Cancellation),
}

/// Coarse class of a [`BridgeError`], used as a metric label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    Validation,
    Translation,
    Signing,
    CircuitOpen,
    Transport,
    ProtocolFault,
    Parse,
    RetriesExhausted,
    Cancelled,
}

impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::Validation => "validation",
            ErrorClass::Translation => "translation",
            ErrorClass::Signing => "signing",
            ErrorClass::CircuitOpen => "circuit_open",
            ErrorClass::Transport => "transport",
            ErrorClass::ProtocolFault => "protocol_fault",
            ErrorClass::Parse => "parse",
            ErrorClass::RetriesExhausted => "retries_exhausted",
            ErrorClass::Cancelled => "cancelled",
        }
    }
}

impl BridgeError {
    pub fn class(&self) -> ErrorClass {
        match self {
            BridgeError::Validation(_) => ErrorClass::Validation,
            BridgeError::Translation(_) => ErrorClass::Translation,
            BridgeError::Signing(_) => ErrorClass::Signing,
            BridgeError::CircuitOpen { .. } => ErrorClass::CircuitOpen,
            BridgeError::Transport(_) => ErrorClass::Transport,
            BridgeError::ProtocolFault(_) => ErrorClass::ProtocolFault,
            BridgeError::Parse(_) => ErrorClass::Parse,
            BridgeError::RetriesExhausted { .. } => ErrorClass::RetriesExhausted,
            BridgeError::Cancelled(_) => ErrorClass::Cancelled,
        }
    }

    /// Whether the same request may succeed later.
    ///
    /// True for an open circuit and for transient transport failures;
    /// false for anything the counterparty or the bridge rejected outright.
    pub fn is_transient(&self) -> bool {
        match self {
            BridgeError::CircuitOpen { .. } | BridgeError::RetriesExhausted { .. } => true,
            BridgeError::Transport(e) => e.is_retryable(),
            _ => false,
        }
    }

    /// Fold the breaker/retry wrapping of a transport call into one error.
    pub(crate) fn from_gate(error: BreakerError<RetryError<TransportError>>) -> Self {
        match error {
            BreakerError::Open { name } => BridgeError::CircuitOpen { name },
            BreakerError::Inner(RetryError::Cancelled(reason)) => BridgeError::Cancelled(reason),
            BreakerError::Inner(RetryError::Exhausted { attempts, last }) => {
                BridgeError::RetriesExhausted { attempts, last }
            }
            BreakerError::Inner(RetryError::Permanent(error)) => match error {
                TransportError::Fault(fault) => BridgeError::ProtocolFault(fault),
                TransportError::MalformedResponse(message) => BridgeError::Parse(message),
                TransportError::Cancelled(reason) => BridgeError::Cancelled(reason),
                other => BridgeError::Transport(other),
            },
        }
    }
}

impl From<SignerError> for BridgeError {
    fn from(error: SignerError) -> Self {
        match error {
            SignerError::Cancelled(reason) => BridgeError::Cancelled(reason),
            other => BridgeError::Signing(other),
        }
    }
}

/// A [`BridgeError`] with the call it belongs to.
#[derive(Debug, Clone, Error)]
#[error("{operation} [{correlation_id}]: {error}")]
pub struct OperationError {
    pub operation: Operation,
    pub correlation_id: String,
    #[source]
    pub error: BridgeError,
}

impl OperationError {
    pub fn class(&self) -> ErrorClass {
        self.error.class()
    }
}
