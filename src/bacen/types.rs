//! Value objects exchanged with the counterparty, and transport errors.

use std::collections::BTreeMap;
use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::bacen::tls::TlsError;
use crate::resilience::{Cancellation, Classify};

/// Every DICT operation the bridge can submit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    CreateEntry,
    GetEntry,
    UpdateEntry,
    DeleteEntry,
    CreateClaim,
    GetClaim,
    ConfirmClaim,
    CancelClaim,
    CompleteClaim,
    InitiatePortability,
    ConfirmPortability,
    CancelPortability,
}

impl Operation {
    pub const ALL: [Operation; 12] = [
        Operation::CreateEntry,
        Operation::GetEntry,
        Operation::UpdateEntry,
        Operation::DeleteEntry,
        Operation::CreateClaim,
        Operation::GetClaim,
        Operation::ConfirmClaim,
        Operation::CancelClaim,
        Operation::CompleteClaim,
        Operation::InitiatePortability,
        Operation::ConfirmPortability,
        Operation::CancelPortability,
    ];

    /// Stable wire name, also used as a metric label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::CreateEntry => "CREATE_ENTRY",
            Operation::GetEntry => "GET_ENTRY",
            Operation::UpdateEntry => "UPDATE_ENTRY",
            Operation::DeleteEntry => "DELETE_ENTRY",
            Operation::CreateClaim => "CREATE_CLAIM",
            Operation::GetClaim => "GET_CLAIM",
            Operation::ConfirmClaim => "CONFIRM_CLAIM",
            Operation::CancelClaim => "CANCEL_CLAIM",
            Operation::CompleteClaim => "COMPLETE_CLAIM",
            Operation::InitiatePortability => "INITIATE_PORTABILITY",
            Operation::ConfirmPortability => "CONFIRM_PORTABILITY",
            Operation::CancelPortability => "CANCEL_PORTABILITY",
        }
    }

    /// Counterparty path, relative to the configured base URL.
    pub fn endpoint(&self) -> &'static str {
        match self {
            Operation::CreateEntry => "/api/v1/dict/entries",
            Operation::GetEntry => "/api/v1/dict/entries/get",
            Operation::UpdateEntry => "/api/v1/dict/entries/update",
            Operation::DeleteEntry => "/api/v1/dict/entries/delete",
            Operation::CreateClaim => "/api/v1/dict/claims",
            Operation::GetClaim => "/api/v1/dict/claims/get",
            Operation::ConfirmClaim => "/api/v1/dict/claims/confirm",
            Operation::CancelClaim => "/api/v1/dict/claims/cancel",
            Operation::CompleteClaim => "/api/v1/dict/claims/complete",
            Operation::InitiatePortability => "/api/v1/dict/portabilities",
            Operation::ConfirmPortability => "/api/v1/dict/portabilities/confirm",
            Operation::CancelPortability => "/api/v1/dict/portabilities/cancel",
        }
    }

    /// Whether the operation changes directory state.
    pub fn is_mutating(&self) -> bool {
        !matches!(self, Operation::GetEntry | Operation::GetClaim)
    }

    /// Event type published after a successful mutating call.
    pub fn event_type(&self) -> Option<&'static str> {
        match self {
            Operation::CreateEntry => Some("dict.entry.created"),
            Operation::UpdateEntry => Some("dict.entry.updated"),
            Operation::DeleteEntry => Some("dict.entry.deleted"),
            Operation::CreateClaim => Some("dict.claim.created"),
            Operation::ConfirmClaim => Some("dict.claim.confirmed"),
            Operation::CancelClaim => Some("dict.claim.cancelled"),
            Operation::CompleteClaim => Some("dict.claim.completed"),
            Operation::InitiatePortability => Some("dict.portability.initiated"),
            Operation::ConfirmPortability => Some("dict.portability.confirmed"),
            Operation::CancelPortability => Some("dict.portability.cancelled"),
            Operation::GetEntry | Operation::GetClaim => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One envelope on its way to the counterparty. Immutable once built.
#[derive(Debug, Clone)]
pub struct BacenRequest {
    operation: Operation,
    payload: Vec<u8>,
    correlation_id: String,
    created_at: SystemTime,
    headers: BTreeMap<String, String>,
}

impl BacenRequest {
    pub fn new(operation: Operation, payload: Vec<u8>, correlation_id: impl Into<String>) -> Self {
        Self {
            operation,
            payload,
            correlation_id: correlation_id.into(),
            created_at: SystemTime::now(),
            headers: BTreeMap::new(),
        }
    }

    /// Attach an extra HTTP header. Consumes the request so it stays immutable afterwards.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn endpoint(&self) -> &'static str {
        self.operation.endpoint()
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }
}

/// Raw counterparty response (still wrapped in its envelope).
#[derive(Debug, Clone, PartialEq)]
pub struct BacenResponse {
    pub correlation_id: String,
    pub status: u16,
    pub payload: Vec<u8>,
    pub success: bool,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
}

impl BacenResponse {
    pub fn new(correlation_id: impl Into<String>, status: u16, payload: Vec<u8>) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            status,
            payload,
            success: (200..300).contains(&status),
            error_code: None,
            error_message: None,
        }
    }

    pub fn with_error(mut self, code: impl Into<String>, message: impl Into<String>) -> Self {
        self.success = false;
        self.error_code = Some(code.into());
        self.error_message = Some(message.into());
        self
    }

    /// True only for a 2xx status with no error code attached.
    pub fn is_success(&self) -> bool {
        self.success && self.error_code.is_none()
    }

    /// Pass a successful response through; turn an error code into a
    /// [`Fault`] and any other unsuccessful status into an HTTP error.
    pub fn into_checked(self) -> Result<Self, TransportError> {
        if self.is_success() {
            return Ok(self);
        }
        match self.error_code {
            Some(code) => Err(TransportError::Fault(Fault {
                code,
                reason: self.error_message.unwrap_or_default(),
                detail: None,
            })),
            None => Err(TransportError::Http {
                status: self.status,
                body: String::from_utf8_lossy(&self.payload).into_owned(),
            }),
        }
    }
}

/// Business fault reported by the counterparty, preserved verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fault {
    pub code: String,
    pub reason: String,
    pub detail: Option<String>,
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.code, self.reason)?;
        if let Some(detail) = &self.detail {
            write!(f, " (detail: {})", detail)?;
        }
        Ok(())
    }
}

/// Failure of a single counterparty call.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("request to {endpoint} timed out")]
    Timeout { endpoint: String },

    #[error("network error calling {endpoint}: {message}")]
    Network { endpoint: String, message: String },

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("SOAP fault: {0}")]
    Fault(Fault),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("{0}")]
    Cancelled(Cancellation),
}

impl Classify for TransportError {
    fn is_retryable(&self) -> bool {
        match self {
            TransportError::Timeout { .. } | TransportError::Network { .. } => true,
            TransportError::Http { status, .. } => {
                *status == 408 || *status == 429 || (500..600).contains(status)
            }
            TransportError::Fault(_)
            | TransportError::MalformedResponse(_)
            | TransportError::Cancelled(_) => false,
        }
    }

    fn cancellation(&self) -> Option<Cancellation> {
        match self {
            TransportError::Cancelled(reason) => Some(*reason),
            _ => None,
        }
    }
}

/// Failure to construct the counterparty client.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("counterparty base URL is required")]
    MissingBaseUrl,

    #[error("invalid counterparty base URL '{url}': {message}")]
    InvalidBaseUrl { url: String, message: String },

    #[error(transparent)]
    Tls(#[from] TlsError),

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}
