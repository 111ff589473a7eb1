//! In-memory collaborators for orchestrator tests.

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::bacen::{build_envelope, BacenRequest, BacenResponse, Transport, TransportError};
use crate::events::{BridgeEvent, EventPublisher, PublishError};
use crate::resilience::CallContext;
use crate::bacen::Operation;
use crate::dict::{DictRequest, DictResponse};
use crate::signer::{SignedXml, Signer, SignerError};
use crate::translate::{TranslationError, Translator};

enum Reply {
    Envelope(Vec<u8>),
    Flagged { code: String, message: String },
}

/// Replays queued outcomes in order and records what was sent.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    script: Mutex<VecDeque<Result<Reply, TransportError>>>,
    sent: Mutex<Vec<BacenRequest>>,
    pub health: Mutex<Option<Result<Duration, TransportError>>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_ok(&self, envelope: Vec<u8>) {
        self.script.lock().unwrap().push_back(Ok(Reply::Envelope(envelope)));
    }

    /// A 200 response the transport itself flagged with an error code.
    pub fn push_flagged(&self, code: &str, message: &str) {
        self.script.lock().unwrap().push_back(Ok(Reply::Flagged {
            code: code.to_string(),
            message: message.to_string(),
        }));
    }

    pub fn push_err(&self, error: TransportError) {
        self.script.lock().unwrap().push_back(Err(error));
    }

    pub fn calls(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<BacenRequest> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, ctx: &CallContext, request: &BacenRequest) -> Result<BacenResponse, TransportError> {
        ctx.check().map_err(TransportError::Cancelled)?;
        self.sent.lock().unwrap().push(request.clone());
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Ok(Reply::Envelope(payload))) => Ok(BacenResponse::new(request.correlation_id(), 200, payload)),
            Some(Ok(Reply::Flagged { code, message })) => {
                Ok(BacenResponse::new(request.correlation_id(), 200, Vec::new()).with_error(code, message))
            }
            Some(Err(error)) => Err(error),
            None => Err(TransportError::Network {
                endpoint: request.endpoint().to_string(),
                message: "no scripted response".to_string(),
            }),
        }
    }

    async fn health_check(&self, ctx: &CallContext) -> Result<Duration, TransportError> {
        ctx.check().map_err(TransportError::Cancelled)?;
        self.health
            .lock()
            .unwrap()
            .clone()
            .unwrap_or(Ok(Duration::from_millis(12)))
    }
}

/// Wraps the XML unchanged and returns a fixed detached signature.
pub(crate) struct FakeSigner {
    pub calls: AtomicU32,
    failure: Option<SignerError>,
}

impl FakeSigner {
    pub fn new() -> Self {
        Self {
            calls: AtomicU32::new(0),
            failure: None,
        }
    }

    pub fn failing(error: SignerError) -> Self {
        Self {
            calls: AtomicU32::new(0),
            failure: Some(error),
        }
    }
}

#[async_trait]
impl Signer for FakeSigner {
    async fn sign(&self, _ctx: &CallContext, xml: &str) -> Result<SignedXml, SignerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(SignedXml {
                xml: xml.to_string(),
                signature: Some("c2lnbmF0dXJl".to_string()),
            }),
        }
    }

    async fn health_check(&self, ctx: &CallContext) -> Result<Duration, SignerError> {
        ctx.check().map_err(SignerError::Cancelled)?;
        match &self.failure {
            Some(error) => Err(error.clone()),
            None => Ok(Duration::from_millis(3)),
        }
    }
}

/// Fails encoding, or decoding when `encode_ok` is set.
pub(crate) struct BrokenTranslator {
    pub encode_ok: bool,
}

impl Translator for BrokenTranslator {
    fn to_wire(&self, request: &DictRequest, _correlation_id: &str) -> Result<String, TranslationError> {
        if self.encode_ok {
            return Ok(format!("<{}/>", request.operation().as_str()));
        }
        Err(TranslationError::Encode {
            operation: request.operation(),
            message: "unsupported field".to_string(),
        })
    }

    fn from_wire(&self, operation: Operation, _body: &[u8]) -> Result<DictResponse, TranslationError> {
        Err(TranslationError::Decode {
            operation,
            message: "unexpected element".to_string(),
        })
    }
}

#[derive(Default)]
pub(crate) struct RecordingPublisher {
    events: Mutex<Vec<BridgeEvent>>,
}

impl RecordingPublisher {
    pub fn events(&self) -> Vec<BridgeEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventPublisher for RecordingPublisher {
    async fn publish(&self, event: &BridgeEvent) -> Result<(), PublishError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

/// In-memory log sink for asserting on formatted output.
#[derive(Clone, Default)]
pub(crate) struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync {
        let sink = self.clone();
        tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::INFO)
            .with_writer(move || sink.clone())
            .finish()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub(crate) fn entry_response_envelope(entry_id: &str) -> Vec<u8> {
    let body = format!(
        "<CreateEntryResponse><ResponseTime>2024-01-01T10:00:00Z</ResponseTime><Entry>\
         <EntryId>{entry_id}</EntryId><Key>12345678901</Key><KeyType>CPF</KeyType>\
         <Account><Participant>12345678</Participant><Branch>0001</Branch>\
         <AccountNumber>123456</AccountNumber><AccountType>CACC</AccountType></Account>\
         <Owner><Type>NATURAL_PERSON</Type><TaxIdNumber>12345678901</TaxIdNumber><Name>Ana Souza</Name></Owner>\
         </Entry></CreateEntryResponse>"
    );
    build_envelope(body.as_bytes(), None).unwrap()
}

pub(crate) fn claim_response_envelope(claim_id: &str, status: &str) -> Vec<u8> {
    let body = format!(
        "<ClaimResponse><Claim><ClaimId>{claim_id}</ClaimId><Type>OWNERSHIP</Type>\
         <Key>ana@example.com</Key><KeyType>EMAIL</KeyType><Status>{status}</Status>\
         <DonorParticipant>12345678</DonorParticipant></Claim></ClaimResponse>"
    );
    build_envelope(body.as_bytes(), None).unwrap()
}
