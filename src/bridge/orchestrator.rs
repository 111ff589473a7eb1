//! The DICT bridge orchestrator.
//!
//! Every operation follows the same pipeline:
//!
//! ```text
//! validate → translate → sign → envelope
//!     → CircuitBreaker(RetryExecutor(Transport::send))
//!     → parse envelope → translate back → event (mutating operations only)
//! ```
//!
//! Validation, translation, signing and parse failures never reach the
//! breaker. Transport failures and counterparty faults do.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::Instrument;

use crate::bacen::client::PARTICIPANT_HEADER;
use crate::bacen::{build_envelope, parse_response, BacenRequest, BacenResponse, Operation, Transport};
use crate::bridge::error::{BridgeError, OperationError};
use crate::dict::{
    CancelClaimRequest, CancelPortabilityRequest, ClaimResponse, CompleteClaimRequest, ConfirmClaimRequest,
    ConfirmPortabilityRequest, CreateClaimRequest, CreateEntryRequest, DeleteEntryRequest, DeleteEntryResponse,
    DictRequest, DictResponse, EntryResponse, GetClaimRequest, GetEntryRequest, InitiatePortabilityRequest,
    PortabilityResponse, UpdateEntryRequest,
};
use crate::events::{BridgeEvent, EventDispatcher, PublishHandle};
use crate::observability::metrics::record_operation;
use crate::resilience::{CallContext, CircuitBreaker, CircuitStats, RetryExecutor};
use crate::signer::Signer;
use crate::translate::{TranslationError, Translator};

/// Shared, cloneable entry point for every DICT operation.
#[derive(Clone)]
pub struct Bridge {
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) signer: Arc<dyn Signer>,
    translator: Arc<dyn Translator>,
    pub(crate) breaker: Arc<CircuitBreaker>,
    retry: RetryExecutor,
    events: Option<Arc<EventDispatcher>>,
    call_timeout: Option<Duration>,
    participant: Option<String>,
    pub(crate) cert_path: Option<String>,
}

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("circuit", &self.breaker.name())
            .field("retry", &self.retry)
            .field("events", &self.events.is_some())
            .field("call_timeout", &self.call_timeout)
            .field("participant", &self.participant)
            .field("cert_path", &self.cert_path)
            .finish_non_exhaustive()
    }
}

impl Bridge {
    pub fn new(
        transport: Arc<dyn Transport>,
        signer: Arc<dyn Signer>,
        translator: Arc<dyn Translator>,
        breaker: Arc<CircuitBreaker>,
        retry: RetryExecutor,
    ) -> Self {
        Self {
            transport,
            signer,
            translator,
            breaker,
            retry,
            events: None,
            call_timeout: None,
            participant: None,
            cert_path: None,
        }
    }

    /// Announce successful mutating operations through `events`.
    pub fn with_events(mut self, events: Arc<EventDispatcher>) -> Self {
        self.events = Some(events);
        self
    }

    /// Bound every call to `timeout` on top of the caller's own deadline.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = Some(timeout);
        self
    }

    /// ISPB sent with every request in the participant header.
    pub fn with_participant(mut self, ispb: impl Into<String>) -> Self {
        self.participant = Some(ispb.into());
        self
    }

    /// Client certificate reported by [`health_check`](Self::health_check).
    pub fn with_certificate(mut self, cert_path: impl Into<String>) -> Self {
        self.cert_path = Some(cert_path.into());
        self
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    pub fn events(&self) -> Option<&Arc<EventDispatcher>> {
        self.events.as_ref()
    }

    pub fn circuit_stats(&self) -> CircuitStats {
        self.breaker.stats()
    }

    /// Force the breaker closed. Administrative use only.
    pub fn reset_circuit(&self) {
        tracing::warn!(circuit = self.breaker.name(), "Circuit breaker reset by operator");
        self.breaker.reset();
    }

    pub async fn create_entry(
        &self,
        ctx: &CallContext,
        request: CreateEntryRequest,
    ) -> Result<EntryResponse, OperationError> {
        let response = self.execute(ctx, DictRequest::CreateEntry(request)).await?;
        expect(ctx, Operation::CreateEntry, "entry", response.into_entry())
    }

    pub async fn get_entry(&self, ctx: &CallContext, request: GetEntryRequest) -> Result<EntryResponse, OperationError> {
        let response = self.execute(ctx, DictRequest::GetEntry(request)).await?;
        expect(ctx, Operation::GetEntry, "entry", response.into_entry())
    }

    pub async fn update_entry(
        &self,
        ctx: &CallContext,
        request: UpdateEntryRequest,
    ) -> Result<EntryResponse, OperationError> {
        let response = self.execute(ctx, DictRequest::UpdateEntry(request)).await?;
        expect(ctx, Operation::UpdateEntry, "entry", response.into_entry())
    }

    pub async fn delete_entry(
        &self,
        ctx: &CallContext,
        request: DeleteEntryRequest,
    ) -> Result<DeleteEntryResponse, OperationError> {
        let response = self.execute(ctx, DictRequest::DeleteEntry(request)).await?;
        expect(ctx, Operation::DeleteEntry, "deleted", response.into_deleted())
    }

    pub async fn create_claim(
        &self,
        ctx: &CallContext,
        request: CreateClaimRequest,
    ) -> Result<ClaimResponse, OperationError> {
        let response = self.execute(ctx, DictRequest::CreateClaim(request)).await?;
        expect(ctx, Operation::CreateClaim, "claim", response.into_claim())
    }

    pub async fn get_claim(&self, ctx: &CallContext, request: GetClaimRequest) -> Result<ClaimResponse, OperationError> {
        let response = self.execute(ctx, DictRequest::GetClaim(request)).await?;
        expect(ctx, Operation::GetClaim, "claim", response.into_claim())
    }

    pub async fn confirm_claim(
        &self,
        ctx: &CallContext,
        request: ConfirmClaimRequest,
    ) -> Result<ClaimResponse, OperationError> {
        let response = self.execute(ctx, DictRequest::ConfirmClaim(request)).await?;
        expect(ctx, Operation::ConfirmClaim, "claim", response.into_claim())
    }

    pub async fn cancel_claim(
        &self,
        ctx: &CallContext,
        request: CancelClaimRequest,
    ) -> Result<ClaimResponse, OperationError> {
        let response = self.execute(ctx, DictRequest::CancelClaim(request)).await?;
        expect(ctx, Operation::CancelClaim, "claim", response.into_claim())
    }

    pub async fn complete_claim(
        &self,
        ctx: &CallContext,
        request: CompleteClaimRequest,
    ) -> Result<ClaimResponse, OperationError> {
        let response = self.execute(ctx, DictRequest::CompleteClaim(request)).await?;
        expect(ctx, Operation::CompleteClaim, "claim", response.into_claim())
    }

    pub async fn initiate_portability(
        &self,
        ctx: &CallContext,
        request: InitiatePortabilityRequest,
    ) -> Result<PortabilityResponse, OperationError> {
        let response = self.execute(ctx, DictRequest::InitiatePortability(request)).await?;
        expect(ctx, Operation::InitiatePortability, "portability", response.into_portability())
    }

    pub async fn confirm_portability(
        &self,
        ctx: &CallContext,
        request: ConfirmPortabilityRequest,
    ) -> Result<PortabilityResponse, OperationError> {
        let response = self.execute(ctx, DictRequest::ConfirmPortability(request)).await?;
        expect(ctx, Operation::ConfirmPortability, "portability", response.into_portability())
    }

    pub async fn cancel_portability(
        &self,
        ctx: &CallContext,
        request: CancelPortabilityRequest,
    ) -> Result<PortabilityResponse, OperationError> {
        let response = self.execute(ctx, DictRequest::CancelPortability(request)).await?;
        expect(ctx, Operation::CancelPortability, "portability", response.into_portability())
    }

    /// Run any operation through the pipeline.
    pub async fn execute(&self, ctx: &CallContext, request: DictRequest) -> Result<DictResponse, OperationError> {
        self.execute_with_event(ctx, request).await.map(|(response, _)| response)
    }

    /// Like [`execute`](Self::execute), also returning the handle of the
    /// event publish started for a mutating operation.
    pub async fn execute_with_event(
        &self,
        ctx: &CallContext,
        request: DictRequest,
    ) -> Result<(DictResponse, Option<PublishHandle>), OperationError> {
        let operation = request.operation();
        let ctx = match self.call_timeout {
            Some(timeout) => ctx.child().with_timeout(timeout),
            None => ctx.clone(),
        };
        let span = tracing::info_span!(
            "dict_call",
            correlation_id = %ctx.correlation_id(),
            operation = %operation,
        );

        let outcome = async {
            let started = Instant::now();
            let result = self.run(&ctx, &request).await;
            let elapsed = started.elapsed();
            match result {
                Ok(response) => {
                    record_operation(operation.as_str(), "success", elapsed);
                    tracing::info!(
                        elapsed_ms = elapsed.as_millis() as u64,
                        response = response.kind(),
                        "DICT call succeeded"
                    );
                    let handle = self.publish(&ctx, operation, &response);
                    Ok((response, handle))
                }
                Err(error) => {
                    let class = error.class();
                    record_operation(operation.as_str(), class.as_str(), elapsed);
                    tracing::warn!(
                        elapsed_ms = elapsed.as_millis() as u64,
                        class = class.as_str(),
                        error = %error,
                        "DICT call failed"
                    );
                    Err(error)
                }
            }
        }
        .instrument(span)
        .await;

        outcome.map_err(|error| OperationError {
            operation,
            correlation_id: ctx.correlation_id().to_string(),
            error,
        })
    }

    async fn run(&self, ctx: &CallContext, request: &DictRequest) -> Result<DictResponse, BridgeError> {
        let operation = request.operation();
        tracing::info!(request = %request.log_summary(), "DICT call started");

        request.validate()?;
        ctx.check().map_err(BridgeError::Cancelled)?;

        let xml = self.translator.to_wire(request, ctx.correlation_id())?;
        let signed = self.signer.sign(ctx, &xml).await?;
        let envelope = build_envelope(signed.xml.as_bytes(), signed.signature.as_deref()).map_err(|e| {
            BridgeError::Translation(TranslationError::Encode {
                operation,
                message: e.to_string(),
            })
        })?;
        let mut outbound = BacenRequest::new(operation, envelope, ctx.correlation_id());
        if let Some(ispb) = &self.participant {
            outbound = outbound.with_header(PARTICIPANT_HEADER, ispb.as_str());
        }

        let transport = &self.transport;
        let retry = &self.retry;
        let outbound_ref = &outbound;
        let response = self
            .breaker
            .execute(|| {
                retry.execute(ctx, move |_| async move {
                    transport.send(ctx, outbound_ref).await.and_then(BacenResponse::into_checked)
                })
            })
            .await
            .map_err(BridgeError::from_gate)?;

        let body = parse_response(&response.payload).map_err(|e| BridgeError::Parse(e.to_string()))?;
        Ok(self.translator.from_wire(operation, &body)?)
    }

    fn publish(&self, ctx: &CallContext, operation: Operation, response: &DictResponse) -> Option<PublishHandle> {
        let events = self.events.as_ref()?;
        let event = BridgeEvent::for_operation(
            operation,
            ctx.correlation_id(),
            response.subject_id().map(str::to_string),
            response.event_payload(),
        )?;
        match events.dispatch(event) {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::warn!(error = %e, "Operation event not published");
                None
            }
        }
    }
}

fn expect<T>(
    ctx: &CallContext,
    operation: Operation,
    expected: &'static str,
    response: Result<T, DictResponse>,
) -> Result<T, OperationError> {
    response.map_err(|other| OperationError {
        operation,
        correlation_id: ctx.correlation_id().to_string(),
        error: BridgeError::Translation(TranslationError::UnexpectedResponse {
            expected,
            actual: other.kind(),
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bacen::{Fault, TransportError};
    use crate::bridge::error::ErrorClass;
    use crate::bridge::testing::*;
    use crate::dict::requests::fixtures;
    use crate::dict::{ClaimRef, EntryLookup};
    use crate::config::schema::EventsConfig;
    use crate::events::{LogPublisher, PublishError};
    use crate::resilience::{BackoffPolicy, BreakerSettings, CircuitState};
    use crate::signer::SignerError;
    use crate::translate::XmlTranslator;
    use std::sync::atomic::Ordering;

    fn bridge_with(transport: Arc<ScriptedTransport>, signer: Arc<FakeSigner>, max_failures: u32) -> Bridge {
        let breaker = Arc::new(CircuitBreaker::new(BreakerSettings {
            name: "test".to_string(),
            max_failures,
            timeout: Duration::from_secs(60),
            max_half_open_requests: 1,
        }));
        Bridge::new(
            transport,
            signer,
            Arc::new(XmlTranslator),
            breaker,
            RetryExecutor::new(2, BackoffPolicy::default()),
        )
    }

    #[tokio::test]
    async fn test_create_entry_end_to_end() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_ok(entry_response_envelope("entry-1"));
        let signer = Arc::new(FakeSigner::new());
        let bridge = bridge_with(transport.clone(), signer.clone(), 5);

        let ctx = CallContext::with_correlation_id("corr-1");
        let response = bridge.create_entry(&ctx, fixtures::create_entry()).await.unwrap();
        assert_eq!(response.entry.entry_id.as_deref(), Some("entry-1"));

        let sent = transport.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].operation(), Operation::CreateEntry);
        assert_eq!(sent[0].correlation_id(), "corr-1");
        let envelope = String::from_utf8(sent[0].payload().to_vec()).unwrap();
        assert!(envelope.contains("<CreateEntryRequest>"));
        assert!(envelope.contains("wsse:Signature"));
        assert_eq!(signer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_validation_failure_never_reaches_signer_or_breaker() {
        let transport = Arc::new(ScriptedTransport::new());
        let signer = Arc::new(FakeSigner::new());
        let bridge = bridge_with(transport.clone(), signer.clone(), 1);

        let err = bridge
            .get_claim(
                &CallContext::new(),
                GetClaimRequest {
                    claim: ClaimRef::ClaimId(String::new()),
                },
            )
            .await
            .unwrap_err();

        assert_eq!(err.class(), ErrorClass::Validation);
        assert_eq!(err.operation, Operation::GetClaim);
        assert_eq!(signer.calls.load(Ordering::SeqCst), 0);
        assert_eq!(transport.calls(), 0);
        assert_eq!(bridge.circuit_stats().total_failures, 0);
    }

    #[tokio::test]
    async fn test_signing_failure_is_not_retried_or_counted() {
        let transport = Arc::new(ScriptedTransport::new());
        let signer = Arc::new(FakeSigner::failing(SignerError::Unavailable("hsm offline".into())));
        let bridge = bridge_with(transport.clone(), signer.clone(), 1);

        let err = bridge
            .get_entry(
                &CallContext::new(),
                GetEntryRequest {
                    lookup: EntryLookup::EntryId("entry-1".into()),
                },
            )
            .await
            .unwrap_err();

        assert_eq!(err.class(), ErrorClass::Signing);
        assert_eq!(signer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(transport.calls(), 0);
        assert_eq!(bridge.breaker().state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_fault_is_not_retried_but_counts_toward_breaker() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_err(TransportError::Fault(Fault {
            code: "soap:Sender".into(),
            reason: "Entry not found".into(),
            detail: Some("<Code>ENTRY_NOT_FOUND</Code>".into()),
        }));
        let bridge = bridge_with(transport.clone(), Arc::new(FakeSigner::new()), 1);

        let err = bridge
            .delete_entry(
                &CallContext::new(),
                DeleteEntryRequest {
                    entry_id: "entry-1".into(),
                    reason: None,
                },
            )
            .await
            .unwrap_err();

        match err.error {
            BridgeError::ProtocolFault(fault) => {
                assert_eq!(fault.reason, "Entry not found");
                assert_eq!(fault.detail.as_deref(), Some("<Code>ENTRY_NOT_FOUND</Code>"));
            }
            other => panic!("expected protocol fault, got {other:?}"),
        }
        assert_eq!(transport.calls(), 1);
        assert_eq!(bridge.breaker().state(), CircuitState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_retried_inside_breaker() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_err(TransportError::Timeout {
            endpoint: "/api/v1/dict/claims/get".into(),
        });
        transport.push_err(TransportError::Http {
            status: 503,
            body: "busy".into(),
        });
        transport.push_ok(claim_response_envelope("claim-1", "OPEN"));
        let bridge = bridge_with(transport.clone(), Arc::new(FakeSigner::new()), 1);

        let response = bridge
            .get_claim(
                &CallContext::new(),
                GetClaimRequest {
                    claim: ClaimRef::ClaimId("claim-1".into()),
                },
            )
            .await
            .unwrap();

        assert_eq!(response.claim.claim_id, "claim-1");
        assert_eq!(transport.calls(), 3);
        let stats = bridge.circuit_stats();
        assert_eq!(stats.state, CircuitState::Closed);
        assert_eq!(stats.total_successes, 1);
        assert_eq!(stats.total_failures, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_circuit_rejects_without_network() {
        let transport = Arc::new(ScriptedTransport::new());
        for _ in 0..3 {
            transport.push_err(TransportError::Http {
                status: 500,
                body: String::new(),
            });
        }
        let bridge = bridge_with(transport.clone(), Arc::new(FakeSigner::new()), 1);
        let request = || GetEntryRequest {
            lookup: EntryLookup::ExternalId("ext-1".into()),
        };

        let err = bridge.get_entry(&CallContext::new(), request()).await.unwrap_err();
        assert_eq!(err.class(), ErrorClass::RetriesExhausted);
        assert_eq!(transport.calls(), 3);

        let err = bridge.get_entry(&CallContext::new(), request()).await.unwrap_err();
        assert_eq!(err.class(), ErrorClass::CircuitOpen);
        assert!(err.error.is_transient());
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test]
    async fn test_malformed_envelope_is_parse_error() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_ok(b"<html>gateway</html>".to_vec());
        let bridge = bridge_with(transport.clone(), Arc::new(FakeSigner::new()), 5);

        let err = bridge
            .execute(
                &CallContext::new(),
                DictRequest::GetEntry(GetEntryRequest {
                    lookup: EntryLookup::EntryId("entry-1".into()),
                }),
            )
            .await
            .unwrap_err();
        assert_eq!(err.class(), ErrorClass::Parse);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_aborts_backoff_and_is_not_counted() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_err(TransportError::Network {
            endpoint: "/api/v1/dict/entries/get".into(),
            message: "connection reset".into(),
        });
        let bridge = bridge_with(transport.clone(), Arc::new(FakeSigner::new()), 1)
            .with_call_timeout(Duration::from_millis(500));

        let err = bridge
            .get_entry(
                &CallContext::new(),
                GetEntryRequest {
                    lookup: EntryLookup::EntryId("entry-1".into()),
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err.error,
            BridgeError::Cancelled(crate::resilience::Cancellation::DeadlineExceeded)
        ));
        assert_eq!(transport.calls(), 1);
        assert_eq!(bridge.breaker().state(), CircuitState::Closed);
        assert_eq!(bridge.circuit_stats().total_failures, 0);
    }

    #[tokio::test]
    async fn test_mutating_success_publishes_event() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_ok(claim_response_envelope("claim-9", "CANCELLED"));
        let publisher = Arc::new(RecordingPublisher::default());
        let dispatcher = Arc::new(EventDispatcher::with_retry(
            publisher.clone(),
            4,
            RetryExecutor::new(0, BackoffPolicy::default()),
        ));
        let bridge = bridge_with(transport, Arc::new(FakeSigner::new()), 5).with_events(dispatcher);

        let (response, handle) = bridge
            .execute_with_event(
                &CallContext::with_correlation_id("corr-9"),
                DictRequest::CancelClaim(CancelClaimRequest {
                    claim: ClaimRef::ClaimId("claim-9".into()),
                    reason: "USER_REQUESTED".into(),
                }),
            )
            .await
            .unwrap();
        assert_eq!(response.kind(), "claim");

        let handle = handle.expect("mutating operation publishes");
        assert_eq!(handle.wait().await, Ok::<(), PublishError>(()));
        let events = publisher.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "dict.claim.cancelled");
        assert_eq!(events[0].subject_id.as_deref(), Some("claim-9"));
        assert_eq!(events[0].correlation_id, "corr-9");
    }

    #[tokio::test]
    async fn test_logged_events_never_carry_raw_keys() {
        let logs = CapturedLogs::default();
        let _guard = tracing::subscriber::set_default(logs.subscriber());

        let transport = Arc::new(ScriptedTransport::new());
        transport.push_ok(entry_response_envelope("entry-1"));
        let dispatcher = Arc::new(EventDispatcher::new(Arc::new(LogPublisher), &EventsConfig::default()));
        let bridge = bridge_with(transport, Arc::new(FakeSigner::new()), 5).with_events(dispatcher);

        let (_, handle) = bridge
            .execute_with_event(&CallContext::new(), DictRequest::CreateEntry(fixtures::create_entry()))
            .await
            .unwrap();
        handle.expect("create publishes an event").wait().await.unwrap();

        let output = logs.contents();
        assert!(output.contains("Event published"));
        assert!(output.contains("CPF:12****01"));
        assert!(!output.contains("12345678901"));
        assert!(!output.contains("Ana Souza"));
    }

    #[tokio::test]
    async fn test_participant_header_sent_when_configured() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_ok(entry_response_envelope("entry-1"));
        let bridge = bridge_with(transport.clone(), Arc::new(FakeSigner::new()), 5).with_participant("12345678");

        bridge.create_entry(&CallContext::new(), fixtures::create_entry()).await.unwrap();

        let sent = transport.requests();
        assert_eq!(
            sent[0].headers().get(PARTICIPANT_HEADER).map(String::as_str),
            Some("12345678")
        );
    }

    #[tokio::test]
    async fn test_flagged_response_is_fault_counted_by_breaker() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_flagged("DICT-409", "Entry already exists");
        let bridge = bridge_with(transport.clone(), Arc::new(FakeSigner::new()), 5);

        let err = bridge
            .create_entry(&CallContext::new(), fixtures::create_entry())
            .await
            .unwrap_err();

        match &err.error {
            BridgeError::ProtocolFault(fault) => assert_eq!(fault.code, "DICT-409"),
            other => panic!("expected protocol fault, got {other:?}"),
        }
        assert_eq!(transport.calls(), 1);
        assert_eq!(bridge.circuit_stats().consecutive_failures, 1);
    }

    #[tokio::test]
    async fn test_reads_publish_nothing() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_ok(claim_response_envelope("claim-1", "OPEN"));
        let publisher = Arc::new(RecordingPublisher::default());
        let dispatcher = Arc::new(EventDispatcher::with_retry(
            publisher.clone(),
            4,
            RetryExecutor::new(0, BackoffPolicy::default()),
        ));
        let bridge = bridge_with(transport, Arc::new(FakeSigner::new()), 5).with_events(dispatcher);

        let (_, handle) = bridge
            .execute_with_event(
                &CallContext::new(),
                DictRequest::GetClaim(GetClaimRequest {
                    claim: ClaimRef::ClaimId("claim-1".into()),
                }),
            )
            .await
            .unwrap();
        assert!(handle.is_none());
        assert!(publisher.events().is_empty());
    }

    fn bridge_with_translator(transport: Arc<ScriptedTransport>, signer: Arc<FakeSigner>, encode_ok: bool) -> Bridge {
        Bridge::new(
            transport,
            signer,
            Arc::new(BrokenTranslator { encode_ok }),
            Arc::new(CircuitBreaker::new(BreakerSettings::default())),
            RetryExecutor::new(2, BackoffPolicy::default()),
        )
    }

    #[tokio::test]
    async fn test_encode_failure_stops_before_signing() {
        let transport = Arc::new(ScriptedTransport::new());
        let signer = Arc::new(FakeSigner::new());
        let bridge = bridge_with_translator(transport.clone(), signer.clone(), false);

        let err = bridge
            .create_entry(&CallContext::new(), fixtures::create_entry())
            .await
            .unwrap_err();

        assert_eq!(err.class(), ErrorClass::Translation);
        assert_eq!(signer.calls.load(Ordering::SeqCst), 0);
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_decode_failure_is_not_a_breaker_failure() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_ok(entry_response_envelope("entry-1"));
        let bridge = bridge_with_translator(transport.clone(), Arc::new(FakeSigner::new()), true);

        let err = bridge
            .get_entry(
                &CallContext::new(),
                GetEntryRequest {
                    lookup: EntryLookup::EntryId("entry-1".into()),
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err.error,
            BridgeError::Translation(TranslationError::Decode {
                operation: Operation::GetEntry,
                ..
            })
        ));
        assert_eq!(transport.calls(), 1);
        assert_eq!(bridge.circuit_stats().total_failures, 0);
    }

    #[tokio::test]
    async fn test_mismatched_response_kind_is_translation_error() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push_ok(claim_response_envelope("claim-1", "OPEN"));
        let bridge = bridge_with(transport, Arc::new(FakeSigner::new()), 5);
        let ctx = CallContext::new();

        let err = expect(
            &ctx,
            Operation::GetEntry,
            "entry",
            bridge
                .execute(
                    &ctx,
                    DictRequest::GetClaim(GetClaimRequest {
                        claim: ClaimRef::ClaimId("claim-1".into()),
                    }),
                )
                .await
                .unwrap()
                .into_entry(),
        )
        .unwrap_err();
        assert!(matches!(
            err.error,
            BridgeError::Translation(TranslationError::UnexpectedResponse {
                expected: "entry",
                actual: "claim"
            })
        ));
    }
}
