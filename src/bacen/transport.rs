//! Transport capability consumed by the orchestrator.

use std::time::Duration;

use async_trait::async_trait;

use crate::bacen::client::SoapClient;
use crate::bacen::types::{BacenRequest, BacenResponse, TransportError};
use crate::resilience::CallContext;

/// Sends one envelope to the counterparty.
///
/// The production implementation is [`SoapClient`]; tests substitute an
/// in-memory double.
#[async_trait]
pub trait Transport: Send + Sync {
    /// POST `request` and return the raw response envelope.
    ///
    /// Non-2xx statuses and embedded faults are errors.
    async fn send(&self, ctx: &CallContext, request: &BacenRequest) -> Result<BacenResponse, TransportError>;

    /// Check counterparty liveness, returning the round-trip latency.
    async fn health_check(&self, ctx: &CallContext) -> Result<Duration, TransportError>;
}

#[async_trait]
impl Transport for SoapClient {
    async fn send(&self, ctx: &CallContext, request: &BacenRequest) -> Result<BacenResponse, TransportError> {
        let (status, body) = self
            .post(
                ctx,
                request.endpoint(),
                request.payload().to_vec(),
                request.correlation_id(),
                request.headers(),
            )
            .await?;
        Ok(BacenResponse::new(request.correlation_id(), status, body))
    }

    async fn health_check(&self, ctx: &CallContext) -> Result<Duration, TransportError> {
        SoapClient::health_check(self, ctx).await
    }
}
