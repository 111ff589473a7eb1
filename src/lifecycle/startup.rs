//! Startup orchestration.
//!
//! # Responsibilities
//! - Install logging and the metrics exporter
//! - Build the SOAP client, signer client, breaker and event dispatcher
//! - Assemble them into a [`Bridge`]
//!
//! # Design Decisions
//! - Fail fast: invalid TLS material or URLs abort startup
//! - The breaker gets its own metrics collector, named after the breaker

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;

use crate::bacen::{SetupError, SoapClient};
use crate::bridge::Bridge;
use crate::config::BridgeConfig;
use crate::events::{EventDispatcher, LogPublisher};
use crate::observability::{self, CircuitMetrics};
use crate::resilience::{BreakerSettings, CircuitBreaker, RetryExecutor};
use crate::signer::{HttpSigner, SignerError};
use crate::translate::XmlTranslator;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to create counterparty client: {0}")]
    Transport(#[from] SetupError),

    #[error("failed to create signer client: {0}")]
    Signer(#[from] SignerError),

    #[error("invalid {field} '{value}'")]
    Address { field: &'static str, value: String },
}

/// Install logging and, when enabled, the Prometheus exporter.
pub fn init_observability(config: &BridgeConfig) -> Result<(), StartupError> {
    observability::logging::init_logging(&config.observability);
    if config.observability.metrics_enabled {
        let addr = parse_addr("observability.metrics_address", &config.observability.metrics_address)?;
        observability::metrics::init_metrics(addr);
    }
    Ok(())
}

/// Build the production bridge from a validated configuration.
pub fn build_bridge(config: &BridgeConfig) -> Result<Bridge, StartupError> {
    let transport = Arc::new(SoapClient::new(&config.bacen)?);
    let signer = Arc::new(HttpSigner::new(&config.signer)?);

    let settings = BreakerSettings::from(&config.circuit_breaker);
    let metrics = Arc::new(CircuitMetrics::new(settings.name.clone()));
    let breaker = Arc::new(CircuitBreaker::with_metrics(settings, metrics));
    let retry = RetryExecutor::from_config(&config.retry);

    let mut bridge = Bridge::new(transport, signer, Arc::new(XmlTranslator::new()), breaker, retry);
    if !config.bacen.participant_ispb.is_empty() {
        bridge = bridge.with_participant(config.bacen.participant_ispb.clone());
    }
    if let Some(cert_path) = &config.bacen.cert_path {
        bridge = bridge.with_certificate(cert_path.clone());
    }
    if config.events.enabled {
        let dispatcher = EventDispatcher::new(Arc::new(LogPublisher), &config.events);
        bridge = bridge.with_events(Arc::new(dispatcher));
    }

    tracing::info!(
        bacen_url = %config.bacen.base_url,
        dev_mode = config.bacen.dev_mode,
        signer_url = %config.signer.base_url,
        circuit = %config.circuit_breaker.name,
        max_failures = config.circuit_breaker.max_failures,
        max_retries = config.retry.max_retries,
        events = config.events.enabled,
        "Bridge initialized"
    );
    Ok(bridge)
}

pub fn parse_addr(field: &'static str, value: &str) -> Result<SocketAddr, StartupError> {
    value.parse().map_err(|_| StartupError::Address {
        field,
        value: value.to_string(),
    })
}
