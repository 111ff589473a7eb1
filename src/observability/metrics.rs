//! Metrics collection and exposition.
//!
//! # Metrics
//! - `dict_bridge_circuit_requests_total` (counter): calls admitted by a breaker
//! - `dict_bridge_circuit_outcomes_total` (counter): success/failure/ignored per breaker
//! - `dict_bridge_circuit_rejections_total` (counter): calls refused while open
//! - `dict_bridge_circuit_transitions_total` (counter): state changes by from/to
//! - `dict_bridge_circuit_state` (gauge): 0=closed, 1=open, 2=half-open
//! - `dict_bridge_requests_total` (counter): bridge operations by outcome
//! - `dict_bridge_request_duration_seconds` (histogram): end-to-end latency

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;
use serde::Serialize;

use crate::resilience::circuit_breaker::CircuitState;

/// Install the Prometheus exporter on the given address.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record the outcome of one orchestrated bridge operation.
pub fn record_operation(operation: &'static str, outcome: &'static str, elapsed: Duration) {
    metrics::counter!(
        "dict_bridge_requests_total",
        "operation" => operation,
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!("dict_bridge_request_duration_seconds", "operation" => operation)
        .record(elapsed.as_secs_f64());
}

/// Lifetime counters owned by a single circuit breaker.
///
/// Each breaker gets its own instance, so breakers guarding different
/// endpoints never share counts. Updates are also forwarded to the
/// `metrics` facade, labelled with the breaker name.
#[derive(Debug)]
pub struct CircuitMetrics {
    name: String,
    requests: AtomicU64,
    successes: AtomicU64,
    failures: AtomicU64,
    ignored: AtomicU64,
    rejections: AtomicU64,
    transitions: AtomicU64,
}

/// Point-in-time copy of a [`CircuitMetrics`] collector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CircuitMetricsSnapshot {
    pub requests: u64,
    pub successes: u64,
    pub failures: u64,
    pub ignored: u64,
    pub rejections: u64,
    pub transitions: u64,
}

impl CircuitMetrics {
    /// Create a collector for the named breaker.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            requests: AtomicU64::new(0),
            successes: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            ignored: AtomicU64::new(0),
            rejections: AtomicU64::new(0),
            transitions: AtomicU64::new(0),
        }
    }

    /// Name of the breaker this collector belongs to.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("dict_bridge_circuit_requests_total", "breaker" => self.name.clone())
            .increment(1);
    }

    pub fn record_success(&self) {
        self.successes.fetch_add(1, Ordering::Relaxed);
        self.record_outcome("success");
    }

    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        self.record_outcome("failure");
    }

    /// A call that finished without counting toward the breaker (e.g. cancelled).
    pub fn record_ignored(&self) {
        self.ignored.fetch_add(1, Ordering::Relaxed);
        self.record_outcome("ignored");
    }

    pub fn record_rejection(&self) {
        self.rejections.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("dict_bridge_circuit_rejections_total", "breaker" => self.name.clone())
            .increment(1);
    }

    pub fn record_transition(&self, from: CircuitState, to: CircuitState) {
        self.transitions.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(
            "dict_bridge_circuit_transitions_total",
            "breaker" => self.name.clone(),
            "from" => from.as_str(),
            "to" => to.as_str()
        )
        .increment(1);
        metrics::gauge!("dict_bridge_circuit_state", "breaker" => self.name.clone())
            .set(to.gauge_value());
    }

    pub fn snapshot(&self) -> CircuitMetricsSnapshot {
        CircuitMetricsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            successes: self.successes.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            ignored: self.ignored.load(Ordering::Relaxed),
            rejections: self.rejections.load(Ordering::Relaxed),
            transitions: self.transitions.load(Ordering::Relaxed),
        }
    }

    fn record_outcome(&self, outcome: &'static str) {
        metrics::counter!(
            "dict_bridge_circuit_outcomes_total",
            "breaker" => self.name.clone(),
            "outcome" => outcome
        )
        .increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collectors_are_independent() {
        let a = CircuitMetrics::new("a");
        let b = CircuitMetrics::new("b");

        a.record_request();
        a.record_failure();
        a.record_transition(CircuitState::Closed, CircuitState::Open);

        assert_eq!(a.snapshot().requests, 1);
        assert_eq!(a.snapshot().failures, 1);
        assert_eq!(a.snapshot().transitions, 1);
        assert_eq!(b.snapshot(), CircuitMetricsSnapshot::default());
    }
}
