use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::admin::AdminState;
use crate::bridge::{HealthReport, HealthStatus};
use crate::observability::metrics::CircuitMetricsSnapshot;
use crate::resilience::{CallContext, CircuitStats};

#[derive(Debug, Serialize)]
pub struct CircuitView {
    pub version: &'static str,
    pub circuit: CircuitStats,
    pub lifetime: CircuitMetricsSnapshot,
}

fn circuit_view(state: &AdminState) -> CircuitView {
    CircuitView {
        version: env!("CARGO_PKG_VERSION"),
        circuit: state.bridge.circuit_stats(),
        lifetime: state.bridge.breaker().metrics().snapshot(),
    }
}

/// 200 unless the bridge is unhealthy; a degraded bridge still serves.
pub async fn get_health(State(state): State<AdminState>) -> (StatusCode, Json<HealthReport>) {
    let report = state.bridge.health_check(&CallContext::new()).await;
    let status = match report.status {
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
    };
    (status, Json(report))
}

pub async fn get_circuit(State(state): State<AdminState>) -> Json<CircuitView> {
    Json(circuit_view(&state))
}

pub async fn reset_circuit(State(state): State<AdminState>) -> Json<CircuitView> {
    state.bridge.reset_circuit();
    Json(circuit_view(&state))
}
