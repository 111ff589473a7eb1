//! Aggregated bridge health.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::bacen::{certificate_status, CertificateStatus};
use crate::bridge::Bridge;
use crate::resilience::{CallContext, CircuitState, CircuitStats};

/// Time budget for each dependency check.
const CHECK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Degraded => write!(f, "degraded"),
            HealthStatus::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComponentHealth {
    pub reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ComponentHealth {
    fn from_check<E: fmt::Display>(outcome: Result<Duration, E>) -> Self {
        match outcome {
            Ok(latency) => Self {
                reachable: true,
                latency_ms: Some(latency.as_millis() as u64),
                error: None,
            },
            Err(e) => Self {
                reachable: false,
                latency_ms: None,
                error: Some(e.to_string()),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub bacen: ComponentHealth,
    pub signer: ComponentHealth,
    pub circuit: CircuitStats,
    pub certificate: CertificateStatus,
    pub checked_at_ms: u64,
}

impl HealthReport {
    /// Unhealthy when the counterparty is unreachable or the client
    /// certificate is unusable; degraded when the signer is down or the
    /// breaker is not closed.
    fn classify(
        bacen: &ComponentHealth,
        signer: &ComponentHealth,
        circuit: &CircuitStats,
        certificate: &CertificateStatus,
    ) -> HealthStatus {
        if !bacen.reachable || !certificate.is_usable() {
            HealthStatus::Unhealthy
        } else if !signer.reachable || circuit.state != CircuitState::Closed {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }
}

impl Bridge {
    /// Check the counterparty and the signer concurrently.
    ///
    /// Checks run under a child of `ctx` capped at five seconds, so the
    /// caller's deadline and cancellation still apply. They bypass the
    /// circuit breaker so an open circuit does not hide a recovered
    /// counterparty, and their outcomes are not counted.
    pub async fn health_check(&self, ctx: &CallContext) -> HealthReport {
        let ctx = ctx.child().with_timeout(CHECK_TIMEOUT);
        let (bacen, signer) = tokio::join!(self.transport.health_check(&ctx), self.signer.health_check(&ctx));

        let bacen = ComponentHealth::from_check(bacen);
        let signer = ComponentHealth::from_check(signer);
        let circuit = self.breaker.stats();
        let certificate = certificate_status(self.cert_path.as_deref());
        let status = HealthReport::classify(&bacen, &signer, &circuit, &certificate);

        if status != HealthStatus::Healthy {
            tracing::warn!(
                status = %status,
                bacen_reachable = bacen.reachable,
                signer_reachable = signer.reachable,
                circuit = circuit.state.as_str(),
                "Bridge health degraded"
            );
        }

        HealthReport {
            status,
            bacen,
            signer,
            circuit,
            certificate,
            checked_at_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or_default(),
        }
    }
}
