//! Pooled mTLS SOAP client for the counterparty.
//!
//! # Responsibilities
//! - Own the reqwest connection pool (rustls, client identity, extra CA roots)
//! - POST envelopes and turn non-2xx statuses and embedded faults into errors
//! - Bound in-flight requests per host
//! - Abort I/O when the caller's deadline or token fires

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use url::Url;

use crate::bacen::envelope::{detect_fault, SOAP_CONTENT_TYPE};
use crate::bacen::tls::{self, TlsError};
use crate::bacen::types::{SetupError, TransportError};
use crate::config::schema::BacenConfig;
use crate::resilience::CallContext;

pub const USER_AGENT: &str = concat!("dict-bridge/", env!("CARGO_PKG_VERSION"));
pub const CORRELATION_HEADER: &str = "X-Correlation-ID";
/// ISPB of the participant the bridge acts for.
pub const PARTICIPANT_HEADER: &str = "X-Participant-ISPB";
const HEALTH_PATH: &str = "/health";

/// mTLS SOAP client. Cheap to clone; clones share the pool.
#[derive(Debug, Clone)]
pub struct SoapClient {
    http: reqwest::Client,
    base_url: String,
    limiter: Arc<Semaphore>,
    dev_mode: bool,
}

impl SoapClient {
    pub fn new(config: &BacenConfig) -> Result<Self, SetupError> {
        let base_url = config.base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(SetupError::MissingBaseUrl);
        }
        Url::parse(&base_url).map_err(|e| SetupError::InvalidBaseUrl {
            url: base_url.clone(),
            message: e.to_string(),
        })?;

        let pool = &config.pool;
        let mut builder = reqwest::Client::builder()
            .use_rustls_tls()
            .min_tls_version(config.min_tls_version.into())
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .pool_max_idle_per_host(pool.max_idle_per_host.min(pool.max_idle_connections))
            .pool_idle_timeout(Duration::from_secs(pool.idle_timeout_secs))
            .user_agent(USER_AGENT);

        if config.dev_mode {
            tracing::warn!(
                base_url = %base_url,
                "Running in DEV MODE: client certificate skipped, server certificates not verified"
            );
            builder = builder.danger_accept_invalid_certs(true);
        } else {
            let (Some(cert_path), Some(key_path)) = (config.cert_path.as_deref(), config.key_path.as_deref())
            else {
                return Err(SetupError::Tls(TlsError::Config(
                    "client certificate and key are required for mTLS".to_string(),
                )));
            };
            builder = builder.identity(tls::load_identity(cert_path, key_path)?);
        }

        if let Some(ca_path) = config.ca_path.as_deref() {
            for certificate in tls::load_ca_bundle(ca_path)? {
                builder = builder.add_root_certificate(certificate);
            }
        }

        let http = builder.build().map_err(|e| SetupError::Client(e.to_string()))?;

        tracing::info!(
            base_url = %base_url,
            min_tls = config.min_tls_version.as_str(),
            max_per_host = pool.max_connections_per_host,
            "Counterparty client configured"
        );

        Ok(Self {
            http,
            base_url,
            limiter: Arc::new(Semaphore::new(pool.max_connections_per_host.max(1))),
            dev_mode: config.dev_mode,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn is_dev_mode(&self) -> bool {
        self.dev_mode
    }

    /// POST an envelope to `endpoint` and return the raw response envelope.
    pub async fn send_envelope(
        &self,
        ctx: &CallContext,
        endpoint: &str,
        envelope: &[u8],
    ) -> Result<Vec<u8>, TransportError> {
        let (_, body) = self
            .post(ctx, endpoint, envelope.to_vec(), ctx.correlation_id(), &BTreeMap::new())
            .await?;
        Ok(body)
    }

    pub(crate) async fn post(
        &self,
        ctx: &CallContext,
        endpoint: &str,
        envelope: Vec<u8>,
        correlation_id: &str,
        headers: &BTreeMap<String, String>,
    ) -> Result<(u16, Vec<u8>), TransportError> {
        let _permit = ctx
            .run(self.limiter.acquire())
            .await
            .map_err(TransportError::Cancelled)?
            .map_err(|_| TransportError::Network {
                endpoint: endpoint.to_string(),
                message: "connection limiter closed".to_string(),
            })?;

        let url = format!("{}{}", self.base_url, endpoint);
        tracing::debug!(
            correlation_id = %correlation_id,
            url = %url,
            envelope_size = envelope.len(),
            "Sending SOAP request"
        );

        let mut request = self
            .http
            .post(&url)
            .header(CONTENT_TYPE, SOAP_CONTENT_TYPE)
            .header(ACCEPT, "application/soap+xml")
            .header(CORRELATION_HEADER, correlation_id);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let exchange = async {
            let response = request.body(envelope).send().await?;
            let status = response.status();
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>((status, body))
        };
        let (status, body) = ctx
            .run(exchange)
            .await
            .map_err(TransportError::Cancelled)?
            .map_err(|e| map_reqwest_error(endpoint, e))?;

        tracing::debug!(
            correlation_id = %correlation_id,
            status = status.as_u16(),
            body_size = body.len(),
            "Received SOAP response"
        );

        if !status.is_success() {
            return Err(TransportError::Http {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(TransportError::MalformedResponse(format!(
                "empty response body (HTTP {})",
                status.as_u16()
            )));
        }

        if let Some(fault) = detect_fault(&body) {
            tracing::warn!(
                correlation_id = %correlation_id,
                fault_code = %fault.code,
                fault_reason = %fault.reason,
                "SOAP fault received"
            );
            return Err(TransportError::Fault(fault));
        }

        Ok((status.as_u16(), body.to_vec()))
    }

    /// Liveness check against the non-SOAP health endpoint; returns latency.
    pub async fn health_check(&self, ctx: &CallContext) -> Result<Duration, TransportError> {
        let url = format!("{}{}", self.base_url, HEALTH_PATH);
        let started = Instant::now();

        let liveness = async {
            let response = self
                .http
                .get(&url)
                .header(CORRELATION_HEADER, ctx.correlation_id())
                .send()
                .await?;
            let status = response.status();
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>((status, body))
        };
        let (status, body) = ctx
            .run(liveness)
            .await
            .map_err(TransportError::Cancelled)?
            .map_err(|e| map_reqwest_error(HEALTH_PATH, e))?;

        if status != StatusCode::OK {
            return Err(TransportError::Http {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }
        Ok(started.elapsed())
    }
}

fn map_reqwest_error(endpoint: &str, error: reqwest::Error) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout {
            endpoint: endpoint.to_string(),
        }
    } else {
        TransportError::Network {
            endpoint: endpoint.to_string(),
            message: error.to_string(),
        }
    }
}
