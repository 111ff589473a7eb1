//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the bridge.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the DICT bridge.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BridgeConfig {
    /// Counterparty endpoint, TLS material and connection pool.
    pub bacen: BacenConfig,

    /// Circuit breaker guarding the counterparty.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Retry policy for transient transport failures.
    pub retry: RetryConfig,

    /// XML signing service.
    pub signer: SignerConfig,

    /// Operation event publishing.
    pub events: EventsConfig,

    /// Logging and metrics.
    pub observability: ObservabilityConfig,

    pub admin: AdminConfig,
}

/// Counterparty (Bacen DICT) connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BacenConfig {
    /// Base URL every operation path is appended to.
    pub base_url: String,

    /// Client certificate (PEM). Required unless `dev_mode`.
    pub cert_path: Option<String>,

    /// Client private key (PEM). Required unless `dev_mode`.
    pub key_path: Option<String>,

    /// Extra trusted CA bundle (PEM).
    pub ca_path: Option<String>,

    /// Skip client identity and server verification. Local testing only.
    pub dev_mode: bool,

    pub min_tls_version: TlsVersion,

    /// Whole-request timeout in seconds.
    pub timeout_secs: u64,

    pub connect_timeout_secs: u64,

    /// ISPB of the participant this bridge acts for.
    pub participant_ispb: String,

    pub pool: PoolConfig,
}

impl Default for BacenConfig {
    fn default() -> Self {
        Self {
            base_url: "https://dict.pi.rsfn.net.br".to_string(),
            cert_path: None,
            key_path: None,
            ca_path: None,
            dev_mode: false,
            min_tls_version: TlsVersion::Tls12,
            timeout_secs: 60,
            connect_timeout_secs: 30,
            participant_ispb: String::new(),
            pool: PoolConfig::default(),
        }
    }
}

impl BacenConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Minimum TLS protocol version accepted on the counterparty connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum TlsVersion {
    #[serde(rename = "1.2")]
    Tls12,
    #[serde(rename = "1.3")]
    Tls13,
}

impl TlsVersion {
    pub fn as_str(&self) -> &'static str {
        match self {
            TlsVersion::Tls12 => "1.2",
            TlsVersion::Tls13 => "1.3",
        }
    }
}

impl From<TlsVersion> for reqwest::tls::Version {
    fn from(version: TlsVersion) -> Self {
        match version {
            TlsVersion::Tls12 => reqwest::tls::Version::TLS_1_2,
            TlsVersion::Tls13 => reqwest::tls::Version::TLS_1_3,
        }
    }
}

/// Connection pool limits for the counterparty client.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PoolConfig {
    pub max_idle_connections: usize,
    pub max_idle_per_host: usize,

    /// Concurrent in-flight requests allowed against the counterparty.
    pub max_connections_per_host: usize,

    pub idle_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_idle_connections: 20,
            max_idle_per_host: 20,
            max_connections_per_host: 20,
            idle_timeout_secs: 90,
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Breaker name used in logs and metric labels.
    pub name: String,

    /// Consecutive failures that open the breaker.
    pub max_failures: u32,

    /// Seconds the breaker stays open before admitting trial calls.
    pub timeout_secs: u64,

    /// Trial calls admitted (and successes required) while half-open.
    pub max_half_open_requests: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            name: "bacen-dict".to_string(),
            max_failures: 5,
            timeout_secs: 60,
            max_half_open_requests: 3,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,

    pub initial_backoff_ms: u64,

    pub backoff_multiplier: f64,

    pub max_backoff_ms: u64,

    /// Random extra delay as a fraction of each backoff, in `[0, 1)`.
    pub jitter_ratio: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 1000,
            backoff_multiplier: 2.0,
            max_backoff_ms: 10_000,
            jitter_ratio: 0.0,
        }
    }
}

/// XML signing service.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SignerConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8081".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Operation event publishing.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EventsConfig {
    pub enabled: bool,

    /// Publish tasks allowed to run at once; further events are dropped.
    pub max_in_flight: usize,

    /// Attempts per event, including the first.
    pub max_attempts: u32,

    pub retry_delay_ms: u64,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_in_flight: 64,
            max_attempts: 3,
            retry_delay_ms: 100,
        }
    }
}

/// Log output style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Full,
    Compact,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Full,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    pub enabled: bool,

    /// Bearer token required on `/admin` routes.
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8090".to_string(),
        }
    }
}
