//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Enforce the TLS posture: https, client identity, TLS >= 1.2 outside dev mode
//! - Validate value ranges (timeouts > 0, pool sizes > 0, backoff bounds)
//!
//! # Design Decisions
//! - Returns all validation issues, not just the first
//! - Validation is pure function: BridgeConfig → Result<(), Vec<ValidationIssue>>
//! - Runs after environment overrides, before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use url::Url;

use crate::config::schema::BridgeConfig;

/// A single configuration problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Dotted path of the offending key, e.g. `retry.max_backoff_ms`.
    pub field: String,
    pub message: String,
}

impl ValidationIssue {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a fully assembled configuration.
pub fn validate_config(config: &BridgeConfig) -> Result<(), Vec<ValidationIssue>> {
    let mut issues = Vec::new();

    validate_bacen(config, &mut issues);
    validate_resilience(config, &mut issues);
    validate_services(config, &mut issues);

    if issues.is_empty() {
        Ok(())
    } else {
        Err(issues)
    }
}

fn validate_bacen(config: &BridgeConfig, issues: &mut Vec<ValidationIssue>) {
    let bacen = &config.bacen;

    if bacen.base_url.trim().is_empty() {
        issues.push(ValidationIssue::new("bacen.base_url", "must be set"));
    } else {
        match Url::parse(&bacen.base_url) {
            Ok(url) => match url.scheme() {
                "https" => {}
                "http" if bacen.dev_mode => {}
                "http" => issues.push(ValidationIssue::new(
                    "bacen.base_url",
                    "must use https unless dev_mode is enabled",
                )),
                other => issues.push(ValidationIssue::new(
                    "bacen.base_url",
                    format!("unsupported scheme '{}'", other),
                )),
            },
            Err(e) => issues.push(ValidationIssue::new("bacen.base_url", format!("invalid URL: {}", e))),
        }
    }

    if !bacen.dev_mode {
        if bacen.cert_path.as_deref().map_or(true, |p| p.trim().is_empty()) {
            issues.push(ValidationIssue::new("bacen.cert_path", "required unless dev_mode is enabled"));
        }
        if bacen.key_path.as_deref().map_or(true, |p| p.trim().is_empty()) {
            issues.push(ValidationIssue::new("bacen.key_path", "required unless dev_mode is enabled"));
        }
    }

    if !bacen.participant_ispb.is_empty()
        && !(bacen.participant_ispb.len() == 8 && bacen.participant_ispb.chars().all(|c| c.is_ascii_digit()))
    {
        issues.push(ValidationIssue::new("bacen.participant_ispb", "must be 8 digits"));
    }

    if bacen.timeout_secs == 0 {
        issues.push(ValidationIssue::new("bacen.timeout_secs", "must be greater than 0"));
    }
    if bacen.connect_timeout_secs == 0 {
        issues.push(ValidationIssue::new("bacen.connect_timeout_secs", "must be greater than 0"));
    }

    let pool = &bacen.pool;
    if pool.max_idle_connections == 0 {
        issues.push(ValidationIssue::new("bacen.pool.max_idle_connections", "must be greater than 0"));
    }
    if pool.max_idle_per_host == 0 {
        issues.push(ValidationIssue::new("bacen.pool.max_idle_per_host", "must be greater than 0"));
    }
    if pool.max_connections_per_host == 0 {
        issues.push(ValidationIssue::new("bacen.pool.max_connections_per_host", "must be greater than 0"));
    }
    if pool.idle_timeout_secs == 0 {
        issues.push(ValidationIssue::new("bacen.pool.idle_timeout_secs", "must be greater than 0"));
    }
}

fn validate_resilience(config: &BridgeConfig, issues: &mut Vec<ValidationIssue>) {
    let breaker = &config.circuit_breaker;
    if breaker.name.trim().is_empty() {
        issues.push(ValidationIssue::new("circuit_breaker.name", "must be set"));
    }
    if breaker.max_failures == 0 {
        issues.push(ValidationIssue::new("circuit_breaker.max_failures", "must be greater than 0"));
    }
    if breaker.timeout_secs == 0 {
        issues.push(ValidationIssue::new("circuit_breaker.timeout_secs", "must be greater than 0"));
    }
    if breaker.max_half_open_requests == 0 {
        issues.push(ValidationIssue::new(
            "circuit_breaker.max_half_open_requests",
            "must be greater than 0",
        ));
    }

    let retry = &config.retry;
    if retry.initial_backoff_ms == 0 {
        issues.push(ValidationIssue::new("retry.initial_backoff_ms", "must be greater than 0"));
    }
    if retry.max_backoff_ms == 0 {
        issues.push(ValidationIssue::new("retry.max_backoff_ms", "must be greater than 0"));
    }
    if retry.initial_backoff_ms > retry.max_backoff_ms {
        issues.push(ValidationIssue::new(
            "retry.initial_backoff_ms",
            "must not exceed retry.max_backoff_ms",
        ));
    }
    if !retry.backoff_multiplier.is_finite() || retry.backoff_multiplier < 1.0 {
        issues.push(ValidationIssue::new("retry.backoff_multiplier", "must be at least 1.0"));
    }
    if !(0.0..1.0).contains(&retry.jitter_ratio) {
        issues.push(ValidationIssue::new("retry.jitter_ratio", "must be in [0, 1)"));
    }
}

fn validate_services(config: &BridgeConfig, issues: &mut Vec<ValidationIssue>) {
    if Url::parse(&config.signer.base_url).is_err() {
        issues.push(ValidationIssue::new("signer.base_url", "invalid URL"));
    }
    if config.signer.timeout_secs == 0 {
        issues.push(ValidationIssue::new("signer.timeout_secs", "must be greater than 0"));
    }

    if config.events.enabled {
        if config.events.max_in_flight == 0 {
            issues.push(ValidationIssue::new("events.max_in_flight", "must be greater than 0"));
        }
        if config.events.max_attempts == 0 {
            issues.push(ValidationIssue::new("events.max_attempts", "must be greater than 0"));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        issues.push(ValidationIssue::new(
            "observability.metrics_address",
            "must be a socket address",
        ));
    }

    if config.admin.enabled {
        if config.admin.bind_address.parse::<SocketAddr>().is_err() {
            issues.push(ValidationIssue::new("admin.bind_address", "must be a socket address"));
        }
        if config.admin.api_key.trim().is_empty() {
            issues.push(ValidationIssue::new("admin.api_key", "must be set when admin is enabled"));
        }
    }
}
