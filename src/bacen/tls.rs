//! Client certificate and CA bundle loading for the mTLS connection.

use std::fs;
use std::io::BufReader;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;

/// TLS material errors.
#[derive(Debug, Error)]
pub enum TlsError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid certificate in {path}: {message}")]
    InvalidCertificate { path: String, message: String },

    #[error("no private key found in {path}")]
    InvalidPrivateKey { path: String },

    #[error("TLS configuration error: {0}")]
    Config(String),
}

/// Load the client identity presented during the mTLS handshake.
pub fn load_identity(cert_path: &str, key_path: &str) -> Result<reqwest::Identity, TlsError> {
    let cert_pem = read_pem(cert_path)?;
    let count = count_certificates(cert_path, &cert_pem)?;
    if count == 0 {
        return Err(TlsError::InvalidCertificate {
            path: cert_path.to_string(),
            message: "no certificates found".to_string(),
        });
    }

    let key_pem = read_pem(key_path)?;
    let key = rustls_pemfile::private_key(&mut BufReader::new(key_pem.as_slice()))
        .map_err(|_| TlsError::InvalidPrivateKey { path: key_path.to_string() })?;
    if key.is_none() {
        return Err(TlsError::InvalidPrivateKey { path: key_path.to_string() });
    }

    let mut bundle = cert_pem;
    bundle.push(b'\n');
    bundle.extend_from_slice(&key_pem);
    reqwest::Identity::from_pem(&bundle).map_err(|e| TlsError::Config(e.to_string()))
}

/// Load every certificate of a PEM bundle as an extra trust root.
pub fn load_ca_bundle(path: &str) -> Result<Vec<reqwest::Certificate>, TlsError> {
    let pem = read_pem(path)?;
    if count_certificates(path, &pem)? == 0 {
        return Err(TlsError::InvalidCertificate {
            path: path.to_string(),
            message: "no certificates found".to_string(),
        });
    }
    reqwest::Certificate::from_pem_bundle(&pem).map_err(|e| TlsError::InvalidCertificate {
        path: path.to_string(),
        message: e.to_string(),
    })
}

/// State of the configured client certificate, as reported by health checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CertificateStatus {
    /// No certificate configured (development mode).
    NotConfigured,
    Valid { certificates: usize },
    Missing,
    Invalid { message: String },
}

impl CertificateStatus {
    pub fn is_usable(&self) -> bool {
        matches!(self, CertificateStatus::Valid { .. } | CertificateStatus::NotConfigured)
    }
}

/// Check that the certificate file exists and holds at least one PEM certificate.
pub fn certificate_status(cert_path: Option<&str>) -> CertificateStatus {
    let Some(path) = cert_path else {
        return CertificateStatus::NotConfigured;
    };
    if !Path::new(path).exists() {
        return CertificateStatus::Missing;
    }
    let pem = match read_pem(path) {
        Ok(pem) => pem,
        Err(e) => return CertificateStatus::Invalid { message: e.to_string() },
    };
    match count_certificates(path, &pem) {
        Ok(0) => CertificateStatus::Invalid {
            message: "no certificates found".to_string(),
        },
        Ok(certificates) => CertificateStatus::Valid { certificates },
        Err(e) => CertificateStatus::Invalid { message: e.to_string() },
    }
}

fn read_pem(path: &str) -> Result<Vec<u8>, TlsError> {
    fs::read(path).map_err(|source| TlsError::Read {
        path: path.to_string(),
        source,
    })
}

fn count_certificates(path: &str, pem: &[u8]) -> Result<usize, TlsError> {
    rustls_pemfile::certs(&mut BufReader::new(pem))
        .try_fold(0usize, |count, cert| cert.map(|_| count + 1))
        .map_err(|e| TlsError::InvalidCertificate {
            path: path.to_string(),
            message: e.to_string(),
        })
}
