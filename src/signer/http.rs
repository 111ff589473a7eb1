//! HTTP client for the XML signing service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::bacen::client::CORRELATION_HEADER;
use crate::config::schema::SignerConfig;
use crate::resilience::CallContext;
use crate::signer::{SignedXml, Signer, SignerError};

const SIGN_PATH: &str = "/sign";
const HEALTH_PATH: &str = "/health";

#[derive(Debug, Serialize)]
struct SignRequest<'a> {
    xml: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignResponse {
    #[serde(default)]
    signed_xml: String,
    #[serde(default)]
    signature: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    error: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    code: Option<String>,
}

/// Signing service reached over plain HTTP(S) with JSON bodies.
#[derive(Debug, Clone)]
pub struct HttpSigner {
    http: reqwest::Client,
    base_url: String,
}

impl HttpSigner {
    pub fn new(config: &SignerConfig) -> Result<Self, SignerError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SignerError::Unavailable(e.to_string()))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Signer for HttpSigner {
    async fn sign(&self, ctx: &CallContext, xml: &str) -> Result<SignedXml, SignerError> {
        let url = format!("{}{}", self.base_url, SIGN_PATH);
        tracing::debug!(correlation_id = %ctx.correlation_id(), xml_size = xml.len(), "Calling signer");

        let call = async {
            let response = self
                .http
                .post(&url)
                .header(ACCEPT, "application/json")
                .header(CORRELATION_HEADER, ctx.correlation_id())
                .json(&SignRequest { xml })
                .send()
                .await?;
            let status = response.status();
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>((status, body))
        };
        let (status, body) = ctx
            .run(call)
            .await
            .map_err(SignerError::Cancelled)?
            .map_err(|e| SignerError::Unavailable(e.to_string()))?;

        let signed = decode_sign_response(status, &body)?;
        tracing::debug!(
            correlation_id = %ctx.correlation_id(),
            signed_size = signed.xml.len(),
            "XML signed"
        );
        Ok(signed)
    }

    async fn health_check(&self, ctx: &CallContext) -> Result<Duration, SignerError> {
        let url = format!("{}{}", self.base_url, HEALTH_PATH);
        let started = Instant::now();
        let status = ctx
            .run(self.http.get(&url).send())
            .await
            .map_err(SignerError::Cancelled)?
            .map_err(|e| SignerError::Unavailable(e.to_string()))?
            .status();

        if status != StatusCode::OK {
            return Err(SignerError::Unavailable(format!("health check returned {}", status.as_u16())));
        }
        Ok(started.elapsed())
    }
}

fn decode_sign_response(status: StatusCode, body: &[u8]) -> Result<SignedXml, SignerError> {
    if status != StatusCode::OK {
        let message = match serde_json::from_slice::<ErrorResponse>(body) {
            Ok(err) => match err.code {
                Some(code) => format!("{} - {} [{}]", err.error, err.message, code),
                None => format!("{} - {}", err.error, err.message),
            },
            Err(_) => String::from_utf8_lossy(body).into_owned(),
        };
        return Err(SignerError::Rejected {
            status: status.as_u16(),
            message,
        });
    }

    let response: SignResponse =
        serde_json::from_slice(body).map_err(|e| SignerError::InvalidResponse(e.to_string()))?;
    if let Some(error) = response.error.filter(|e| !e.is_empty()) {
        return Err(SignerError::Rejected {
            status: status.as_u16(),
            message: error,
        });
    }
    if response.signed_xml.is_empty() {
        return Err(SignerError::InvalidResponse("empty signed XML".to_string()));
    }

    Ok(SignedXml {
        xml: response.signed_xml,
        signature: response.signature.filter(|s| !s.is_empty()),
    })
}
