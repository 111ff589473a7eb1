//! Shared utilities for integration tests: an in-process counterparty and
//! a signer stand-in, wired to the real SOAP client.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use dict_bridge::bacen::{build_envelope, SoapClient};
use dict_bridge::config::schema::BacenConfig;
use dict_bridge::dict::{Account, AccountType, CreateEntryRequest, DictKey, KeyType, Owner, OwnerType};
use dict_bridge::resilience::backoff::BackoffPolicy;
use dict_bridge::resilience::{BreakerSettings, CallContext, CircuitBreaker, RetryExecutor};
use dict_bridge::signer::{SignedXml, Signer, SignerError};
use dict_bridge::translate::XmlTranslator;
use dict_bridge::Bridge;

/// One request as seen by the counterparty.
#[derive(Debug, Clone)]
pub struct Captured {
    pub method: String,
    pub path: String,
    pub correlation_id: Option<String>,
    pub body: String,
}

/// In-process HTTP counterparty; the handler decides status and body.
pub struct Counterparty {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<Captured>>>,
}

impl Counterparty {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn hits(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// SOAP requests only; liveness checks are excluded.
    pub fn soap_requests(&self) -> Vec<Captured> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == "POST")
            .cloned()
            .collect()
    }
}

/// Start a programmable counterparty on an ephemeral port.
pub async fn start_counterparty<F, Fut>(f: F) -> Counterparty
where
    F: Fn(Captured) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let f = Arc::new(f);

    let recorded = requests.clone();
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    let recorded = recorded.clone();
                    tokio::spawn(async move {
                        let Some(request) = read_request(&mut socket).await else {
                            return;
                        };
                        recorded.lock().unwrap().push(request.clone());
                        let (status, body) = f(request).await;
                        let status_text = match status {
                            200 => "200 OK",
                            408 => "408 Request Timeout",
                            429 => "429 Too Many Requests",
                            500 => "500 Internal Server Error",
                            502 => "502 Bad Gateway",
                            503 => "503 Service Unavailable",
                            _ => "400 Bad Request",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/soap+xml\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    Counterparty { addr, requests }
}

async fn read_request(socket: &mut TcpStream) -> Option<Captured> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut lines = head.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();

    let mut content_length = 0usize;
    let mut correlation_id = None;
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if name.eq_ignore_ascii_case("content-length") {
            content_length = value.parse().unwrap_or(0);
        } else if name.eq_ignore_ascii_case("x-correlation-id") {
            correlation_id = Some(value.to_string());
        }
    }

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    let body = String::from_utf8_lossy(&buf[header_end..]).into_owned();

    Some(Captured {
        method,
        path,
        correlation_id,
        body,
    })
}

/// Signs nothing; returns the XML untouched with a fixed detached signature.
pub struct StaticSigner;

#[async_trait]
impl Signer for StaticSigner {
    async fn sign(&self, _ctx: &CallContext, xml: &str) -> Result<SignedXml, SignerError> {
        Ok(SignedXml {
            xml: xml.to_string(),
            signature: Some("dGVzdC1zaWduYXR1cmU=".to_string()),
        })
    }

    async fn health_check(&self, _ctx: &CallContext) -> Result<Duration, SignerError> {
        Ok(Duration::from_millis(1))
    }
}

/// Bridge over the real SOAP client in dev mode, with short backoff.
pub fn bridge_for(counterparty: &Counterparty, max_failures: u32, max_retries: u32) -> Bridge {
    let config = BacenConfig {
        base_url: counterparty.base_url(),
        dev_mode: true,
        timeout_secs: 5,
        connect_timeout_secs: 2,
        ..BacenConfig::default()
    };
    let transport = SoapClient::new(&config).unwrap();

    let breaker = CircuitBreaker::new(BreakerSettings {
        name: "bacen-test".to_string(),
        max_failures,
        timeout: Duration::from_secs(60),
        max_half_open_requests: 1,
    });
    let retry = RetryExecutor::new(
        max_retries,
        BackoffPolicy {
            initial: Duration::from_millis(10),
            multiplier: 2.0,
            max: Duration::from_millis(50),
            jitter_ratio: 0.0,
        },
    );

    Bridge::new(
        Arc::new(transport),
        Arc::new(StaticSigner),
        Arc::new(XmlTranslator::new()),
        Arc::new(breaker),
        retry,
    )
}

pub fn create_entry_request() -> CreateEntryRequest {
    CreateEntryRequest {
        request_id: "it-req-1".to_string(),
        key: DictKey::new(KeyType::Cpf, "12345678901"),
        account: Account {
            participant: "12345678".to_string(),
            branch: "0001".to_string(),
            number: "123456".to_string(),
            account_type: AccountType::Checking,
            opening_date: None,
        },
        owner: Owner {
            owner_type: OwnerType::NaturalPerson,
            tax_id: "12345678901".to_string(),
            name: "Ana Souza".to_string(),
            trade_name: None,
        },
        reason: None,
    }
}

pub fn entry_envelope(entry_id: &str) -> String {
    let body = format!(
        "<CreateEntryResponse><ResponseTime>2024-01-01T10:00:00Z</ResponseTime><Entry>\
         <EntryId>{entry_id}</EntryId><Key>12345678901</Key><KeyType>CPF</KeyType>\
         <Account><Participant>12345678</Participant><Branch>0001</Branch>\
         <AccountNumber>123456</AccountNumber><AccountType>CACC</AccountType></Account>\
         <Owner><Type>NATURAL_PERSON</Type><TaxIdNumber>12345678901</TaxIdNumber><Name>Ana Souza</Name></Owner>\
         </Entry></CreateEntryResponse>"
    );
    String::from_utf8(build_envelope(body.as_bytes(), None).unwrap()).unwrap()
}

pub fn fault_envelope(code: &str, reason: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><soap:Envelope xmlns:soap="http://www.w3.org/2003/05/soap-envelope"><soap:Body><soap:Fault><soap:Code><soap:Value>{code}</soap:Value></soap:Code><soap:Reason><soap:Text xml:lang="pt-BR">{reason}</soap:Text></soap:Reason></soap:Fault></soap:Body></soap:Envelope>"#
    )
}
