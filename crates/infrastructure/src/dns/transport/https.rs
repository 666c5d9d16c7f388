//! DNS-over-HTTPS (RFC 8484). The query is POSTed as an
//! `application/dns-message` body and the response body is the raw answer.

use super::{DnsTransport, TransportResponse};
use async_trait::async_trait;
use sinkhole_dns_domain::DomainError;
use std::time::Duration;
use tracing::{debug, warn};

const DNS_MESSAGE_CONTENT_TYPE: &str = "application/dns-message";

/// HTTP client shared by every DoH endpoint so connections are pooled.
pub fn build_doh_client() -> Result<reqwest::Client, DomainError> {
    reqwest::Client::builder()
        .use_rustls_tls()
        .user_agent("Sinkhole-DNS/1.0")
        .pool_max_idle_per_host(4)
        .build()
        .map_err(|e| DomainError::DohFailed(format!("Failed to build HTTP client: {}", e)))
}

pub struct HttpsTransport {
    url: String,
    client: reqwest::Client,
}

impl HttpsTransport {
    pub fn new(url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            client,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl DnsTransport for HttpsTransport {
    async fn send(
        &self,
        message_bytes: &[u8],
        timeout: Duration,
    ) -> Result<TransportResponse, DomainError> {
        debug!(url = %self.url, message_len = message_bytes.len(), "Sending DoH query");

        let response = tokio::time::timeout(
            timeout,
            self.client
                .post(&self.url)
                .header("Content-Type", DNS_MESSAGE_CONTENT_TYPE)
                .header("Accept", DNS_MESSAGE_CONTENT_TYPE)
                .body(message_bytes.to_vec())
                .send(),
        )
        .await
        .map_err(|_| DomainError::TransportTimeout {
            server: self.url.clone(),
        })?
        .map_err(|e| DomainError::DohFailed(format!("Request to {} failed: {}", self.url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DomainError::DohFailed(format!(
                "{} returned HTTP {}",
                self.url,
                status.as_u16()
            )));
        }

        let content_type_ok = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with(DNS_MESSAGE_CONTENT_TYPE));
        if !content_type_ok {
            warn!(url = %self.url, "DoH response without application/dns-message content type");
        }

        let response_bytes = tokio::time::timeout(timeout, response.bytes())
            .await
            .map_err(|_| DomainError::TransportTimeout {
                server: self.url.clone(),
            })?
            .map_err(|e| {
                DomainError::DohFailed(format!("Failed to read response from {}: {}", self.url, e))
            })?;

        debug!(url = %self.url, response_len = response_bytes.len(), "DoH response received");

        Ok(TransportResponse {
            bytes: response_bytes.to_vec(),
            protocol_used: "HTTPS",
        })
    }

    fn protocol_name(&self) -> &'static str {
        "HTTPS"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_https_transport_creation() {
        let client = build_doh_client().unwrap();
        let transport = HttpsTransport::new("https://1.1.1.1/dns-query", client);
        assert_eq!(transport.url(), "https://1.1.1.1/dns-query");
        assert_eq!(transport.protocol_name(), "HTTPS");
    }
}
