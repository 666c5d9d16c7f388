use crate::dns::transport::https::{build_doh_client, HttpsTransport};
use crate::dns::transport::tcp::TcpTransport;
use crate::dns::transport::udp::UdpTransport;
use crate::dns::transport::DnsTransport;
use async_trait::async_trait;
use sinkhole_dns_application::ports::UpstreamResolver;
use sinkhole_dns_domain::config::DnsConfig;
use sinkhole_dns_domain::{DomainError, Message};
use std::net::SocketAddr;
use std::time::Duration;
use tracing::{debug, warn};

/// A classic upstream: UDP first, TCP when the UDP answer is truncated.
pub struct ClassicUpstream {
    pub label: String,
    pub udp: Box<dyn DnsTransport>,
    pub tcp: Box<dyn DnsTransport>,
}

impl ClassicUpstream {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            label: addr.to_string(),
            udp: Box::new(UdpTransport::new(addr)),
            tcp: Box::new(TcpTransport::new(addr)),
        }
    }
}

/// Sends client queries to DoH endpoints and classic forwarders.
///
/// Every outbound query carries a fresh random id; the caller's id is put
/// back on the answer before it is returned.
pub struct UpstreamForwarder {
    classic: Vec<ClassicUpstream>,
    doh: Vec<Box<dyn DnsTransport>>,
    doh_labels: Vec<String>,
    doh_enabled: bool,
    timeout: Duration,
}

impl UpstreamForwarder {
    pub fn new(
        classic: Vec<ClassicUpstream>,
        doh: Vec<(String, Box<dyn DnsTransport>)>,
        doh_enabled: bool,
        timeout: Duration,
    ) -> Self {
        let (doh_labels, doh): (Vec<String>, Vec<Box<dyn DnsTransport>>) =
            doh.into_iter().unzip();
        Self {
            classic,
            doh,
            doh_labels,
            doh_enabled,
            timeout,
        }
    }

    pub fn from_config(config: &DnsConfig) -> Result<Self, DomainError> {
        let classic = config
            .forwarder_addrs()
            .map_err(DomainError::ConfigError)?
            .into_iter()
            .map(ClassicUpstream::new)
            .collect();

        let doh = if config.doh_enabled && !config.doh_endpoints.is_empty() {
            let client = build_doh_client()?;
            config
                .doh_endpoints
                .iter()
                .map(|url| {
                    let transport: Box<dyn DnsTransport> =
                        Box::new(HttpsTransport::new(url.clone(), client.clone()));
                    (url.clone(), transport)
                })
                .collect()
        } else {
            Vec::new()
        };

        Ok(Self::new(
            classic,
            doh,
            config.doh_enabled,
            Duration::from_millis(config.query_timeout_ms),
        ))
    }

    async fn exchange(
        &self,
        transport: &dyn DnsTransport,
        query: &Message,
    ) -> Result<Message, DomainError> {
        let mut outbound = query.clone();
        outbound.header.id = fastrand::u16(..);
        let bytes = outbound.encode()?;

        let response = transport.send(&bytes, self.timeout).await?;
        let mut answer = Message::decode(&response.bytes)?;

        if !answer.header.is_response {
            return Err(DomainError::InvalidDnsResponse(format!(
                "{} reply without QR bit",
                response.protocol_used
            )));
        }
        if answer.header.id != outbound.header.id {
            return Err(DomainError::InvalidDnsResponse(format!(
                "{} reply id {} does not match query id {}",
                response.protocol_used, answer.header.id, outbound.header.id
            )));
        }

        answer.header.id = query.header.id;
        Ok(answer)
    }

    async fn exchange_classic(
        &self,
        upstream: &ClassicUpstream,
        query: &Message,
    ) -> Result<Message, DomainError> {
        let answer = self.exchange(upstream.udp.as_ref(), query).await?;
        if !answer.header.truncated {
            return Ok(answer);
        }

        debug!(server = %upstream.label, "Truncated UDP answer, retrying over TCP");
        self.exchange(upstream.tcp.as_ref(), query).await
    }
}

#[async_trait]
impl UpstreamResolver for UpstreamForwarder {
    fn doh_enabled(&self) -> bool {
        self.doh_enabled && !self.doh.is_empty()
    }

    async fn forward_doh(&self, query: &Message) -> Result<Option<Message>, DomainError> {
        if !self.doh_enabled() {
            return Ok(None);
        }

        let mut last_error = None;
        for (transport, url) in self.doh.iter().zip(&self.doh_labels) {
            match self.exchange(transport.as_ref(), query).await {
                Ok(answer) => {
                    debug!(url = %url, rcode = %answer.rcode(), "DoH answer");
                    return Ok(Some(answer));
                }
                Err(e) => {
                    warn!(url = %url, error = %e, "DoH endpoint failed");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) => Err(DomainError::DohFailed(e.to_string())),
            None => Ok(None),
        }
    }

    async fn forward_classic(&self, query: &Message) -> Result<Option<Message>, DomainError> {
        let mut last_error = None;
        for upstream in &self.classic {
            match self.exchange_classic(upstream, query).await {
                Ok(answer) => {
                    debug!(server = %upstream.label, rcode = %answer.rcode(), "Upstream answer");
                    return Ok(Some(answer));
                }
                Err(e) => {
                    warn!(server = %upstream.label, error = %e, "Upstream forwarder failed");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) => Err(e),
            None => Ok(None),
        }
    }
}
