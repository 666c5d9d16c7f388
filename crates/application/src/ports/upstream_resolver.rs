use async_trait::async_trait;
use sinkhole_dns_domain::{DomainError, Message};

#[async_trait]
pub trait UpstreamResolver: Send + Sync {
    fn doh_enabled(&self) -> bool;

    /// Tries each DoH endpoint in order. `Ok(None)` means no endpoint answered;
    /// `Err` means every endpoint failed.
    async fn forward_doh(&self, query: &Message) -> Result<Option<Message>, DomainError>;

    /// Tries each classic forwarder in order.
    async fn forward_classic(&self, query: &Message) -> Result<Option<Message>, DomainError>;
}
