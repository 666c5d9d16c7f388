use async_trait::async_trait;
use sinkhole_dns_domain::{Client, DomainError};
use std::net::IpAddr;

#[async_trait]
pub trait ClientRepository: Send + Sync {
    /// Get or create a client by IP address, bumping its last-seen time
    async fn get_or_create(&self, ip_address: IpAddr) -> Result<Client, DomainError>;

    async fn get_all(&self) -> Result<Vec<Client>, DomainError>;

    /// Insert or update the client keyed by its IP address
    async fn upsert(&self, client: &Client) -> Result<(), DomainError>;
}
