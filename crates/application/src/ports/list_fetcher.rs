use async_trait::async_trait;
use sinkhole_dns_domain::DomainError;
use std::path::Path;

#[async_trait]
pub trait ListFetcher: Send + Sync {
    /// Streams the body at `url` into `dest`, returning the byte count.
    async fn download(&self, url: &str, dest: &Path) -> Result<u64, DomainError>;
}
