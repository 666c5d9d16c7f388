use async_trait::async_trait;
use sinkhole_dns_domain::{BlockList, DomainError};

#[async_trait]
pub trait BlockListRepository: Send + Sync {
    async fn list_enabled(&self) -> Result<Vec<BlockList>, DomainError>;

    async fn list_all(&self) -> Result<Vec<BlockList>, DomainError>;

    async fn get_by_url(&self, url: &str) -> Result<Option<BlockList>, DomainError>;

    /// Inserts or updates the row keyed by `list.url`.
    async fn upsert(&self, list: &BlockList) -> Result<(), DomainError>;

    /// Adds an enabled list if the URL is unknown. Returns true when inserted.
    async fn ensure_exists(&self, url: &str) -> Result<bool, DomainError>;
}
