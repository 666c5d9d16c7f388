use async_trait::async_trait;
use sinkhole_dns_domain::{DomainError, DownloadProgress, UpdateRequest};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockCountersSnapshot {
    pub blocked_domains: u64,
    pub allowed_domains: u64,
    pub blocked_requests: u64,
}

#[async_trait]
pub trait BlockFilterEnginePort: Send + Sync {
    /// Whether `hostname` or any parent of it is on the block list.
    async fn is_blocked(&self, hostname: &str) -> Result<bool, DomainError>;

    /// Queues a list refresh. Waits while the queue is full.
    async fn enqueue(&self, request: UpdateRequest) -> Result<(), DomainError>;

    fn record_blocked_request(&self);

    fn counters(&self) -> BlockCountersSnapshot;

    /// Reloads the blocked/allowed totals from the domain store.
    async fn refresh_counters(&self) -> Result<BlockCountersSnapshot, DomainError>;

    /// Drops any cached decision for `hostname`.
    fn invalidate(&self, hostname: &str);

    /// Drops every cached decision.
    fn clear_cache(&self);

    fn running_downloads(&self) -> Vec<DownloadProgress>;
}
