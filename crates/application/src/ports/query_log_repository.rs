use async_trait::async_trait;
use sinkhole_dns_domain::{DomainError, QueryLog};

#[async_trait]
pub trait QueryLogRepository: Send + Sync {
    async fn log_query(&self, query: &QueryLog) -> Result<(), DomainError>;

    async fn get_recent(&self, limit: u32) -> Result<Vec<QueryLog>, DomainError>;
}
