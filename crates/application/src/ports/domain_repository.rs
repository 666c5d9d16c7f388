use async_trait::async_trait;
use sinkhole_dns_domain::{DomainEntry, DomainError, DomainList};
use std::net::IpAddr;
use std::sync::Arc;

#[async_trait]
pub trait DomainRepository: Send + Sync {
    /// Every row stored under `name`, oldest first. More than one row is a
    /// data defect the caller is expected to repair.
    async fn lookup(&self, name: &str) -> Result<Vec<DomainEntry>, DomainError>;

    async fn delete_by_id(&self, id: i64) -> Result<(), DomainError>;

    async fn upsert(&self, entry: &DomainEntry) -> Result<(), DomainError>;

    /// Inserts `entry` unless a row with that name exists. Returns true when inserted.
    async fn insert_if_missing(&self, entry: &DomainEntry) -> Result<bool, DomainError>;

    /// Marks every name as blocked with `redirect` as forward address, in one
    /// transaction. Rows on the allow list are left untouched.
    async fn bulk_upsert_blocked(
        &self,
        names: &[Arc<str>],
        redirect: IpAddr,
        list_url: &str,
    ) -> Result<u64, DomainError>;

    async fn count_by_list(&self, list: DomainList) -> Result<u64, DomainError>;

    async fn names_in_list(&self, list: DomainList) -> Result<Vec<Arc<str>>, DomainError>;
}
