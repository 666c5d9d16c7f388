use sinkhole_dns_infrastructure::repositories::{
    SqliteBlockListRepository, SqliteClientRepository, SqliteDomainRepository,
    SqliteQueryLogRepository,
};
use sqlx::SqlitePool;
use std::sync::Arc;

pub struct Repositories {
    pub domains: Arc<SqliteDomainRepository>,
    pub block_lists: Arc<SqliteBlockListRepository>,
    pub clients: Arc<SqliteClientRepository>,
    pub query_log: Arc<SqliteQueryLogRepository>,
}

impl Repositories {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            domains: Arc::new(SqliteDomainRepository::new(pool.clone())),
            block_lists: Arc::new(SqliteBlockListRepository::new(pool.clone())),
            clients: Arc::new(SqliteClientRepository::new(pool.clone())),
            query_log: Arc::new(SqliteQueryLogRepository::new(pool)),
        }
    }
}
