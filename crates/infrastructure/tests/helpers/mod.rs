pub mod fetcher;

pub use fetcher::StaticListFetcher;

use sinkhole_dns_infrastructure::database::create_memory_pool;
use sqlx::SqlitePool;

pub async fn memory_pool() -> SqlitePool {
    create_memory_pool().await.unwrap()
}
