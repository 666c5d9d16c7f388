use async_trait::async_trait;
use sinkhole_dns_application::ports::BlockListRepository;
use sinkhole_dns_domain::{BlockList, DomainError};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{error, instrument};

type BlockListRow = (i64, String, bool, i64, Option<i64>);

const SELECT_LIST: &str = "SELECT id, url, enabled, entry_count, last_updated FROM block_lists";

pub struct SqliteBlockListRepository {
    pool: SqlitePool,
}

impl SqliteBlockListRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_list(row: BlockListRow) -> BlockList {
        let (id, url, enabled, entry_count, last_updated) = row;
        BlockList {
            id: Some(id),
            url: Arc::from(url.as_str()),
            enabled,
            entry_count: entry_count.max(0) as u64,
            last_updated,
        }
    }

    async fn fetch(&self, sql: &str) -> Result<Vec<BlockList>, DomainError> {
        let rows = sqlx::query_as::<_, BlockListRow>(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to fetch block lists");
                DomainError::DatabaseError(e.to_string())
            })?;
        Ok(rows.into_iter().map(Self::row_to_list).collect())
    }
}

#[async_trait]
impl BlockListRepository for SqliteBlockListRepository {
    #[instrument(skip(self))]
    async fn list_enabled(&self) -> Result<Vec<BlockList>, DomainError> {
        self.fetch(&format!("{} WHERE enabled = 1 ORDER BY id", SELECT_LIST))
            .await
    }

    #[instrument(skip(self))]
    async fn list_all(&self) -> Result<Vec<BlockList>, DomainError> {
        self.fetch(&format!("{} ORDER BY id", SELECT_LIST)).await
    }

    #[instrument(skip(self))]
    async fn get_by_url(&self, url: &str) -> Result<Option<BlockList>, DomainError> {
        let row = sqlx::query_as::<_, BlockListRow>(&format!("{} WHERE url = ?", SELECT_LIST))
            .bind(url)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to fetch block list");
                DomainError::DatabaseError(e.to_string())
            })?;
        Ok(row.map(Self::row_to_list))
    }

    #[instrument(skip(self, list), fields(url = %list.url))]
    async fn upsert(&self, list: &BlockList) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO block_lists (url, enabled, entry_count, last_updated)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(url) DO UPDATE SET
                 enabled = excluded.enabled,
                 entry_count = excluded.entry_count,
                 last_updated = excluded.last_updated,
                 updated_at = CURRENT_TIMESTAMP",
        )
        .bind(list.url.as_ref())
        .bind(list.enabled)
        .bind(list.entry_count as i64)
        .bind(list.last_updated)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to upsert block list");
            DomainError::DatabaseError(e.to_string())
        })?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn ensure_exists(&self, url: &str) -> Result<bool, DomainError> {
        let result = sqlx::query("INSERT OR IGNORE INTO block_lists (url, enabled) VALUES (?, 1)")
            .bind(url)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to register block list");
                DomainError::DatabaseError(e.to_string())
            })?;
        Ok(result.rows_affected() > 0)
    }
}
