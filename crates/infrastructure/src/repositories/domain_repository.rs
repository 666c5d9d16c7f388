use async_trait::async_trait;
use sinkhole_dns_application::ports::DomainRepository;
use sinkhole_dns_domain::{DomainEntry, DomainError, DomainList};
use sqlx::SqlitePool;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, error, instrument};

type DomainRow = (
    i64,
    String,
    Option<String>,
    String,
    Option<String>,
    Option<String>,
);

pub struct SqliteDomainRepository {
    pool: SqlitePool,
}

impl SqliteDomainRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_entry(row: DomainRow) -> DomainEntry {
        let (id, name, forward_ip, list, category, list_url) = row;
        DomainEntry {
            id: Some(id),
            name: Arc::from(name.as_str()),
            forward_ip: forward_ip.and_then(|ip| ip.parse().ok()),
            list: DomainList::from_str(&list).unwrap_or(DomainList::Unlisted),
            category: category.map(|c| Arc::from(c.as_str())),
            list_url: list_url.map(|u| Arc::from(u.as_str())),
        }
    }
}

fn db_error(e: sqlx::Error) -> DomainError {
    DomainError::DatabaseError(e.to_string())
}

#[async_trait]
impl DomainRepository for SqliteDomainRepository {
    #[instrument(skip(self))]
    async fn lookup(&self, name: &str) -> Result<Vec<DomainEntry>, DomainError> {
        let rows = sqlx::query_as::<_, DomainRow>(
            "SELECT id, name, forward_ip, list, category, list_url
             FROM domains WHERE name = ? ORDER BY id",
        )
        .bind(name)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to look up domain");
            db_error(e)
        })?;

        Ok(rows.into_iter().map(Self::row_to_entry).collect())
    }

    #[instrument(skip(self))]
    async fn delete_by_id(&self, id: i64) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM domains WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to delete domain row");
                db_error(e)
            })?;
        Ok(())
    }

    #[instrument(skip(self, entry), fields(name = %entry.name))]
    async fn upsert(&self, entry: &DomainEntry) -> Result<(), DomainError> {
        let forward_ip = entry.forward_ip.map(|ip| ip.to_string());
        let updated = sqlx::query(
            "UPDATE domains SET forward_ip = ?, list = ?, category = ?, list_url = ?,
                    updated_at = CURRENT_TIMESTAMP
             WHERE name = ?",
        )
        .bind(&forward_ip)
        .bind(entry.list.to_str())
        .bind(entry.category.as_deref())
        .bind(entry.list_url.as_deref())
        .bind(entry.name.as_ref())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to update domain");
            db_error(e)
        })?;

        if updated.rows_affected() == 0 {
            sqlx::query(
                "INSERT INTO domains (name, forward_ip, list, category, list_url)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(entry.name.as_ref())
            .bind(&forward_ip)
            .bind(entry.list.to_str())
            .bind(entry.category.as_deref())
            .bind(entry.list_url.as_deref())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to insert domain");
                db_error(e)
            })?;
        }
        Ok(())
    }

    #[instrument(skip(self, entry), fields(name = %entry.name))]
    async fn insert_if_missing(&self, entry: &DomainEntry) -> Result<bool, DomainError> {
        let result = sqlx::query(
            "INSERT INTO domains (name, forward_ip, list, category, list_url)
             SELECT ?, ?, ?, ?, ?
             WHERE NOT EXISTS (SELECT 1 FROM domains WHERE name = ?)",
        )
        .bind(entry.name.as_ref())
        .bind(entry.forward_ip.map(|ip| ip.to_string()))
        .bind(entry.list.to_str())
        .bind(entry.category.as_deref())
        .bind(entry.list_url.as_deref())
        .bind(entry.name.as_ref())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to insert seen domain");
            db_error(e)
        })?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, names), fields(count = names.len()))]
    async fn bulk_upsert_blocked(
        &self,
        names: &[Arc<str>],
        redirect: IpAddr,
        list_url: &str,
    ) -> Result<u64, DomainError> {
        let redirect = redirect.to_string();
        let mut tx = self.pool.begin().await.map_err(|e| {
            error!(error = %e, "Failed to begin bulk upsert");
            db_error(e)
        })?;

        let mut written = 0u64;
        for name in names {
            let updated = sqlx::query(
                "UPDATE domains SET list = 'blocked', forward_ip = ?, list_url = ?,
                        updated_at = CURRENT_TIMESTAMP
                 WHERE name = ? AND list != 'allowed'",
            )
            .bind(&redirect)
            .bind(list_url)
            .bind(name.as_ref())
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

            if updated.rows_affected() > 0 {
                written += 1;
                continue;
            }

            let inserted = sqlx::query(
                "INSERT INTO domains (name, forward_ip, list, list_url)
                 SELECT ?, ?, 'blocked', ?
                 WHERE NOT EXISTS (SELECT 1 FROM domains WHERE name = ?)",
            )
            .bind(name.as_ref())
            .bind(&redirect)
            .bind(list_url)
            .bind(name.as_ref())
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
            written += inserted.rows_affected();
        }

        tx.commit().await.map_err(|e| {
            error!(error = %e, "Failed to commit bulk upsert");
            db_error(e)
        })?;

        debug!(written, list_url, "Blocked domains stored");
        Ok(written)
    }

    #[instrument(skip(self))]
    async fn count_by_list(&self, list: DomainList) -> Result<u64, DomainError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(DISTINCT name) FROM domains WHERE list = ?")
            .bind(list.to_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to count domains");
                db_error(e)
            })?;
        Ok(count.max(0) as u64)
    }

    #[instrument(skip(self))]
    async fn names_in_list(&self, list: DomainList) -> Result<Vec<Arc<str>>, DomainError> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT DISTINCT name FROM domains WHERE list = ? ORDER BY name")
                .bind(list.to_str())
                .fetch_all(&self.pool)
                .await
                .map_err(|e| {
                    error!(error = %e, "Failed to list domains");
                    db_error(e)
                })?;
        Ok(rows.into_iter().map(|(n,)| Arc::from(n.as_str())).collect())
    }
}
