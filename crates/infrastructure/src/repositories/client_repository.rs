use async_trait::async_trait;
use sinkhole_dns_application::ports::ClientRepository;
use sinkhole_dns_domain::{Client, DomainError};
use sqlx::SqlitePool;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{error, instrument, warn};

type ClientRow = (i64, String, Option<String>, bool, String, String, i64);

const SELECT_CLIENT: &str = "SELECT id, ip_address, hostname, blocked,
        datetime(first_seen) AS first_seen,
        datetime(last_seen) AS last_seen,
        query_count
     FROM clients";

pub struct SqliteClientRepository {
    pool: SqlitePool,
}

impl SqliteClientRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_client(row: ClientRow) -> Option<Client> {
        let (id, ip, hostname, blocked, first_seen, last_seen, query_count) = row;
        let ip_address = match ip.parse() {
            Ok(ip) => ip,
            Err(_) => {
                warn!(ip = %ip, "Skipping client row with unparseable address");
                return None;
            }
        };
        Some(Client {
            id: Some(id),
            ip_address,
            hostname: hostname.map(|s| Arc::from(s.as_str())),
            blocked,
            first_seen: Some(first_seen),
            last_seen: Some(last_seen),
            query_count: query_count as u64,
        })
    }
}

fn db_error(e: sqlx::Error) -> DomainError {
    DomainError::DatabaseError(e.to_string())
}

#[async_trait]
impl ClientRepository for SqliteClientRepository {
    #[instrument(skip(self))]
    async fn get_or_create(&self, ip_address: IpAddr) -> Result<Client, DomainError> {
        let ip_str = ip_address.to_string();

        sqlx::query(
            "INSERT INTO clients (ip_address, first_seen, last_seen, query_count)
             VALUES (?, CURRENT_TIMESTAMP, CURRENT_TIMESTAMP, 1)
             ON CONFLICT(ip_address) DO UPDATE SET
                 last_seen = CURRENT_TIMESTAMP,
                 query_count = query_count + 1,
                 updated_at = CURRENT_TIMESTAMP",
        )
        .bind(&ip_str)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(error = %e, ip = %ip_address, "Failed to record client");
            db_error(e)
        })?;

        let row = sqlx::query_as::<_, ClientRow>(&format!("{} WHERE ip_address = ?", SELECT_CLIENT))
            .bind(&ip_str)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                error!(error = %e, ip = %ip_address, "Failed to load client");
                db_error(e)
            })?;

        Ok(Self::row_to_client(row).unwrap_or_else(|| Client::new(ip_address)))
    }

    #[instrument(skip(self))]
    async fn get_all(&self) -> Result<Vec<Client>, DomainError> {
        let rows = sqlx::query_as::<_, ClientRow>(&format!("{} ORDER BY last_seen DESC", SELECT_CLIENT))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to fetch clients");
                db_error(e)
            })?;

        Ok(rows.into_iter().filter_map(Self::row_to_client).collect())
    }

    #[instrument(skip(self, client), fields(ip = %client.ip_address))]
    async fn upsert(&self, client: &Client) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO clients (ip_address, hostname, blocked)
             VALUES (?, ?, ?)
             ON CONFLICT(ip_address) DO UPDATE SET
                 hostname = excluded.hostname,
                 blocked = excluded.blocked,
                 updated_at = CURRENT_TIMESTAMP",
        )
        .bind(client.ip_address.to_string())
        .bind(client.hostname.as_deref())
        .bind(client.blocked)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to upsert client");
            db_error(e)
        })?;

        Ok(())
    }
}
