use async_trait::async_trait;
use sinkhole_dns_application::ports::QueryLogRepository;
use sinkhole_dns_domain::{DomainError, QueryLog, RecordType, ResolveType, ResponseCode};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{error, instrument, warn};

type QueryLogRow = (i64, String, String, String, String, String, bool, bool, String, i64);

pub struct SqliteQueryLogRepository {
    pool: SqlitePool,
}

impl SqliteQueryLogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_log(row: QueryLogRow) -> Option<QueryLog> {
        let (
            id,
            timestamp,
            client_ip,
            domain,
            record_type,
            response_code,
            blocked,
            from_cache,
            resolve_type,
            elapsed_micros,
        ) = row;
        let Ok(client_ip) = client_ip.parse() else {
            warn!(id, ip = %client_ip, "Skipping query log row with bad client address");
            return None;
        };
        Some(QueryLog {
            id: Some(id),
            timestamp: Some(timestamp),
            client_ip,
            domain: Arc::from(domain.as_str()),
            record_type: record_type.parse().unwrap_or(RecordType::Unknown(0)),
            response_code: parse_rcode(&response_code),
            blocked,
            from_cache,
            resolve_type: ResolveType::from_str(&resolve_type).unwrap_or_default(),
            elapsed_micros: elapsed_micros.max(0) as u64,
        })
    }
}

fn parse_rcode(s: &str) -> ResponseCode {
    (0u8..=10)
        .map(ResponseCode::from_u8)
        .find(|code| code.as_str() == s)
        .unwrap_or(ResponseCode::ServFail)
}

#[async_trait]
impl QueryLogRepository for SqliteQueryLogRepository {
    #[instrument(skip(self, query), fields(domain = %query.domain))]
    async fn log_query(&self, query: &QueryLog) -> Result<(), DomainError> {
        sqlx::query(
            "INSERT INTO query_log
                (client_ip, domain, record_type, response_code, blocked, from_cache, resolve_type, elapsed_micros)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(query.client_ip.to_string())
        .bind(query.domain.as_ref())
        .bind(query.record_type.to_string())
        .bind(query.response_code.as_str())
        .bind(query.blocked)
        .bind(query.from_cache)
        .bind(query.resolve_type.as_str())
        .bind(query.elapsed_micros as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to insert query log");
            DomainError::DatabaseError(e.to_string())
        })?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_recent(&self, limit: u32) -> Result<Vec<QueryLog>, DomainError> {
        let rows = sqlx::query_as::<_, QueryLogRow>(
            "SELECT id, datetime(timestamp), client_ip, domain, record_type, response_code,
                    blocked, from_cache, resolve_type, elapsed_micros
             FROM query_log
             ORDER BY id DESC
             LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to fetch recent queries");
            DomainError::DatabaseError(e.to_string())
        })?;

        Ok(rows.into_iter().filter_map(Self::row_to_log).collect())
    }
}
