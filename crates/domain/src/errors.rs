use thiserror::Error;

use crate::wire::WireError;

#[derive(Error, Debug, Clone)]
pub enum DomainError {
    #[error("Invalid domain name: {0}")]
    InvalidDomainName(String),

    #[error("Invalid IP address: {0}")]
    InvalidIpAddress(String),

    #[error("Malformed packet: {0}")]
    Wire(#[from] WireError),

    #[error("Invalid DNS response: {0}")]
    InvalidDnsResponse(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Query timeout")]
    QueryTimeout,

    #[error("Upstream resolvers are unreachable")]
    Unreachable,

    #[error("DNS-over-HTTPS resolution failed: {0}")]
    DohFailed(String),

    #[error("Transport timeout connecting to {server}")]
    TransportTimeout { server: String },

    #[error("Transport connection refused by {server}")]
    TransportConnectionRefused { server: String },

    #[error("Transport error: {0}")]
    TransportError(String),

    #[error("Block list fetch error: {0}")]
    BlockListFetchError(String),

    #[error("Block list ingestion queue is closed")]
    QueueClosed,

    #[error("Catalog invariant violated: {0}")]
    CatalogInvariant(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<std::io::Error> for DomainError {
    fn from(e: std::io::Error) -> Self {
        DomainError::IoError(e.to_string())
    }
}
