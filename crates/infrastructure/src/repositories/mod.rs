pub mod block_list_repository;
pub mod client_repository;
pub mod domain_repository;
pub mod query_log_repository;

pub use block_list_repository::SqliteBlockListRepository;
pub use client_repository::SqliteClientRepository;
pub use domain_repository::SqliteDomainRepository;
pub use query_log_repository::SqliteQueryLogRepository;
