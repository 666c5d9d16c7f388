mod answer_cache;
mod block_filter_engine;
mod block_list_repository;
mod client_repository;
mod connectivity_probe;
mod domain_repository;
mod list_fetcher;
mod query_log_repository;
mod response_channel;
mod upstream_resolver;

pub use answer_cache::AnswerCache;
pub use block_filter_engine::{BlockCountersSnapshot, BlockFilterEnginePort};
pub use block_list_repository::BlockListRepository;
pub use client_repository::ClientRepository;
pub use connectivity_probe::ConnectivityProbe;
pub use domain_repository::DomainRepository;
pub use list_fetcher::ListFetcher;
pub use query_log_repository::QueryLogRepository;
pub use response_channel::{ResponseChannel, Transport};
pub use upstream_resolver::UpstreamResolver;
