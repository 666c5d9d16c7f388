//! Sinkhole DNS Domain Layer
pub mod block_list;
pub mod client;
pub mod config;
pub mod domain_entry;
pub mod errors;
pub mod query_log;
pub mod wire;

pub use block_list::{BlockList, DownloadProgress, UpdateRequest};
pub use client::Client;
pub use config::Config;
pub use domain_entry::{normalize_hostname, DomainEntry, DomainList};
pub use errors::DomainError;
pub use query_log::QueryLog;
pub use wire::{
    DomainName, Message, Question, RData, RecordClass, RecordType, ResolveType, ResourceRecord,
    ResponseCode, WireError,
};
