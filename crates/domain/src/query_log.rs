use crate::wire::{RecordType, ResolveType, ResponseCode};
use std::net::IpAddr;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct QueryLog {
    pub id: Option<i64>,
    pub timestamp: Option<String>,
    pub client_ip: IpAddr,
    pub domain: Arc<str>,
    pub record_type: RecordType,
    pub response_code: ResponseCode,
    pub blocked: bool,
    pub from_cache: bool,
    pub resolve_type: ResolveType,
    pub elapsed_micros: u64,
}
