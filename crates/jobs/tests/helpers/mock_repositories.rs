#![allow(dead_code)]

use async_trait::async_trait;
use sinkhole_dns_application::ports::{
    AnswerCache, BlockCountersSnapshot, BlockFilterEnginePort, BlockListRepository,
    ClientRepository,
};
use sinkhole_dns_domain::{
    BlockList, Client, DomainError, DownloadProgress, Message, Question, UpdateRequest,
};
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::RwLock;

// ── engine ─────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockBlockFilterEngine {
    enqueued: RwLock<Vec<UpdateRequest>>,
    cache_clears: AtomicU64,
    counter_refreshes: AtomicU64,
    blocked_domains: AtomicU64,
}

impl MockBlockFilterEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_blocked_domains(self, count: u64) -> Self {
        self.blocked_domains.store(count, Ordering::SeqCst);
        self
    }

    pub fn enqueued(&self) -> Vec<UpdateRequest> {
        self.enqueued.read().unwrap().clone()
    }

    pub fn cache_clears(&self) -> u64 {
        self.cache_clears.load(Ordering::SeqCst)
    }

    pub fn counter_refreshes(&self) -> u64 {
        self.counter_refreshes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BlockFilterEnginePort for MockBlockFilterEngine {
    async fn is_blocked(&self, _hostname: &str) -> Result<bool, DomainError> {
        Ok(false)
    }

    async fn enqueue(&self, request: UpdateRequest) -> Result<(), DomainError> {
        self.enqueued.write().unwrap().push(request);
        Ok(())
    }

    fn record_blocked_request(&self) {}

    fn counters(&self) -> BlockCountersSnapshot {
        BlockCountersSnapshot {
            blocked_domains: self.blocked_domains.load(Ordering::SeqCst),
            allowed_domains: 0,
            blocked_requests: 0,
        }
    }

    async fn refresh_counters(&self) -> Result<BlockCountersSnapshot, DomainError> {
        self.counter_refreshes.fetch_add(1, Ordering::SeqCst);
        Ok(self.counters())
    }

    fn invalidate(&self, _hostname: &str) {}

    fn clear_cache(&self) {
        self.cache_clears.fetch_add(1, Ordering::SeqCst);
    }

    fn running_downloads(&self) -> Vec<DownloadProgress> {
        Vec::new()
    }
}

// ── block lists ────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockBlockListRepository {
    lists: RwLock<Vec<BlockList>>,
}

impl MockBlockListRepository {
    pub fn with_urls(urls: &[&str]) -> Self {
        Self {
            lists: RwLock::new(urls.iter().map(|u| BlockList::new(*u)).collect()),
        }
    }
}

#[async_trait]
impl BlockListRepository for MockBlockListRepository {
    async fn list_enabled(&self) -> Result<Vec<BlockList>, DomainError> {
        Ok(self
            .lists
            .read()
            .unwrap()
            .iter()
            .filter(|l| l.enabled)
            .cloned()
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<BlockList>, DomainError> {
        Ok(self.lists.read().unwrap().clone())
    }

    async fn get_by_url(&self, url: &str) -> Result<Option<BlockList>, DomainError> {
        Ok(self
            .lists
            .read()
            .unwrap()
            .iter()
            .find(|l| l.url.as_ref() == url)
            .cloned())
    }

    async fn upsert(&self, list: &BlockList) -> Result<(), DomainError> {
        let mut lists = self.lists.write().unwrap();
        lists.retain(|l| l.url != list.url);
        lists.push(list.clone());
        Ok(())
    }

    async fn ensure_exists(&self, url: &str) -> Result<bool, DomainError> {
        let mut lists = self.lists.write().unwrap();
        if lists.iter().any(|l| l.url.as_ref() == url) {
            return Ok(false);
        }
        lists.push(BlockList::new(url));
        Ok(true)
    }
}

// ── clients ────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockClientRepository {
    clients: RwLock<Vec<Client>>,
    should_fail: AtomicBool,
}

impl MockClientRepository {
    pub fn with_clients(clients: Vec<Client>) -> Self {
        Self {
            clients: RwLock::new(clients),
            should_fail: AtomicBool::new(false),
        }
    }

    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ClientRepository for MockClientRepository {
    async fn get_or_create(&self, ip_address: IpAddr) -> Result<Client, DomainError> {
        Ok(Client::new(ip_address))
    }

    async fn get_all(&self) -> Result<Vec<Client>, DomainError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(DomainError::DatabaseError("mock failure".to_string()));
        }
        Ok(self.clients.read().unwrap().clone())
    }

    async fn upsert(&self, client: &Client) -> Result<(), DomainError> {
        self.clients.write().unwrap().push(client.clone());
        Ok(())
    }
}

// ── answer cache ───────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockAnswerCache {
    expired_per_sweep: AtomicUsize,
    sweeps: AtomicUsize,
}

impl MockAnswerCache {
    pub fn expiring(count: usize) -> Self {
        let cache = Self::default();
        cache.expired_per_sweep.store(count, Ordering::SeqCst);
        cache
    }

    pub fn sweeps(&self) -> usize {
        self.sweeps.load(Ordering::SeqCst)
    }
}

impl AnswerCache for MockAnswerCache {
    fn get(&self, _question: &Question) -> Option<Message> {
        None
    }

    fn insert(&self, _question: &Question, _response: &Message) {}

    fn remove_expired(&self) -> usize {
        self.sweeps.fetch_add(1, Ordering::SeqCst);
        self.expired_per_sweep.load(Ordering::SeqCst)
    }

    fn len(&self) -> usize {
        0
    }
}
