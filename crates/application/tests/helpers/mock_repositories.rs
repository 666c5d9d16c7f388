#![allow(dead_code)]
#![allow(unused_imports)]

use async_trait::async_trait;
use sinkhole_dns_application::ports::{
    AnswerCache, BlockCountersSnapshot, BlockFilterEnginePort, BlockListRepository,
    ClientRepository, ConnectivityProbe, DomainRepository, QueryLogRepository, ResponseChannel,
    Transport, UpstreamResolver,
};
use sinkhole_dns_domain::{
    BlockList, Client, DomainEntry, DomainError, DomainList, DownloadProgress, Message, QueryLog,
    Question, UpdateRequest,
};
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

// ── block filter ───────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockBlockFilterEngine {
    blocked: RwLock<Vec<String>>,
    blocked_requests: AtomicU64,
    enqueued: RwLock<Vec<UpdateRequest>>,
    fail_enqueue: AtomicBool,
    invalidated: RwLock<Vec<String>>,
}

impl MockBlockFilterEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn block(&self, name: &str) {
        self.blocked.write().unwrap().push(name.to_string());
    }

    pub fn blocked_requests(&self) -> u64 {
        self.blocked_requests.load(Ordering::Relaxed)
    }

    pub fn enqueued(&self) -> Vec<UpdateRequest> {
        self.enqueued.read().unwrap().clone()
    }

    pub fn invalidated(&self) -> Vec<String> {
        self.invalidated.read().unwrap().clone()
    }

    pub fn set_fail_enqueue(&self, fail: bool) {
        self.fail_enqueue.store(fail, Ordering::Relaxed);
    }
}

#[async_trait]
impl BlockFilterEnginePort for MockBlockFilterEngine {
    async fn is_blocked(&self, hostname: &str) -> Result<bool, DomainError> {
        let blocked = self.blocked.read().unwrap();
        Ok(blocked
            .iter()
            .any(|b| hostname == b || hostname.ends_with(&format!(".{}", b))))
    }

    async fn enqueue(&self, request: UpdateRequest) -> Result<(), DomainError> {
        if self.fail_enqueue.load(Ordering::Relaxed) {
            return Err(DomainError::QueueClosed);
        }
        self.enqueued.write().unwrap().push(request);
        Ok(())
    }

    fn record_blocked_request(&self) {
        self.blocked_requests.fetch_add(1, Ordering::Relaxed);
    }

    fn counters(&self) -> BlockCountersSnapshot {
        BlockCountersSnapshot {
            blocked_domains: self.blocked.read().unwrap().len() as u64,
            allowed_domains: 0,
            blocked_requests: self.blocked_requests(),
        }
    }

    async fn refresh_counters(&self) -> Result<BlockCountersSnapshot, DomainError> {
        Ok(self.counters())
    }

    fn invalidate(&self, hostname: &str) {
        self.invalidated.write().unwrap().push(hostname.to_string());
    }

    fn clear_cache(&self) {}

    fn running_downloads(&self) -> Vec<DownloadProgress> {
        Vec::new()
    }
}

// ── clients ────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockClientRepository {
    clients: RwLock<HashMap<IpAddr, Client>>,
    should_fail: AtomicBool,
}

impl MockClientRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clients(clients: Vec<Client>) -> Self {
        let repo = Self::new();
        for client in clients {
            repo.clients
                .write()
                .unwrap()
                .insert(client.ip_address, client);
        }
        repo
    }

    pub fn block(&self, ip: IpAddr) {
        let mut clients = self.clients.write().unwrap();
        let client = clients.entry(ip).or_insert_with(|| Client::new(ip));
        client.blocked = true;
    }

    pub fn count(&self) -> usize {
        self.clients.read().unwrap().len()
    }

    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::Relaxed);
    }
}

#[async_trait]
impl ClientRepository for MockClientRepository {
    async fn get_or_create(&self, ip_address: IpAddr) -> Result<Client, DomainError> {
        if self.should_fail.load(Ordering::Relaxed) {
            return Err(DomainError::DatabaseError("mock failure".into()));
        }
        let mut clients = self.clients.write().unwrap();
        let client = clients
            .entry(ip_address)
            .or_insert_with(|| Client::new(ip_address));
        client.query_count += 1;
        Ok(client.clone())
    }

    async fn get_all(&self) -> Result<Vec<Client>, DomainError> {
        if self.should_fail.load(Ordering::Relaxed) {
            return Err(DomainError::DatabaseError("mock failure".into()));
        }
        Ok(self.clients.read().unwrap().values().cloned().collect())
    }

    async fn upsert(&self, client: &Client) -> Result<(), DomainError> {
        self.clients
            .write()
            .unwrap()
            .insert(client.ip_address, client.clone());
        Ok(())
    }
}

// ── domains ────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockDomainRepository {
    entries: RwLock<Vec<DomainEntry>>,
    next_id: AtomicU64,
}

impl MockDomainRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<DomainEntry> {
        self.entries.read().unwrap().clone()
    }

    pub fn names_in(&self, list: DomainList) -> Vec<String> {
        self.entries
            .read()
            .unwrap()
            .iter()
            .filter(|e| e.list == list)
            .map(|e| e.name.to_string())
            .collect()
    }

    fn push(&self, entry: &DomainEntry) {
        let mut entry = entry.clone();
        entry.id = Some(self.next_id.fetch_add(1, Ordering::Relaxed) as i64 + 1);
        self.entries.write().unwrap().push(entry);
    }
}

#[async_trait]
impl DomainRepository for MockDomainRepository {
    async fn lookup(&self, name: &str) -> Result<Vec<DomainEntry>, DomainError> {
        Ok(self
            .entries
            .read()
            .unwrap()
            .iter()
            .filter(|e| e.name.as_ref() == name)
            .cloned()
            .collect())
    }

    async fn delete_by_id(&self, id: i64) -> Result<(), DomainError> {
        self.entries.write().unwrap().retain(|e| e.id != Some(id));
        Ok(())
    }

    async fn upsert(&self, entry: &DomainEntry) -> Result<(), DomainError> {
        {
            let mut entries = self.entries.write().unwrap();
            if let Some(existing) = entries.iter_mut().find(|e| e.name == entry.name) {
                let id = existing.id;
                *existing = entry.clone();
                existing.id = id;
                return Ok(());
            }
        }
        self.push(entry);
        Ok(())
    }

    async fn insert_if_missing(&self, entry: &DomainEntry) -> Result<bool, DomainError> {
        if self
            .entries
            .read()
            .unwrap()
            .iter()
            .any(|e| e.name == entry.name)
        {
            return Ok(false);
        }
        self.push(entry);
        Ok(true)
    }

    async fn bulk_upsert_blocked(
        &self,
        names: &[Arc<str>],
        redirect: IpAddr,
        list_url: &str,
    ) -> Result<u64, DomainError> {
        let mut written = 0;
        for name in names {
            let allowed = self
                .entries
                .read()
                .unwrap()
                .iter()
                .any(|e| &e.name == name && e.list == DomainList::Allowed);
            if allowed {
                continue;
            }
            let mut entry = DomainEntry::blocked(name.clone(), redirect);
            entry.list_url = Some(Arc::from(list_url));
            self.upsert(&entry).await?;
            written += 1;
        }
        Ok(written)
    }

    async fn count_by_list(&self, list: DomainList) -> Result<u64, DomainError> {
        Ok(self.names_in(list).len() as u64)
    }

    async fn names_in_list(&self, list: DomainList) -> Result<Vec<Arc<str>>, DomainError> {
        Ok(self
            .names_in(list)
            .into_iter()
            .map(|n| Arc::from(n.as_str()))
            .collect())
    }
}

// ── block lists ────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockBlockListRepository {
    lists: RwLock<Vec<BlockList>>,
}

impl MockBlockListRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lists(lists: Vec<BlockList>) -> Self {
        Self {
            lists: RwLock::new(lists),
        }
    }

    pub fn all(&self) -> Vec<BlockList> {
        self.lists.read().unwrap().clone()
    }
}

#[async_trait]
impl BlockListRepository for MockBlockListRepository {
    async fn list_enabled(&self) -> Result<Vec<BlockList>, DomainError> {
        Ok(self
            .all()
            .into_iter()
            .filter(|list| list.enabled)
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<BlockList>, DomainError> {
        Ok(self.all())
    }

    async fn get_by_url(&self, url: &str) -> Result<Option<BlockList>, DomainError> {
        Ok(self.all().into_iter().find(|list| list.url.as_ref() == url))
    }

    async fn upsert(&self, list: &BlockList) -> Result<(), DomainError> {
        let mut lists = self.lists.write().unwrap();
        match lists.iter_mut().find(|l| l.url == list.url) {
            Some(existing) => *existing = list.clone(),
            None => lists.push(list.clone()),
        }
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

// ── query log ──────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockQueryLogRepository {
    logs: RwLock<Vec<QueryLog>>,
}

impl MockQueryLogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn logs(&self) -> Vec<QueryLog> {
        self.logs.read().unwrap().clone()
    }
}

#[async_trait]
impl QueryLogRepository for MockQueryLogRepository {
    async fn log_query(&self, query: &QueryLog) -> Result<(), DomainError> {
        self.logs.write().unwrap().push(query.clone());
        Ok(())
    }

    async fn get_recent(&self, limit: u32) -> Result<Vec<QueryLog>, DomainError> {
        Ok(self
            .logs()
            .into_iter()
            .rev()
            .take(limit as usize)
            .collect())
    }
}

// ── upstream ───────────────────────────────────────────────────────────────

pub enum MockReply {
    Answer(Message),
    Nothing,
    Fail(DomainError),
}

impl MockReply {
    fn produce(&self) -> Result<Option<Message>, DomainError> {
        match self {
            MockReply::Answer(m) => Ok(Some(m.clone())),
            MockReply::Nothing => Ok(None),
            MockReply::Fail(e) => Err(e.clone()),
        }
    }
}

pub struct MockUpstreamResolver {
    doh_enabled: bool,
    doh: RwLock<MockReply>,
    classic: RwLock<MockReply>,
    pub doh_calls: AtomicUsize,
    pub classic_calls: AtomicUsize,
}

impl MockUpstreamResolver {
    pub fn new(doh_enabled: bool) -> Self {
        Self {
            doh_enabled,
            doh: RwLock::new(MockReply::Nothing),
            classic: RwLock::new(MockReply::Nothing),
            doh_calls: AtomicUsize::new(0),
            classic_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_doh(&self, reply: MockReply) {
        *self.doh.write().unwrap() = reply;
    }

    pub fn set_classic(&self, reply: MockReply) {
        *self.classic.write().unwrap() = reply;
    }

    pub fn doh_calls(&self) -> usize {
        self.doh_calls.load(Ordering::Relaxed)
    }

    pub fn classic_calls(&self) -> usize {
        self.classic_calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl UpstreamResolver for MockUpstreamResolver {
    fn doh_enabled(&self) -> bool {
        self.doh_enabled
    }

    async fn forward_doh(&self, _query: &Message) -> Result<Option<Message>, DomainError> {
        self.doh_calls.fetch_add(1, Ordering::Relaxed);
        self.doh.read().unwrap().produce()
    }

    async fn forward_classic(&self, _query: &Message) -> Result<Option<Message>, DomainError> {
        self.classic_calls.fetch_add(1, Ordering::Relaxed);
        self.classic.read().unwrap().produce()
    }
}

pub struct MockConnectivityProbe {
    reachable: AtomicBool,
}

impl MockConnectivityProbe {
    pub fn new(reachable: bool) -> Self {
        Self {
            reachable: AtomicBool::new(reachable),
        }
    }
}

#[async_trait]
impl ConnectivityProbe for MockConnectivityProbe {
    async fn is_reachable(&self) -> bool {
        self.reachable.load(Ordering::Relaxed)
    }
}

// ── answer cache ───────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MockAnswerCache {
    entries: RwLock<HashMap<Question, Message>>,
}

impl MockAnswerCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AnswerCache for MockAnswerCache {
    fn get(&self, question: &Question) -> Option<Message> {
        self.entries.read().unwrap().get(question).cloned()
    }

    fn insert(&self, question: &Question, response: &Message) {
        self.entries
            .write()
            .unwrap()
            .insert(question.clone(), response.clone());
    }

    fn remove_expired(&self) -> usize {
        0
    }

    fn len(&self) -> usize {
        self.entries.read().unwrap().len()
    }
}

// ── response channel ───────────────────────────────────────────────────────

pub struct MockResponseChannel {
    transport: Transport,
    peer: SocketAddr,
    sent: RwLock<Vec<Vec<u8>>>,
    fail: AtomicBool,
}

impl MockResponseChannel {
    pub fn new(transport: Transport, peer: &str) -> Self {
        Self {
            transport,
            peer: peer.parse().unwrap(),
            sent: RwLock::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    pub fn udp() -> Self {
        Self::new(Transport::Udp, "192.168.1.100:40000")
    }

    pub fn failing(self) -> Self {
        self.fail.store(true, Ordering::Relaxed);
        self
    }

    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.read().unwrap().clone()
    }

    pub fn last_response(&self) -> Option<Message> {
        self.sent()
            .last()
            .map(|bytes| Message::decode(bytes).unwrap())
    }
}

#[async_trait]
impl ResponseChannel for MockResponseChannel {
    fn transport(&self) -> Transport {
        self.transport
    }

    fn peer(&self) -> SocketAddr {
        self.peer
    }

    async fn send(&self, bytes: &[u8]) -> std::io::Result<()> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "mock send failure",
            ));
        }
        self.sent.write().unwrap().push(bytes.to_vec());
        Ok(())
    }
}
