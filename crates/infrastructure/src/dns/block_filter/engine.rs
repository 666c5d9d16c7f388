use super::label_cache::{LabelCache, Verdict};
use super::list_parser::parse_list_line;
use async_trait::async_trait;
use dashmap::DashMap;
use futures::future::join_all;
use rustc_hash::FxBuildHasher;
use sinkhole_dns_application::ports::{
    BlockCountersSnapshot, BlockFilterEnginePort, BlockListRepository, DomainRepository,
    ListFetcher,
};
use sinkhole_dns_application::services::{EngineEvent, EventBus};
use sinkhole_dns_domain::config::BlockingConfig;
use sinkhole_dns_domain::{
    normalize_hostname, BlockList, DomainEntry, DomainError, DomainList, DownloadProgress,
    UpdateRequest,
};
use std::collections::HashSet;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// A list refreshed this recently is not downloaded again.
pub const STALENESS_WINDOW_SECS: i64 = 600;

const PROGRESS_EVERY_LINES: u64 = 100;

#[derive(Debug, Clone)]
pub struct BlockFilterSettings {
    pub lists_dir: PathBuf,
    pub show_console_progress: bool,
    pub queue_capacity: usize,
}

impl BlockFilterSettings {
    pub fn from_config(config: &BlockingConfig) -> Self {
        Self {
            lists_dir: PathBuf::from(&config.lists_dir),
            show_console_progress: config.show_console_progress,
            queue_capacity: config.queue_capacity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOutcome {
    Updated { entries: usize },
    Disabled,
    Fresh,
}

/// Decides whether a hostname is blocked and ingests remote block lists.
///
/// Lookups walk the label suffixes of the name, consulting the label cache
/// before the domain store. Ingestion requests go through a bounded queue
/// drained by a single consumer task; the lists of one request are processed
/// concurrently, but never two runs for the same URL at once.
pub struct BlockFilterEngine {
    domains: Arc<dyn DomainRepository>,
    lists: Arc<dyn BlockListRepository>,
    fetcher: Arc<dyn ListFetcher>,
    label_cache: LabelCache,
    counters: Mutex<BlockCountersSnapshot>,
    downloads: DashMap<Arc<str>, DownloadProgress, FxBuildHasher>,
    url_locks: DashMap<Arc<str>, Arc<tokio::sync::Mutex<()>>, FxBuildHasher>,
    sender: mpsc::Sender<UpdateRequest>,
    receiver: Mutex<Option<mpsc::Receiver<UpdateRequest>>>,
    events: EventBus,
    settings: BlockFilterSettings,
}

impl BlockFilterEngine {
    pub fn new(
        domains: Arc<dyn DomainRepository>,
        lists: Arc<dyn BlockListRepository>,
        fetcher: Arc<dyn ListFetcher>,
        events: EventBus,
        settings: BlockFilterSettings,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(settings.queue_capacity.max(1));
        Self {
            domains,
            lists,
            fetcher,
            label_cache: LabelCache::new(),
            counters: Mutex::new(BlockCountersSnapshot::default()),
            downloads: DashMap::with_hasher(FxBuildHasher),
            url_locks: DashMap::with_hasher(FxBuildHasher),
            sender,
            receiver: Mutex::new(Some(receiver)),
            events,
            settings,
        }
    }

    /// Spawns the ingestion consumer. Returns `None` if it was already started.
    pub fn start(self: Arc<Self>, cancel: CancellationToken) -> Option<JoinHandle<()>> {
        let mut receiver = self
            .receiver
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()?;

        info!("Starting block list consumer");

        Some(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("Block list consumer: shutting down");
                        break;
                    }
                    next = receiver.recv() => match next {
                        Some(request) => self.process_request(request).await,
                        None => {
                            info!("Block list queue closed");
                            break;
                        }
                    }
                }
            }
        }))
    }

    pub async fn process_request(&self, request: UpdateRequest) {
        info!(lists = request.urls.len(), "Processing block list update");

        let allowed: HashSet<Arc<str>> = match self.domains.names_in_list(DomainList::Allowed).await
        {
            Ok(names) => names.into_iter().collect(),
            Err(e) => {
                error!(error = %e, "Failed to load allow list, relying on store guard");
                HashSet::new()
            }
        };

        if let Err(e) = tokio::fs::create_dir_all(&self.settings.lists_dir).await {
            error!(
                dir = %self.settings.lists_dir.display(),
                error = %e,
                "Cannot create block list directory"
            );
            return;
        }

        let results = join_all(
            request
                .urls
                .iter()
                .map(|url| self.process_list(url, request.redirect, &allowed)),
        )
        .await;

        for (url, result) in request.urls.iter().zip(results) {
            match result {
                Ok(ListOutcome::Updated { entries }) => {
                    info!(url = %url, entries, "Block list updated");
                }
                Ok(ListOutcome::Disabled) => debug!(url = %url, "Block list disabled, skipped"),
                Ok(ListOutcome::Fresh) => {
                    debug!(url = %url, "Block list updated recently, skipped")
                }
                Err(e) => warn!(url = %url, error = %e, "Block list update failed"),
            }
        }

        self.label_cache.clear();

        match self.refresh_counters().await {
            Ok(snapshot) => self.events.publish(EngineEvent::BlockListCountChanged {
                blocked: snapshot.blocked_domains,
                allowed: snapshot.allowed_domains,
            }),
            Err(e) => error!(error = %e, "Failed to refresh block counters"),
        }
    }

    /// Refreshes one list. Serialized per URL; the staleness check runs
    /// under the same lock so a concurrent request cannot download twice.
    pub async fn process_list(
        &self,
        url: &Arc<str>,
        redirect: IpAddr,
        allowed: &HashSet<Arc<str>>,
    ) -> Result<ListOutcome, DomainError> {
        let lock = self
            .url_locks
            .entry(url.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        let mut list = self
            .lists
            .get_by_url(url)
            .await?
            .unwrap_or_else(|| BlockList::new(url.clone()));

        if !list.enabled {
            return Ok(ListOutcome::Disabled);
        }

        let now = chrono::Utc::now().timestamp();
        if list.updated_within(STALENESS_WINDOW_SECS, now) {
            return Ok(ListOutcome::Fresh);
        }

        let snapshot = self.settings.lists_dir.join(list.snapshot_file_name());
        let partial = snapshot.with_extension("txt.part");

        if let Err(e) = self.fetcher.download(url, &partial).await {
            if let Err(rm) = tokio::fs::remove_file(&partial).await {
                debug!(path = %partial.display(), error = %rm, "No partial download to remove");
            }
            return Err(e);
        }

        tokio::fs::rename(&partial, &snapshot)
            .await
            .map_err(|e| DomainError::IoError(format!("{}: {}", snapshot.display(), e)))?;

        self.downloads.insert(
            url.clone(),
            DownloadProgress {
                url: url.clone(),
                lines_parsed: 0,
                finished: false,
            },
        );
        let parsed = self.parse_snapshot(url, &snapshot, allowed).await;
        if let Some(mut progress) = self.downloads.get_mut(url) {
            progress.finished = true;
        }
        let names: Vec<Arc<str>> = parsed?.into_iter().collect();

        self.domains
            .bulk_upsert_blocked(&names, redirect, url)
            .await?;

        list.entry_count = names.len() as u64;
        list.last_updated = Some(now);
        self.lists.upsert(&list).await?;

        Ok(ListOutcome::Updated {
            entries: names.len(),
        })
    }

    async fn parse_snapshot(
        &self,
        url: &Arc<str>,
        path: &Path,
        allowed: &HashSet<Arc<str>>,
    ) -> Result<HashSet<Arc<str>>, DomainError> {
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|e| DomainError::IoError(format!("{}: {}", path.display(), e)))?;
        let mut lines = BufReader::new(file).split(b'\n');

        let mut names: HashSet<Arc<str>> = HashSet::new();
        let mut line_count = 0u64;

        while let Some(raw) = lines
            .next_segment()
            .await
            .map_err(|e| DomainError::IoError(format!("{}: {}", path.display(), e)))?
        {
            line_count += 1;
            let line = String::from_utf8_lossy(&raw);
            if let Some(name) = parse_list_line(&line) {
                if !allowed.contains(name.as_str()) {
                    names.insert(Arc::from(name));
                }
            }

            if line_count % PROGRESS_EVERY_LINES == 0 {
                if let Some(mut progress) = self.downloads.get_mut(url) {
                    progress.lines_parsed = line_count;
                }
                if self.settings.show_console_progress {
                    info!(url = %url, lines = line_count, unique = names.len(), "Parsing block list");
                }
            }
        }

        if let Some(mut progress) = self.downloads.get_mut(url) {
            progress.lines_parsed = line_count;
        }

        Ok(names)
    }

    /// First row for `name`; any further rows are deleted.
    async fn lookup_unique(&self, name: &str) -> Result<Option<DomainEntry>, DomainError> {
        let mut rows = self.domains.lookup(name).await?;
        if rows.len() > 1 {
            let mut removed = 0usize;
            for duplicate in rows.drain(1..) {
                let Some(id) = duplicate.id else { continue };
                match self.domains.delete_by_id(id).await {
                    Ok(()) => removed += 1,
                    Err(e) => warn!(name = %name, id, error = %e, "Failed to delete duplicate domain row"),
                }
            }
            info!(name = %name, removed, "Removed duplicate domain rows");
        }
        Ok(rows.into_iter().next())
    }

    fn counters_guard(&self) -> std::sync::MutexGuard<'_, BlockCountersSnapshot> {
        self.counters.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl BlockFilterEnginePort for BlockFilterEngine {
    async fn is_blocked(&self, hostname: &str) -> Result<bool, DomainError> {
        let name = normalize_hostname(hostname);
        if name.is_empty() {
            return Ok(false);
        }

        let mut suffix = name.as_str();
        loop {
            match self.label_cache.get(suffix) {
                Some(Verdict::Blocked) => return Ok(true),
                Some(Verdict::Allowed) => return Ok(false),
                None => {}
            }

            if let Some(entry) = self.lookup_unique(suffix).await? {
                match entry.list {
                    DomainList::Blocked => {
                        self.label_cache.insert(suffix, Verdict::Blocked);
                        return Ok(true);
                    }
                    DomainList::Allowed => {
                        self.label_cache.insert(suffix, Verdict::Allowed);
                        return Ok(false);
                    }
                    DomainList::Unlisted => {}
                }
            }

            match suffix.find('.') {
                Some(pos) => suffix = &suffix[pos + 1..],
                None => return Ok(false),
            }
        }
    }

    async fn enqueue(&self, request: UpdateRequest) -> Result<(), DomainError> {
        self.sender
            .send(request)
            .await
            .map_err(|_| DomainError::QueueClosed)
    }

    fn record_blocked_request(&self) {
        self.counters_guard().blocked_requests += 1;
    }

    fn counters(&self) -> BlockCountersSnapshot {
        *self.counters_guard()
    }

    async fn refresh_counters(&self) -> Result<BlockCountersSnapshot, DomainError> {
        let blocked = self.domains.count_by_list(DomainList::Blocked).await?;
        let allowed = self.domains.count_by_list(DomainList::Allowed).await?;

        let mut counters = self.counters_guard();
        counters.blocked_domains = blocked;
        counters.allowed_domains = allowed;
        Ok(*counters)
    }

    fn invalidate(&self, hostname: &str) {
        self.label_cache.remove(&normalize_hostname(hostname));
    }

    fn clear_cache(&self) {
        self.label_cache.clear();
    }

    fn running_downloads(&self) -> Vec<DownloadProgress> {
        self.downloads
            .iter()
            .filter(|entry| !entry.finished)
            .map(|entry| entry.value().clone())
            .collect()
    }
}
