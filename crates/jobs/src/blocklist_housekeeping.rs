use sinkhole_dns_application::ports::{AnswerCache, BlockFilterEnginePort};
use sinkhole_dns_application::services::{EngineEvent, EventBus, UpdateSignals};
use sinkhole_dns_application::use_cases::RefreshBlockListsUseCase;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

const DEFAULT_TICK_SECS: u64 = 5;
const DEFAULT_STATS_INTERVAL_SECS: u64 = 60;

/// What one housekeeping tick did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickOutcome {
    pub lists_queued: usize,
    pub setup_reloaded: bool,
    pub stats_refreshed: bool,
    pub cache_entries_expired: usize,
}

/// Periodic tick that turns raised signals into work: queued list refreshes,
/// cache resets after setup changes, counter reloads and answer cache expiry.
pub struct BlocklistHousekeepingJob {
    engine: Arc<dyn BlockFilterEnginePort>,
    signals: Arc<UpdateSignals>,
    refresh: Arc<RefreshBlockListsUseCase>,
    answer_cache: Arc<dyn AnswerCache>,
    events: EventBus,
    tick_secs: u64,
    stats_interval: Duration,
    last_stats: std::sync::Mutex<Option<Instant>>,
    shutdown: CancellationToken,
}

impl BlocklistHousekeepingJob {
    pub fn new(
        engine: Arc<dyn BlockFilterEnginePort>,
        signals: Arc<UpdateSignals>,
        refresh: Arc<RefreshBlockListsUseCase>,
        answer_cache: Arc<dyn AnswerCache>,
        events: EventBus,
    ) -> Self {
        Self {
            engine,
            signals,
            refresh,
            answer_cache,
            events,
            tick_secs: DEFAULT_TICK_SECS,
            stats_interval: Duration::from_secs(DEFAULT_STATS_INTERVAL_SECS),
            last_stats: std::sync::Mutex::new(None),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_tick(mut self, tick_secs: u64) -> Self {
        self.tick_secs = tick_secs.max(1);
        self
    }

    pub fn with_stats_interval(mut self, secs: u64) -> Self {
        self.stats_interval = Duration::from_secs(secs);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub async fn start(self: Arc<Self>) {
        info!(tick_secs = self.tick_secs, "Starting block list housekeeping job");

        let mut interval = tokio::time::interval(Duration::from_secs(self.tick_secs));
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("BlocklistHousekeepingJob: shutting down");
                    break;
                }
                _ = interval.tick() => {
                    self.run_tick().await;
                }
            }
        }
    }

    pub async fn run_tick(&self) -> TickOutcome {
        let mut outcome = TickOutcome::default();

        if self.signals.take_update_request() {
            match self.refresh.execute().await {
                Ok(queued) => {
                    info!(lists = queued, "Scheduled block list update queued");
                    outcome.lists_queued = queued;
                }
                Err(e) => error!(error = %e, "Failed to queue block list update"),
            }
        }

        if self.signals.take_setup_changed() {
            self.engine.clear_cache();
            outcome.setup_reloaded = true;
            self.events.publish(EngineEvent::SetupChanged);
            outcome.stats_refreshed = self.refresh_stats().await;
        } else if self.stats_due() {
            outcome.stats_refreshed = self.refresh_stats().await;
        }

        outcome.cache_entries_expired = self.answer_cache.remove_expired();
        if outcome.cache_entries_expired > 0 {
            debug!(
                expired = outcome.cache_entries_expired,
                remaining = self.answer_cache.len(),
                "Answer cache entries expired"
            );
        }

        outcome
    }

    fn stats_due(&self) -> bool {
        let last = *self.last_stats.lock().unwrap_or_else(|e| e.into_inner());
        last.map_or(true, |at| at.elapsed() >= self.stats_interval)
    }

    async fn refresh_stats(&self) -> bool {
        *self.last_stats.lock().unwrap_or_else(|e| e.into_inner()) = Some(Instant::now());

        match self.engine.refresh_counters().await {
            Ok(counters) => {
                self.events.publish(EngineEvent::BlockListCountChanged {
                    blocked: counters.blocked_domains,
                    allowed: counters.allowed_domains,
                });
                true
            }
            Err(e) => {
                error!(error = %e, "Failed to refresh block counters");
                false
            }
        }
    }
}
