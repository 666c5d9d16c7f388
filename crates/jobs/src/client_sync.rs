use sinkhole_dns_application::use_cases::SyncClientRecordsUseCase;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

const DEFAULT_INTERVAL_SECS: u64 = 600;

/// Re-publishes known client hostnames into the zone catalog.
pub struct ClientSyncJob {
    sync_records: Arc<SyncClientRecordsUseCase>,
    interval_secs: u64,
    shutdown: CancellationToken,
}

impl ClientSyncJob {
    pub fn new(sync_records: Arc<SyncClientRecordsUseCase>) -> Self {
        Self {
            sync_records,
            interval_secs: DEFAULT_INTERVAL_SECS,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_interval(mut self, interval_secs: u64) -> Self {
        self.interval_secs = interval_secs.max(1);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub async fn start(self: Arc<Self>) {
        info!(interval_secs = self.interval_secs, "Starting client sync job");

        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs));
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("ClientSyncJob: shutting down");
                    break;
                }
                _ = interval.tick() => {
                    match self.sync_records.execute().await {
                        Ok(added) => debug!(added, "Client records synced"),
                        Err(e) => error!(error = %e, "Client record sync failed"),
                    }
                }
            }
        }
    }
}
