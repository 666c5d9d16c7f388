use crate::{AutoUpdateJob, BlocklistHousekeepingJob, ClientSyncJob};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub trait SpawnableJob: Send + Sync + 'static {
    fn with_cancellation(self, token: CancellationToken) -> Self;
    fn start_job(self: Arc<Self>) -> JoinHandle<()>;
}

macro_rules! impl_spawnable_job {
    ($t:ty) => {
        impl SpawnableJob for $t {
            fn with_cancellation(self, token: CancellationToken) -> Self {
                self.with_cancellation(token)
            }

            fn start_job(self: Arc<Self>) -> JoinHandle<()> {
                tokio::spawn(async move { self.start().await })
            }
        }
    };
}

impl_spawnable_job!(BlocklistHousekeepingJob);
impl_spawnable_job!(AutoUpdateJob);
impl_spawnable_job!(ClientSyncJob);

fn spawn_job<J: SpawnableJob>(
    job: Option<J>,
    shutdown: &Option<CancellationToken>,
    handles: &mut Vec<JoinHandle<()>>,
) {
    if let Some(job) = job {
        let job = match shutdown {
            Some(token) => job.with_cancellation(token.clone()),
            None => job,
        };
        handles.push(Arc::new(job).start_job());
    }
}

pub struct JobRunner {
    housekeeping: Option<BlocklistHousekeepingJob>,
    auto_update: Option<AutoUpdateJob>,
    client_sync: Option<ClientSyncJob>,
    shutdown: Option<CancellationToken>,
}

impl JobRunner {
    pub fn new() -> Self {
        Self {
            housekeeping: None,
            auto_update: None,
            client_sync: None,
            shutdown: None,
        }
    }

    pub fn with_housekeeping(mut self, job: BlocklistHousekeepingJob) -> Self {
        self.housekeeping = Some(job);
        self
    }

    pub fn with_auto_update(mut self, job: AutoUpdateJob) -> Self {
        self.auto_update = Some(job);
        self
    }

    pub fn with_client_sync(mut self, job: ClientSyncJob) -> Self {
        self.client_sync = Some(job);
        self
    }

    pub fn with_shutdown_token(mut self, token: CancellationToken) -> Self {
        self.shutdown = Some(token);
        self
    }

    /// Spawns every configured job and returns their handles.
    pub fn start(self) -> Vec<JoinHandle<()>> {
        info!("Starting background job runner");

        let mut handles = Vec::new();
        spawn_job(self.housekeeping, &self.shutdown, &mut handles);
        spawn_job(self.auto_update, &self.shutdown, &mut handles);
        spawn_job(self.client_sync, &self.shutdown, &mut handles);

        info!(jobs = handles.len(), "Background jobs started");
        handles
    }
}

impl Default for JobRunner {
    fn default() -> Self {
        Self::new()
    }
}
