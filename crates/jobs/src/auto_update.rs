use chrono::{Local, NaiveDateTime, NaiveTime, TimeDelta};
use sinkhole_dns_application::services::UpdateSignals;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Raises the update flag once a day at a fixed local time (04:00 unless
/// configured otherwise). The housekeeping tick does the actual work.
pub struct AutoUpdateJob {
    signals: Arc<UpdateSignals>,
    at: NaiveTime,
    shutdown: CancellationToken,
}

impl AutoUpdateJob {
    pub fn new(signals: Arc<UpdateSignals>) -> Self {
        Self {
            signals,
            at: NaiveTime::from_hms_opt(4, 0, 0).unwrap_or_default(),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_time(mut self, at: NaiveTime) -> Self {
        self.at = at;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub async fn start(self: Arc<Self>) {
        let first = delay_until(Local::now().naive_local(), self.at);
        info!(
            at = %self.at,
            first_in_secs = first.as_secs(),
            "Starting daily block list auto-update"
        );

        let start = tokio::time::Instant::now() + first;
        let mut interval = tokio::time::interval_at(start, DAY);
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("AutoUpdateJob: shutting down");
                    break;
                }
                _ = interval.tick() => {
                    info!("Daily block list update requested");
                    self.signals.request_update();
                }
            }
        }
    }
}

/// Time from `now` until the next occurrence of `at`; a full day when `now`
/// is exactly `at`.
pub fn delay_until(now: NaiveDateTime, at: NaiveTime) -> Duration {
    let mut next = now.date().and_time(at);
    if next <= now {
        next += TimeDelta::days(1);
    }
    (next - now).to_std().unwrap_or(DAY)
}
