use crate::ports::{BlockFilterEnginePort, DomainRepository};
use crate::services::UpdateSignals;
use sinkhole_dns_domain::{DomainEntry, DomainError, DomainList};
use std::sync::Arc;
use tracing::info;

/// Hosts kept resolvable on a fresh install: time sync and OS updates.
pub const DEFAULT_ALLOWED: &[&str] = &["time.windows.com", "windowsupdate.com"];

pub struct EnsureDefaultAllowlistUseCase {
    domains: Arc<dyn DomainRepository>,
    engine: Arc<dyn BlockFilterEnginePort>,
    signals: Arc<UpdateSignals>,
}

impl EnsureDefaultAllowlistUseCase {
    pub fn new(
        domains: Arc<dyn DomainRepository>,
        engine: Arc<dyn BlockFilterEnginePort>,
        signals: Arc<UpdateSignals>,
    ) -> Self {
        Self {
            domains,
            engine,
            signals,
        }
    }

    /// Seeds the defaults when the allow list is empty. Returns how many were added.
    ///
    /// Each seeded name moves to the allow list, so its cached decision is
    /// dropped and the housekeeping tick is told to reload counters.
    pub async fn execute(&self) -> Result<u64, DomainError> {
        if self.domains.count_by_list(DomainList::Allowed).await? > 0 {
            return Ok(0);
        }
        for name in DEFAULT_ALLOWED {
            self.domains
                .upsert(&DomainEntry::new(*name, DomainList::Allowed))
                .await?;
            self.engine.invalidate(name);
        }
        self.signals.notify_setup_changed();
        info!(count = DEFAULT_ALLOWED.len(), "Default allow list seeded");
        Ok(DEFAULT_ALLOWED.len() as u64)
    }
}
