use super::{DnsServices, Repositories};
use sinkhole_dns_application::ports::BlockFilterEnginePort;
use sinkhole_dns_application::use_cases::{
    EnsureDefaultAllowlistUseCase, RefreshBlockListsUseCase, SeedDefaultListsUseCase,
    SyncClientRecordsUseCase,
};
use sinkhole_dns_domain::Config;
use std::sync::Arc;

pub struct UseCases {
    pub ensure_allowlist: Arc<EnsureDefaultAllowlistUseCase>,
    pub seed_lists: Arc<SeedDefaultListsUseCase>,
    pub refresh_lists: Arc<RefreshBlockListsUseCase>,
    pub sync_clients: Arc<SyncClientRecordsUseCase>,
}

impl UseCases {
    pub fn new(config: &Config, repos: &Repositories, dns: &DnsServices) -> Self {
        Self {
            ensure_allowlist: Arc::new(EnsureDefaultAllowlistUseCase::new(
                repos.domains.clone(),
                dns.engine.clone() as Arc<dyn BlockFilterEnginePort>,
                dns.signals.clone(),
            )),
            seed_lists: Arc::new(SeedDefaultListsUseCase::new(repos.block_lists.clone())),
            refresh_lists: Arc::new(RefreshBlockListsUseCase::new(
                repos.block_lists.clone(),
                dns.engine.clone() as Arc<dyn BlockFilterEnginePort>,
                dns.events.clone(),
                config.blocking.redirect_address,
            )),
            sync_clients: Arc::new(SyncClientRecordsUseCase::new(
                repos.clients.clone(),
                dns.catalog.clone(),
                config.dns.local_domain.clone(),
            )),
        }
    }
}
