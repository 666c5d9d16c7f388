use super::Repositories;
use sinkhole_dns_application::ports::{
    AnswerCache, BlockFilterEnginePort, ClientRepository, ConnectivityProbe, DomainRepository,
    QueryLogRepository, UpstreamResolver,
};
use sinkhole_dns_application::services::{EventBus, UpdateSignals, ZoneCatalog};
use sinkhole_dns_application::use_cases::{HandleDnsQueryUseCase, QueryPolicy};
use sinkhole_dns_domain::Config;
use sinkhole_dns_infrastructure::dns::{
    BlockFilterEngine, BlockFilterSettings, HttpListFetcher, MemoryAnswerCache,
    TcpConnectivityProbe, UpstreamForwarder,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub struct DnsServices {
    pub catalog: Arc<ZoneCatalog>,
    pub events: EventBus,
    pub signals: Arc<UpdateSignals>,
    pub engine: Arc<BlockFilterEngine>,
    pub answer_cache: Arc<MemoryAnswerCache>,
    pub handler_use_case: Arc<HandleDnsQueryUseCase>,
}

impl DnsServices {
    pub fn new(config: &Config, repos: &Repositories) -> anyhow::Result<Self> {
        info!("Initializing DNS services");

        let catalog = Self::build_catalog(config)?;
        let events = EventBus::new();
        let signals = Arc::new(UpdateSignals::new());
        let engine = Self::build_engine(config, repos, events.clone())?;
        let answer_cache = Arc::new(MemoryAnswerCache::new());

        let upstream: Arc<dyn UpstreamResolver> =
            Arc::new(UpstreamForwarder::from_config(&config.dns)?);
        let probe_addr = config.dns.probe_addr().map_err(anyhow::Error::msg)?;
        let probe: Arc<dyn ConnectivityProbe> = Arc::new(TcpConnectivityProbe::new(
            probe_addr,
            Duration::from_millis(config.dns.query_timeout_ms),
        ));

        let handler_use_case = Arc::new(HandleDnsQueryUseCase::new(
            catalog.clone(),
            engine.clone() as Arc<dyn BlockFilterEnginePort>,
            repos.clients.clone() as Arc<dyn ClientRepository>,
            repos.domains.clone() as Arc<dyn DomainRepository>,
            repos.query_log.clone() as Arc<dyn QueryLogRepository>,
            upstream,
            probe,
            answer_cache.clone() as Arc<dyn AnswerCache>,
            QueryPolicy::from_config(config),
        ));

        info!(
            zone_entries = catalog.len(),
            doh = config.dns.doh_enabled,
            forwarders = config.dns.forwarders.len(),
            "DNS services ready"
        );

        Ok(Self {
            catalog,
            events,
            signals,
            engine,
            answer_cache,
            handler_use_case,
        })
    }

    fn build_catalog(config: &Config) -> anyhow::Result<Arc<ZoneCatalog>> {
        let catalog = ZoneCatalog::new()
            .with_root_ns()?
            .with_local_records(&config.dns.local_records, &config.dns.local_domain)?
            .with_reverse_lookup_records()?;
        Ok(Arc::new(catalog))
    }

    fn build_engine(
        config: &Config,
        repos: &Repositories,
        events: EventBus,
    ) -> anyhow::Result<Arc<BlockFilterEngine>> {
        let fetcher = HttpListFetcher::new(Duration::from_secs(
            config.blocking.download_timeout_secs,
        ))?;
        Ok(Arc::new(BlockFilterEngine::new(
            repos.domains.clone(),
            repos.block_lists.clone(),
            Arc::new(fetcher),
            events,
            BlockFilterSettings::from_config(&config.blocking),
        )))
    }
}
