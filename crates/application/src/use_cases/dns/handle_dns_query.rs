use crate::ports::{
    AnswerCache, BlockFilterEnginePort, ClientRepository, ConnectivityProbe, DomainRepository,
    QueryLogRepository, ResponseChannel, Transport, UpstreamResolver,
};
use crate::services::ZoneCatalog;
use sinkhole_dns_domain::{
    normalize_hostname, Config, DomainEntry, DomainError, DomainList, DomainName, Message,
    QueryLog, Question, RData, RecordType, ResolveType, ResourceRecord, ResponseCode,
};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Resolution switches taken from configuration once at startup.
#[derive(Debug, Clone)]
pub struct QueryPolicy {
    pub watch_mode: bool,
    pub suppress_wpad: bool,
    pub suppress_arpa: bool,
    pub log_blocked_clients: bool,
    pub cache_disabled: bool,
    pub dont_cache: Vec<DomainName>,
    pub router_domain: Option<DomainName>,
    pub partial_lookup_name: bool,
    pub continue_on_doh_failure: bool,
    pub redirect: IpAddr,
    pub max_udp_payload: u16,
    pub log_queries: bool,
}

impl QueryPolicy {
    pub fn from_config(config: &Config) -> Self {
        let dont_cache = config
            .dns
            .dont_cache
            .iter()
            .filter_map(|name| match name.parse::<DomainName>() {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    warn!(name = %name, error = %e, "Ignoring invalid dont_cache entry");
                    None
                }
            })
            .collect();
        let router_domain = config
            .dns
            .router_domain
            .as_deref()
            .and_then(|name| name.parse::<DomainName>().ok())
            .filter(|name| !name.is_root());

        Self {
            watch_mode: config.dns.watch_mode,
            suppress_wpad: config.dns.suppress_wpad,
            suppress_arpa: config.dns.suppress_arpa,
            log_blocked_clients: config.dns.log_blocked_clients,
            cache_disabled: config.dns.cache_disabled,
            dont_cache,
            router_domain,
            partial_lookup_name: config.dns.partial_lookup_name,
            continue_on_doh_failure: config.dns.continue_on_doh_failure,
            redirect: config.blocking.redirect_address,
            max_udp_payload: config.server.max_udp_payload,
            log_queries: config.database.log_queries,
        }
    }

    fn is_cacheable(&self, question: &Question, response: &Message) -> bool {
        !self.cache_disabled
            && response.rcode() == ResponseCode::NoError
            && !response.answers.is_empty()
            && !self
                .dont_cache
                .iter()
                .any(|name| question.name.is_equal_or_subdomain_of(name))
    }
}

impl Default for QueryPolicy {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    Malformed,
    Corrupted,
    NoQuestion,
    Suppressed,
}

/// What happened to one inbound packet.
#[derive(Debug)]
pub enum QueryOutcome {
    /// A response was built and handed to the transport.
    Responded(Box<Message>),
    /// Nothing was sent and nothing was logged.
    Dropped(DropReason),
    /// No resolver produced an answer; the client is left to time out.
    Unanswered,
    /// Resolution failed hard, as configured for DoH failures.
    Failed(DomainError),
}

pub struct HandleDnsQueryUseCase {
    catalog: Arc<ZoneCatalog>,
    block_filter: Arc<dyn BlockFilterEnginePort>,
    clients: Arc<dyn ClientRepository>,
    domains: Arc<dyn DomainRepository>,
    query_log: Arc<dyn QueryLogRepository>,
    upstream: Arc<dyn UpstreamResolver>,
    probe: Arc<dyn ConnectivityProbe>,
    cache: Arc<dyn AnswerCache>,
    policy: QueryPolicy,
}

impl HandleDnsQueryUseCase {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        catalog: Arc<ZoneCatalog>,
        block_filter: Arc<dyn BlockFilterEnginePort>,
        clients: Arc<dyn ClientRepository>,
        domains: Arc<dyn DomainRepository>,
        query_log: Arc<dyn QueryLogRepository>,
        upstream: Arc<dyn UpstreamResolver>,
        probe: Arc<dyn ConnectivityProbe>,
        cache: Arc<dyn AnswerCache>,
        policy: QueryPolicy,
    ) -> Self {
        Self {
            catalog,
            block_filter,
            clients,
            domains,
            query_log,
            upstream,
            probe,
            cache,
            policy,
        }
    }

    pub async fn execute(&self, raw: &[u8], channel: &dyn ResponseChannel) -> QueryOutcome {
        let start = Instant::now();
        let peer = channel.peer();

        let request = match Message::decode(raw) {
            Ok(request) => request,
            Err(e) => {
                warn!(
                    peer = %peer,
                    transport = %channel.transport(),
                    bytes = raw.len(),
                    error = %e,
                    "Dropping malformed packet"
                );
                return QueryOutcome::Dropped(DropReason::Malformed);
            }
        };
        if request.has_packet_error {
            warn!(peer = %peer, header = %request.header, "Dropping corrupted packet");
            return QueryOutcome::Dropped(DropReason::Corrupted);
        }
        let Some(question) = request.first_question().cloned() else {
            debug!(peer = %peer, id = request.header.id, "Dropping packet without a question");
            return QueryOutcome::Dropped(DropReason::NoQuestion);
        };
        if self.is_suppressed(&question) {
            debug!(peer = %peer, question = %question, "Query suppressed");
            return QueryOutcome::Dropped(DropReason::Suppressed);
        }

        let client_ip = peer.ip().to_canonical();
        match self.clients.get_or_create(client_ip).await {
            Ok(client) if client.blocked => {
                if self.policy.log_blocked_clients {
                    info!(client = %client_ip, domain = %question.name, "Query from blocked client");
                }
                let mut echo = request.clone();
                echo.header.is_response = true;
                echo.resolve_type = ResolveType::ClientBlocked;
                return self.finish(&request, echo, channel, start).await;
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, client = %client_ip, "Client lookup failed"),
        }

        if let Some(blocked) = self.check_blocked(&request).await {
            return self.finish(&request, blocked, channel, start).await;
        }

        if question.qtype == RecordType::PTR {
            if let Some(response) = self.arpa_lookup(&request, &question) {
                return self.finish(&request, response, channel, start).await;
            }
        }

        if let Some(records) = self.catalog.lookup(&question) {
            let mut response = request.create_response();
            response.header.authoritative = true;
            response.answers = records;
            response.resolve_type = ResolveType::Authoritative;
            return self.finish(&request, response, channel, start).await;
        }

        if !self.policy.cache_disabled {
            if let Some(mut cached) = self.cache.get(&question) {
                // Keys match case-insensitively; echo this querier's spelling.
                cached.header.id = request.header.id;
                cached.questions = request.questions.clone();
                cached.is_from_cache = true;
                cached.resolve_type = ResolveType::Cache;
                return self.finish(&request, cached, channel, start).await;
            }
        }

        match self.forward(&request).await {
            Ok(Some(mut response)) => {
                response.header.id = request.header.id;
                if self.policy.is_cacheable(&question, &response) {
                    self.cache.insert(&question, &response);
                }
                self.finish(&request, response, channel, start).await
            }
            Ok(None) => {
                info!(
                    client = %client_ip,
                    question = %question,
                    "No upstream answer"
                );
                let mut failed = request.create_response();
                failed.set_rcode(ResponseCode::ServFail);
                failed.resolve_type = ResolveType::Failed;
                self.record(&request, &failed, peer, start).await;
                QueryOutcome::Unanswered
            }
            Err(e) => {
                warn!(error = %e, question = %question, "Upstream resolution failed");
                let mut failed = request.create_response();
                failed.set_rcode(ResponseCode::ServFail);
                failed.resolve_type = ResolveType::Failed;
                self.record(&request, &failed, peer, start).await;
                QueryOutcome::Failed(e)
            }
        }
    }

    fn is_suppressed(&self, question: &Question) -> bool {
        (self.policy.suppress_wpad && question.name.starts_with_label("wpad"))
            || (self.policy.suppress_arpa && question.name.is_in_addr_arpa())
    }

    /// Builds the redirect response when any question names a blocked host.
    async fn check_blocked(&self, request: &Message) -> Option<Message> {
        let mut response = request.create_response();
        for question in &request.questions {
            let host = normalize_hostname(&question.name.to_string());
            match self.block_filter.is_blocked(&host).await {
                Ok(true) if self.policy.watch_mode => {
                    info!(domain = %host, "Blocked name resolved in watch mode");
                }
                Ok(true) => {
                    self.block_filter.record_blocked_request();
                    response.is_blocked = true;
                    if let Some(answer) = self.redirect_answer(question) {
                        response.answers.push(answer);
                    }
                }
                Ok(false) => {}
                Err(e) => warn!(error = %e, domain = %host, "Block check failed"),
            }
        }
        if !response.is_blocked {
            return None;
        }
        response.resolve_type = ResolveType::Blocked;
        Some(response)
    }

    fn redirect_answer(&self, question: &Question) -> Option<ResourceRecord> {
        let data = match (question.qtype, self.policy.redirect) {
            (RecordType::A, IpAddr::V4(ip)) => RData::A(ip),
            (RecordType::A, IpAddr::V6(_)) => RData::A(Ipv4Addr::UNSPECIFIED),
            (RecordType::AAAA, IpAddr::V6(ip)) => RData::AAAA(ip),
            (RecordType::AAAA, IpAddr::V4(_)) => RData::AAAA(Ipv6Addr::UNSPECIFIED),
            _ => return None,
        };
        Some(ResourceRecord::new(
            question.name.clone(),
            question.qtype,
            0,
            data,
        ))
    }

    fn arpa_lookup(&self, request: &Message, question: &Question) -> Option<Message> {
        let mut name = question.name.clone();
        if let Some(router) = &self.policy.router_domain {
            if name.is_subdomain_of(router) {
                let keep = name.label_count() - router.label_count();
                name = DomainName::from_labels(name.labels()[..keep].iter()).ok()?;
            }
        }
        if !name.is_reverse_zone() {
            return None;
        }

        let ptr = self.catalog.find_ptr(&name, self.policy.partial_lookup_name)?;
        let target = ptr.data.target()?.clone();
        let mut response = request.create_response();
        response.header.authoritative = true;
        if let Some(ip) = ptr.name.to_ip_from_arpa() {
            let (rtype, data) = RData::from_ip(ip);
            response
                .answers
                .push(ResourceRecord::new(target, rtype, ptr.ttl, data));
        }
        response.answers.insert(0, ptr);
        response.resolve_type = ResolveType::Arpa;
        Some(response)
    }

    async fn forward(&self, request: &Message) -> Result<Option<Message>, DomainError> {
        if self.upstream.doh_enabled() {
            if !self.probe.is_reachable().await {
                debug!("Upstream unreachable, skipping DoH");
                return Ok(None);
            }
            match self.upstream.forward_doh(request).await {
                Ok(Some(mut response)) => {
                    response.resolve_type = ResolveType::DoH;
                    return Ok(Some(response));
                }
                Ok(None) => {}
                Err(e) if self.policy.continue_on_doh_failure => {
                    warn!(error = %e, "DoH failed, falling back to classic forwarders");
                }
                Err(e) => return Err(e),
            }
        }

        if !self.probe.is_reachable().await {
            debug!("Upstream unreachable, skipping classic forwarders");
            return Ok(None);
        }
        match self.upstream.forward_classic(request).await {
            Ok(response) => Ok(response.map(|mut response| {
                response.resolve_type = ResolveType::Classic;
                response
            })),
            Err(e) => {
                warn!(error = %e, "Classic forwarding failed");
                Ok(None)
            }
        }
    }

    async fn finish(
        &self,
        request: &Message,
        mut response: Message,
        channel: &dyn ResponseChannel,
        start: Instant,
    ) -> QueryOutcome {
        let peer = channel.peer();
        if channel.transport() == Transport::Udp {
            let limit = request.max_udp_payload(self.policy.max_udp_payload);
            if let Err(e) = response.truncate(limit) {
                warn!(error = %e, "Failed to truncate response");
            }
        }

        match response.encode() {
            Ok(bytes) => {
                if let Err(e) = channel.send(&bytes).await {
                    warn!(
                        transport = %transport_label(channel.transport(), peer),
                        peer = %peer,
                        error = %e,
                        "Failed to send response"
                    );
                }
            }
            Err(e) => warn!(error = %e, id = response.header.id, "Failed to encode response"),
        }

        self.record(request, &response, peer, start).await;
        QueryOutcome::Responded(Box::new(response))
    }

    /// Outcome log line, query-log row and domain-table entry for the question.
    async fn record(&self, request: &Message, response: &Message, peer: SocketAddr, start: Instant) {
        let Some(question) = request.first_question() else {
            return;
        };
        let elapsed_micros = start.elapsed().as_micros() as u64;
        let client_ip = peer.ip().to_canonical();
        let domain = normalize_hostname(&question.name.to_string());

        info!(
            client = %client_ip,
            domain = %domain,
            record_type = %question.qtype,
            rcode = %response.rcode(),
            answers = response.answers.len(),
            resolve_type = %response.resolve_type,
            cached = response.is_from_cache,
            blocked = response.is_blocked,
            elapsed_micros,
            "Query handled"
        );

        let skip_log =
            response.resolve_type == ResolveType::ClientBlocked && !self.policy.log_blocked_clients;
        if self.policy.log_queries && !skip_log {
            let row = QueryLog {
                id: None,
                timestamp: None,
                client_ip,
                domain: Arc::from(domain.as_str()),
                record_type: question.qtype,
                response_code: response.rcode(),
                blocked: response.is_blocked,
                from_cache: response.is_from_cache,
                resolve_type: response.resolve_type,
                elapsed_micros,
            };
            if let Err(e) = self.query_log.log_query(&row).await {
                warn!(error = %e, domain = %domain, "Failed to log query");
            }
        }

        if !response.is_blocked && !domain.is_empty() {
            let entry = DomainEntry::new(domain.as_str(), DomainList::Unlisted);
            if let Err(e) = self.domains.insert_if_missing(&entry).await {
                debug!(error = %e, domain = %domain, "Failed to record seen domain");
            }
        }
    }
}

fn transport_label(transport: Transport, peer: SocketAddr) -> String {
    let family = if peer.is_ipv4() { "IPv4" } else { "IPv6" };
    format!("{}/{}", transport, family)
}
