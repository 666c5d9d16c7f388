use sinkhole_dns_domain::DomainName;
use std::net::{Ipv4Addr, Ipv6Addr};
use tracing::warn;

const ROOT_HINTS: &str = include_str!("root_hints.txt");

pub const ROOT_HINT_TTL: u32 = 3_600_000;

#[derive(Debug, Clone)]
pub struct RootServer {
    pub name: DomainName,
    pub v4: Option<Ipv4Addr>,
    pub v6: Option<Ipv6Addr>,
}

/// The embedded root server list. Lines that fail to parse are skipped.
pub fn root_servers() -> Vec<RootServer> {
    ROOT_HINTS
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with(';'))
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let parsed = fields.next().and_then(|n| n.parse::<DomainName>().ok());
            let Some(name) = parsed else {
                warn!(line, "Skipping malformed root hint");
                return None;
            };
            let v4 = fields.next().and_then(|ip| ip.parse().ok());
            let v6 = fields.next().and_then(|ip| ip.parse().ok());
            Some(RootServer { name, v4, v6 })
        })
        .collect()
}
