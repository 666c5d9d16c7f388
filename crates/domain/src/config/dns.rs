use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};

use super::local_records::LocalDnsRecord;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DnsConfig {
    /// Classic upstream resolvers, `ip` or `ip:port` (`[v6]:port` for IPv6).
    #[serde(default = "default_forwarders")]
    pub forwarders: Vec<String>,

    #[serde(default = "default_true")]
    pub doh_enabled: bool,

    #[serde(default = "default_doh_endpoints")]
    pub doh_endpoints: Vec<String>,

    /// Fall back to classic forwarders when every DoH endpoint fails.
    #[serde(default = "default_true")]
    pub continue_on_doh_failure: bool,

    #[serde(default)]
    pub cache_disabled: bool,

    /// Names whose upstream answers are never cached (subdomains included).
    #[serde(default)]
    pub dont_cache: Vec<String>,

    /// Suffix stripped from reverse lookups before searching local PTR records.
    #[serde(default)]
    pub router_domain: Option<String>,

    #[serde(default = "default_true")]
    pub suppress_wpad: bool,

    #[serde(default)]
    pub suppress_arpa: bool,

    /// Match PTR targets by substring instead of by prefix.
    #[serde(default)]
    pub partial_lookup_name: bool,

    /// Log blocked names but resolve them anyway.
    #[serde(default)]
    pub watch_mode: bool,

    #[serde(default = "default_true")]
    pub log_blocked_clients: bool,

    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,

    /// TCP endpoint probed to decide whether the internet is reachable.
    #[serde(default = "default_connectivity_probe")]
    pub connectivity_probe: String,

    #[serde(default)]
    pub local_domain: Option<String>,

    #[serde(default)]
    pub local_records: Vec<LocalDnsRecord>,
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            forwarders: default_forwarders(),
            doh_enabled: true,
            doh_endpoints: default_doh_endpoints(),
            continue_on_doh_failure: true,
            cache_disabled: false,
            dont_cache: vec![],
            router_domain: None,
            suppress_wpad: true,
            suppress_arpa: false,
            partial_lookup_name: false,
            watch_mode: false,
            log_blocked_clients: true,
            query_timeout_ms: default_query_timeout_ms(),
            connectivity_probe: default_connectivity_probe(),
            local_domain: None,
            local_records: vec![],
        }
    }
}

impl DnsConfig {
    pub fn forwarder_addrs(&self) -> Result<Vec<SocketAddr>, String> {
        self.forwarders.iter().map(|s| parse_forwarder(s)).collect()
    }

    pub fn probe_addr(&self) -> Result<SocketAddr, String> {
        parse_forwarder(&self.connectivity_probe)
    }
}

/// Parses `1.1.1.1`, `1.1.1.1:5353`, `2606:4700::1111` or `[2606:4700::1111]:53`.
pub fn parse_forwarder(s: &str) -> Result<SocketAddr, String> {
    let s = s.trim();
    if let Ok(addr) = s.parse::<SocketAddr>() {
        return Ok(addr);
    }
    s.parse::<IpAddr>()
        .map(|ip| SocketAddr::new(ip, 53))
        .map_err(|_| format!("Invalid forwarder address: {}", s))
}

fn default_forwarders() -> Vec<String> {
    vec!["1.1.1.1:53".to_string(), "8.8.8.8:53".to_string()]
}

fn default_doh_endpoints() -> Vec<String> {
    vec![
        "https://cloudflare-dns.com/dns-query".to_string(),
        "https://dns.google/dns-query".to_string(),
    ]
}

fn default_query_timeout_ms() -> u64 {
    2000
}

fn default_connectivity_probe() -> String {
    "1.1.1.1:53".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_forwarder_forms() {
        assert_eq!(parse_forwarder("9.9.9.9").unwrap().port(), 53);
        assert_eq!(parse_forwarder("9.9.9.9:5353").unwrap().port(), 5353);
        assert!(parse_forwarder("2606:4700::1111").unwrap().is_ipv6());
        assert_eq!(parse_forwarder("[::1]:5300").unwrap().port(), 5300);
        assert!(parse_forwarder("dns.example").is_err());
    }
}
