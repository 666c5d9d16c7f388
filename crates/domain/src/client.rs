use std::net::IpAddr;
use std::sync::Arc;

/// A network client seen sending queries.
#[derive(Debug, Clone)]
pub struct Client {
    pub id: Option<i64>,
    pub ip_address: IpAddr,
    pub hostname: Option<Arc<str>>,
    /// Queries from blocked clients are answered with an echo and never resolved.
    pub blocked: bool,
    pub first_seen: Option<String>,
    pub last_seen: Option<String>,
    pub query_count: u64,
}

impl Client {
    pub fn new(ip_address: IpAddr) -> Self {
        Self {
            id: None,
            ip_address,
            hostname: None,
            blocked: false,
            first_seen: None,
            last_seen: None,
            query_count: 0,
        }
    }

    pub fn with_hostname(mut self, hostname: impl Into<Arc<str>>) -> Self {
        self.hostname = Some(hostname.into());
        self
    }

    /// Hostname trimmed of whitespace and a trailing dot, if non-empty.
    pub fn usable_hostname(&self) -> Option<&str> {
        self.hostname
            .as_deref()
            .map(|h| h.trim().trim_end_matches('.'))
            .filter(|h| !h.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usable_hostname() {
        let ip: IpAddr = "10.0.0.2".parse().unwrap();
        assert_eq!(Client::new(ip).usable_hostname(), None);
        assert_eq!(Client::new(ip).with_hostname("  ").usable_hostname(), None);
        assert_eq!(
            Client::new(ip).with_hostname("nas.lan.").usable_hostname(),
            Some("nas.lan")
        );
    }
}
