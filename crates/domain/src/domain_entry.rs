use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainList {
    Blocked,
    Allowed,
    /// Seen in a query but on neither list.
    Unlisted,
}

impl DomainList {
    pub fn to_str(&self) -> &'static str {
        match self {
            DomainList::Blocked => "blocked",
            DomainList::Allowed => "allowed",
            DomainList::Unlisted => "unlisted",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "blocked" => Some(DomainList::Blocked),
            "allowed" => Some(DomainList::Allowed),
            "unlisted" => Some(DomainList::Unlisted),
            _ => None,
        }
    }
}

/// A row of the domain table.
#[derive(Debug, Clone)]
pub struct DomainEntry {
    pub id: Option<i64>,
    pub name: Arc<str>,
    pub forward_ip: Option<IpAddr>,
    pub list: DomainList,
    pub category: Option<Arc<str>>,
    pub list_url: Option<Arc<str>>,
}

impl DomainEntry {
    pub fn new(name: impl Into<Arc<str>>, list: DomainList) -> Self {
        Self {
            id: None,
            name: name.into(),
            forward_ip: None,
            list,
            category: None,
            list_url: None,
        }
    }

    pub fn blocked(name: impl Into<Arc<str>>, redirect: IpAddr) -> Self {
        let mut entry = Self::new(name, DomainList::Blocked);
        entry.forward_ip = Some(redirect);
        entry
    }

    pub fn is_blocked(&self) -> bool {
        self.list == DomainList::Blocked
    }
}

/// Normalizes a hostname for storage and lookup.
pub fn normalize_hostname(name: &str) -> String {
    name.trim().trim_end_matches('.').to_ascii_lowercase()
}
