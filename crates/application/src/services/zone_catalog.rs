use rayon::prelude::*;
use sinkhole_dns_domain::config::LocalDnsRecord;
use sinkhole_dns_domain::{
    DomainError, DomainName, Question, RData, RecordClass, RecordType, ResourceRecord,
};
use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

use super::root_hints::{root_servers, ROOT_HINT_TTL};

/// One catalog entry: a name, whether we answer for it, and its records.
#[derive(Debug, Clone)]
pub struct DomainNode {
    pub name: DomainName,
    pub authoritative: bool,
    pub records: HashSet<ResourceRecord>,
}

impl DomainNode {
    fn new(name: DomainName, authoritative: bool) -> Self {
        Self {
            name,
            authoritative,
            records: HashSet::new(),
        }
    }

    pub fn records_of(&self, record_type: RecordType, class: RecordClass) -> Vec<ResourceRecord> {
        let mut out: Vec<ResourceRecord> = self
            .records
            .iter()
            .filter(|rr| record_type == RecordType::ANY || rr.record_type == record_type)
            .filter(|rr| class == RecordClass::ANY || rr.class == class)
            .cloned()
            .collect();
        out.sort_by_key(|rr| rr.data.to_wire_bytes());
        out
    }
}

/// In-memory authoritative store keyed by domain name.
///
/// All mutation goes through one write lock; lookups share a read lock.
#[derive(Default)]
pub struct ZoneCatalog {
    nodes: RwLock<HashMap<DomainName, DomainNode>>,
}

const ADD_ATTEMPTS: usize = 2;

fn node_entry<'a>(
    nodes: &'a mut HashMap<DomainName, DomainNode>,
    name: &DomainName,
    authoritative: bool,
) -> Result<&'a mut DomainNode, DomainError> {
    node_entry_with(nodes, name, authoritative, |nodes, name, authoritative| {
        nodes
            .entry(name.clone())
            .or_insert_with(|| DomainNode::new(name.clone(), authoritative));
    })
}

/// Get-or-create for `name`. An insert that does not stick is retried once
/// by re-reading the map; a second miss is an invariant violation.
fn node_entry_with<'a, F>(
    nodes: &'a mut HashMap<DomainName, DomainNode>,
    name: &DomainName,
    authoritative: bool,
    mut insert: F,
) -> Result<&'a mut DomainNode, DomainError>
where
    F: FnMut(&mut HashMap<DomainName, DomainNode>, &DomainName, bool),
{
    for attempt in 1..=ADD_ATTEMPTS {
        if !nodes.contains_key(name) {
            insert(nodes, name, authoritative);
        }
        if nodes.contains_key(name) {
            break;
        }
        if attempt < ADD_ATTEMPTS {
            warn!(name = %name, attempt, "Catalog add lost its node, retrying");
        }
    }

    match nodes.get_mut(name) {
        Some(node) => {
            node.authoritative |= authoritative;
            Ok(node)
        }
        None => Err(DomainError::CatalogInvariant(format!(
            "node {} missing after {} add attempts",
            name, ADD_ATTEMPTS
        ))),
    }
}

impl ZoneCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<DomainName, DomainNode>> {
        self.nodes.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<DomainName, DomainNode>> {
        self.nodes.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Stores `record`, replacing whatever the node held for the same
    /// owner, class and type.
    pub fn add_or_update(
        &self,
        record: ResourceRecord,
        authoritative: bool,
    ) -> Result<(), DomainError> {
        let mut nodes = self.write();
        let node = node_entry(&mut nodes, &record.name, authoritative)?;
        node.records.retain(|existing| !existing.same_rrset(&record));
        debug!(record = %record, authoritative, "Catalog record updated");
        node.records.insert(record);
        Ok(())
    }

    /// Adds `record` next to any others of the same type. Exact duplicates
    /// collapse into one.
    pub fn add(&self, record: ResourceRecord, authoritative: bool) -> Result<(), DomainError> {
        let mut nodes = self.write();
        let node = node_entry(&mut nodes, &record.name, authoritative)?;
        node.records.insert(record);
        Ok(())
    }

    /// Root name server hints plus an authoritative root node.
    pub fn with_root_ns(self) -> Result<Self, DomainError> {
        let servers = root_servers();
        {
            let mut nodes = self.write();
            let root = DomainName::root();
            for server in &servers {
                node_entry(&mut nodes, &root, true)?.records.insert(ResourceRecord::new(
                    root.clone(),
                    RecordType::NS,
                    ROOT_HINT_TTL,
                    RData::NS(server.name.clone()),
                ));
                let addresses = server
                    .v4
                    .map(IpAddr::V4)
                    .into_iter()
                    .chain(server.v6.map(IpAddr::V6));
                for ip in addresses {
                    let (rtype, data) = RData::from_ip(ip);
                    node_entry(&mut nodes, &server.name, false)?
                        .records
                        .insert(ResourceRecord::new(
                            server.name.clone(),
                            rtype,
                            ROOT_HINT_TTL,
                            data,
                        ));
                }
            }
        }
        info!(servers = servers.len(), "Root hints loaded");
        Ok(self)
    }

    /// Static host entries, served authoritatively.
    pub fn with_local_records(
        self,
        records: &[LocalDnsRecord],
        default_domain: &Option<String>,
    ) -> Result<Self, DomainError> {
        let mut loaded = 0;
        for local in records {
            let fqdn = local.fqdn(default_domain);
            let name = match fqdn.parse::<DomainName>() {
                Ok(name) => name,
                Err(e) => {
                    warn!(name = %fqdn, error = %e, "Skipping local record with invalid name");
                    continue;
                }
            };
            let Ok(ip) = local.ip.parse::<IpAddr>() else {
                warn!(name = %fqdn, ip = %local.ip, "Skipping local record with invalid IP");
                continue;
            };
            let (rtype, data) = RData::from_ip(ip);
            self.add(
                ResourceRecord::new(name, rtype, local.ttl_or_default(), data),
                true,
            )?;
            loaded += 1;
        }
        if loaded > 0 {
            info!(count = loaded, "Local records loaded");
        }
        Ok(self)
    }

    /// Adds a PTR record under the reverse name of every authoritative
    /// A/AAAA record.
    pub fn with_reverse_lookup_records(self) -> Result<Self, DomainError> {
        let sources: Vec<ResourceRecord> = self
            .read()
            .values()
            .filter(|node| node.authoritative)
            .flat_map(|node| node.records.iter())
            .filter(|rr| rr.record_type.is_address())
            .cloned()
            .collect();

        let ptrs: Vec<ResourceRecord> = sources
            .par_iter()
            .filter_map(|rr| {
                let ip = rr.data.as_ip()?;
                Some(ResourceRecord::new(
                    DomainName::reverse_lookup(ip),
                    RecordType::PTR,
                    rr.ttl,
                    RData::PTR(rr.name.clone()),
                ))
            })
            .collect();

        let count = ptrs.len();
        {
            let mut nodes = self.write();
            for ptr in ptrs {
                node_entry(&mut nodes, &ptr.name, true)?.records.insert(ptr);
            }
        }
        info!(count, "Reverse lookup records synthesized");
        Ok(self)
    }

    /// Adds `name -> ip` and the matching PTR unless the reverse name is
    /// already present. Returns whether anything was added.
    pub fn add_host(&self, name: &DomainName, ip: IpAddr, ttl: u32) -> Result<bool, DomainError> {
        let reverse = DomainName::reverse_lookup(ip);
        let mut nodes = self.write();
        if nodes.contains_key(&reverse) {
            return Ok(false);
        }
        let (rtype, data) = RData::from_ip(ip);
        let forward = ResourceRecord::new(name.clone(), rtype, ttl, data);
        let node = node_entry(&mut nodes, name, true)?;
        node.records.retain(|existing| !existing.same_rrset(&forward));
        node.records.insert(forward);
        node_entry(&mut nodes, &reverse, true)?
            .records
            .insert(ResourceRecord::new(
                reverse.clone(),
                RecordType::PTR,
                ttl,
                RData::PTR(name.clone()),
            ));
        Ok(true)
    }

    /// Deletes `name` and every name below it. Returns the number of nodes removed.
    pub fn remove_zone(&self, name: &DomainName) -> usize {
        let mut nodes = self.write();
        let before = nodes.len();
        nodes.retain(|key, _| !key.is_equal_or_subdomain_of(name));
        let removed = before - nodes.len();
        if removed > 0 {
            info!(zone = %name, removed, "Zone removed from catalog");
        }
        removed
    }

    pub fn contains(&self, name: &DomainName) -> bool {
        self.read().contains_key(name)
    }

    pub fn get(&self, name: &DomainName) -> Option<DomainNode> {
        self.read().get(name).cloned()
    }

    /// Records answering `question` when the catalog is authoritative for
    /// its name. An empty vector means the name exists without that type.
    pub fn lookup(&self, question: &Question) -> Option<Vec<ResourceRecord>> {
        let nodes = self.read();
        let node = nodes.get(&question.name)?;
        if !node.authoritative {
            return None;
        }
        Some(node.records_of(question.qtype, question.qclass))
    }

    /// Searches authoritative PTR records whose owner name starts with
    /// `query`, or contains it when `partial` is set.
    pub fn find_ptr(&self, query: &DomainName, partial: bool) -> Option<ResourceRecord> {
        let nodes = self.read();
        if let Some(node) = nodes.get(query).filter(|n| n.authoritative) {
            if let Some(ptr) = node.records_of(RecordType::PTR, RecordClass::ANY).into_iter().next() {
                return Some(ptr);
            }
        }

        let needle = query.to_string().to_ascii_lowercase();
        nodes
            .values()
            .filter(|node| node.authoritative && node.name.is_reverse_zone())
            .flat_map(|node| node.records.iter())
            .filter(|rr| rr.record_type == RecordType::PTR)
            .filter(|rr| {
                let owner = rr.name.to_string().to_ascii_lowercase();
                if partial {
                    owner.contains(&needle)
                } else {
                    owner.starts_with(&needle)
                }
            })
            .min_by_key(|rr| rr.name.to_string())
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn name(s: &str) -> DomainName {
        s.parse().unwrap()
    }

    fn a(owner: &str, ip: [u8; 4]) -> ResourceRecord {
        ResourceRecord::new(name(owner), RecordType::A, 300, RData::A(Ipv4Addr::from(ip)))
    }

    #[test]
    fn test_lost_insert_is_retried_once() {
        let mut nodes = HashMap::new();
        let owner = name("host.lan");
        let mut calls = 0;

        let node = node_entry_with(&mut nodes, &owner, true, |nodes, n, auth| {
            calls += 1;
            if calls > 1 {
                nodes.insert(n.clone(), DomainNode::new(n.clone(), auth));
            }
        })
        .unwrap();

        assert!(node.authoritative);
        assert_eq!(calls, 2);
    }

    #[test]
    fn test_second_lost_insert_is_invariant_violation() {
        let mut nodes = HashMap::new();
        let mut calls = 0;

        let result = node_entry_with(&mut nodes, &name("host.lan"), false, |_, _, _| calls += 1);

        assert!(matches!(result, Err(DomainError::CatalogInvariant(_))));
        assert_eq!(calls, ADD_ATTEMPTS);
    }

    #[test]
    fn test_add_or_update_twice_keeps_one_record() {
        let catalog = ZoneCatalog::new();
        catalog.add_or_update(a("host.lan", [10, 0, 0, 1]), true).unwrap();
        catalog.add_or_update(a("host.lan", [10, 0, 0, 1]), true).unwrap();
        assert_eq!(catalog.get(&name("host.lan")).unwrap().records.len(), 1);
    }

    #[test]
    fn test_add_or_update_replaces_payload() {
        let catalog = ZoneCatalog::new();
        catalog.add_or_update(a("host.lan", [10, 0, 0, 1]), true).unwrap();
        catalog.add_or_update(a("host.lan", [10, 0, 0, 2]), true).unwrap();
        let node = catalog.get(&name("host.lan")).unwrap();
        assert_eq!(node.records.len(), 1);
        assert!(node.records.contains(&a("host.lan", [10, 0, 0, 2])));
    }

    #[test]
    fn test_root_ns_bootstrap() {
        let catalog = ZoneCatalog::new().with_root_ns().unwrap();
        let root = catalog.get(&DomainName::root()).unwrap();
        assert!(root.authoritative);
        assert_eq!(root.records_of(RecordType::NS, RecordClass::IN).len(), 13);
        let a_root = catalog.get(&name("a.root-servers.net")).unwrap();
        assert!(!a_root.authoritative);
        assert_eq!(a_root.records.len(), 2);
    }

    #[test]
    fn test_reverse_records_for_authoritative_addresses_only() {
        let catalog = ZoneCatalog::new();
        catalog.add(a("nas.lan", [192, 168, 1, 10]), true).unwrap();
        catalog.add(a("cached.example", [1, 2, 3, 4]), false).unwrap();
        let catalog = catalog.with_reverse_lookup_records().unwrap();

        let ptr = catalog.get(&name("10.1.168.192.in-addr.arpa")).unwrap();
        assert!(ptr.authoritative);
        assert!(ptr
            .records
            .iter()
            .any(|rr| rr.data == RData::PTR(name("nas.lan"))));
        assert!(!catalog.contains(&name("4.3.2.1.in-addr.arpa")));
    }

    #[test]
    fn test_remove_zone_takes_subdomains() {
        let catalog = ZoneCatalog::new();
        catalog.add(a("corp.lan", [10, 0, 0, 1]), true).unwrap();
        catalog.add(a("a.corp.lan", [10, 0, 0, 2]), true).unwrap();
        catalog.add(a("b.a.corp.lan", [10, 0, 0, 3]), true).unwrap();
        catalog.add(a("othercorp.lan", [10, 0, 0, 4]), true).unwrap();
        assert_eq!(catalog.remove_zone(&name("corp.lan")), 3);
        assert_eq!(catalog.len(), 1);
        assert!(catalog.contains(&name("othercorp.lan")));
    }

    #[test]
    fn test_add_host_skips_known_reverse_name() {
        let catalog = ZoneCatalog::new();
        let ip: IpAddr = "10.0.0.7".parse().unwrap();
        assert!(catalog.add_host(&name("laptop.lan"), ip, 300).unwrap());
        assert!(!catalog.add_host(&name("renamed.lan"), ip, 300).unwrap());
        assert!(!catalog.contains(&name("renamed.lan")));
    }

    #[test]
    fn test_lookup_ignores_non_authoritative_nodes() {
        let catalog = ZoneCatalog::new();
        catalog.add(a("hint.example", [1, 1, 1, 1]), false).unwrap();
        catalog.add(a("nas.lan", [10, 0, 0, 1]), true).unwrap();
        assert!(catalog
            .lookup(&Question::new(name("hint.example"), RecordType::A))
            .is_none());
        assert_eq!(
            catalog
                .lookup(&Question::new(name("nas.lan"), RecordType::A))
                .unwrap()
                .len(),
            1
        );
        assert!(catalog
            .lookup(&Question::new(name("nas.lan"), RecordType::AAAA))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_find_ptr_prefix_and_partial() {
        let catalog = ZoneCatalog::new();
        catalog.add(a("nas.lan", [192, 168, 1, 10]), true).unwrap();
        let catalog = catalog.with_reverse_lookup_records().unwrap();

        let exact = catalog.find_ptr(&name("10.1.168.192.in-addr.arpa"), false);
        assert_eq!(exact.unwrap().data, RData::PTR(name("nas.lan")));
        assert!(catalog.find_ptr(&name("10.1"), false).is_some());
        assert!(catalog.find_ptr(&name("1.168"), false).is_none());
        assert!(catalog.find_ptr(&name("1.168"), true).is_some());
    }
}
