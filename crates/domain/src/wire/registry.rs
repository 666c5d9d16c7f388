//! Record-type registration table.
//!
//! Maps a numeric record type to the decoder for its payload and to a
//! constructor for an empty payload. The table is built once on first use;
//! types without an entry decode as [`RData::Unknown`], which keeps the raw
//! bytes and writes them back unchanged.

use std::collections::HashMap;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::LazyLock;

use tracing::warn;

use super::codec::WireReader;
use super::error::WireError;
use super::name::DomainName;
use super::rdata::{self, RData};
use super::record_type::RecordType;

pub type PayloadDecoder = fn(&mut WireReader<'_>, usize) -> Result<RData, WireError>;
pub type PayloadFactory = fn() -> RData;

#[derive(Clone, Copy)]
pub struct Registration {
    pub record_type: RecordType,
    pub decode: PayloadDecoder,
    pub empty: PayloadFactory,
}

const REGISTRATIONS: &[Registration] = &[
    Registration {
        record_type: RecordType::A,
        decode: rdata::read_a,
        empty: || RData::A(Ipv4Addr::UNSPECIFIED),
    },
    Registration {
        record_type: RecordType::AAAA,
        decode: rdata::read_aaaa,
        empty: || RData::AAAA(Ipv6Addr::UNSPECIFIED),
    },
    Registration {
        record_type: RecordType::NS,
        decode: rdata::read_ns,
        empty: || RData::NS(DomainName::root()),
    },
    Registration {
        record_type: RecordType::CNAME,
        decode: rdata::read_cname,
        empty: || RData::CNAME(DomainName::root()),
    },
    Registration {
        record_type: RecordType::PTR,
        decode: rdata::read_ptr,
        empty: || RData::PTR(DomainName::root()),
    },
    Registration {
        record_type: RecordType::DNAME,
        decode: rdata::read_dname,
        empty: || RData::DNAME(DomainName::root()),
    },
    Registration {
        record_type: RecordType::MX,
        decode: rdata::read_mx,
        empty: || RData::MX {
            preference: 0,
            exchange: DomainName::root(),
        },
    },
    Registration {
        record_type: RecordType::TXT,
        decode: rdata::read_txt,
        empty: || RData::TXT(Vec::new()),
    },
    Registration {
        record_type: RecordType::SOA,
        decode: rdata::read_soa,
        empty: || RData::SOA {
            mname: DomainName::root(),
            rname: DomainName::root(),
            serial: 0,
            refresh: 0,
            retry: 0,
            expire: 0,
            minimum: 0,
        },
    },
    Registration {
        record_type: RecordType::SRV,
        decode: rdata::read_srv,
        empty: || RData::SRV {
            priority: 0,
            weight: 0,
            port: 0,
            target: DomainName::root(),
        },
    },
    Registration {
        record_type: RecordType::HINFO,
        decode: rdata::read_hinfo,
        empty: || RData::HINFO {
            cpu: Box::default(),
            os: Box::default(),
        },
    },
    Registration {
        record_type: RecordType::CAA,
        decode: rdata::read_caa,
        empty: || RData::CAA {
            flags: 0,
            tag: Box::default(),
            value: Box::default(),
        },
    },
    Registration {
        record_type: RecordType::DS,
        decode: rdata::read_ds,
        empty: || RData::DS {
            key_tag: 0,
            algorithm: 0,
            digest_type: 0,
            digest: Box::default(),
        },
    },
    Registration {
        record_type: RecordType::DNSKEY,
        decode: rdata::read_dnskey,
        empty: || RData::DNSKEY {
            flags: 0,
            protocol: 3,
            algorithm: 0,
            public_key: Box::default(),
        },
    },
    Registration {
        record_type: RecordType::RRSIG,
        decode: rdata::read_rrsig,
        empty: || RData::RRSIG {
            type_covered: 0,
            algorithm: 0,
            labels: 0,
            original_ttl: 0,
            expiration: 0,
            inception: 0,
            key_tag: 0,
            signer: DomainName::root(),
            signature: Box::default(),
        },
    },
    Registration {
        record_type: RecordType::NSEC,
        decode: rdata::read_nsec,
        empty: || RData::NSEC {
            next: DomainName::root(),
            type_bitmaps: Box::default(),
        },
    },
    Registration {
        record_type: RecordType::OPT,
        decode: rdata::read_opt,
        empty: || RData::OPT(Vec::new()),
    },
];

fn build(entries: &[Registration]) -> HashMap<u16, Registration> {
    let mut table = HashMap::with_capacity(entries.len());
    for entry in entries {
        let code = entry.record_type.to_u16();
        if table.insert(code, *entry).is_some() {
            warn!(
                record_type = %entry.record_type,
                "Duplicate payload registration, keeping the last one"
            );
        }
    }
    table
}

static TABLE: LazyLock<HashMap<u16, Registration>> = LazyLock::new(|| build(REGISTRATIONS));

/// Decoder for `code`, falling back to the raw-bytes decoder.
pub fn decoder(code: u16) -> PayloadDecoder {
    TABLE
        .get(&code)
        .map(|r| r.decode)
        .unwrap_or(rdata::read_unknown)
}

/// An empty payload instance for `record_type`.
pub fn create(record_type: RecordType) -> RData {
    TABLE
        .get(&record_type.to_u16())
        .map(|r| (r.empty)())
        .unwrap_or_else(|| RData::Unknown(Box::default()))
}

pub fn is_registered(code: u16) -> bool {
    TABLE.contains_key(&code)
}
