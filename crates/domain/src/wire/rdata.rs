use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use super::codec::{WireReader, WireWriter};
use super::edns::{read_options, write_options, EdnsOption};
use super::error::WireError;
use super::name::DomainName;
use super::record_type::RecordType;

/// Typed record payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RData {
    A(Ipv4Addr),
    AAAA(Ipv6Addr),
    NS(DomainName),
    CNAME(DomainName),
    PTR(DomainName),
    DNAME(DomainName),
    MX {
        preference: u16,
        exchange: DomainName,
    },
    TXT(Vec<Box<[u8]>>),
    SOA {
        mname: DomainName,
        rname: DomainName,
        serial: u32,
        refresh: u32,
        retry: u32,
        expire: u32,
        minimum: u32,
    },
    SRV {
        priority: u16,
        weight: u16,
        port: u16,
        target: DomainName,
    },
    HINFO {
        cpu: Box<[u8]>,
        os: Box<[u8]>,
    },
    CAA {
        flags: u8,
        tag: Box<[u8]>,
        value: Box<[u8]>,
    },
    DS {
        key_tag: u16,
        algorithm: u8,
        digest_type: u8,
        digest: Box<[u8]>,
    },
    DNSKEY {
        flags: u16,
        protocol: u8,
        algorithm: u8,
        public_key: Box<[u8]>,
    },
    RRSIG {
        type_covered: u16,
        algorithm: u8,
        labels: u8,
        original_ttl: u32,
        expiration: u32,
        inception: u32,
        key_tag: u16,
        signer: DomainName,
        signature: Box<[u8]>,
    },
    NSEC {
        next: DomainName,
        type_bitmaps: Box<[u8]>,
    },
    OPT(Vec<EdnsOption>),
    /// Raw bytes of a payload kind with no registered decoder.
    Unknown(Box<[u8]>),
}

/// Bytes left before `start + len`, or a corruption error when the decoder
/// already read past the declared payload length.
fn rest(reader: &WireReader<'_>, start: usize, len: usize) -> Result<usize, WireError> {
    let end = start + len;
    let pos = reader.position();
    if pos > end {
        return Err(WireError::DataCorruption {
            expected: end,
            actual: pos,
        });
    }
    Ok(end - pos)
}

pub(crate) fn read_a(r: &mut WireReader<'_>, _len: usize) -> Result<RData, WireError> {
    let b = r.read_bytes(4)?;
    Ok(RData::A(Ipv4Addr::new(b[0], b[1], b[2], b[3])))
}

pub(crate) fn read_aaaa(r: &mut WireReader<'_>, _len: usize) -> Result<RData, WireError> {
    let b = r.read_bytes(16)?;
    let mut octets = [0u8; 16];
    octets.copy_from_slice(b);
    Ok(RData::AAAA(Ipv6Addr::from(octets)))
}

pub(crate) fn read_ns(r: &mut WireReader<'_>, _len: usize) -> Result<RData, WireError> {
    Ok(RData::NS(r.read_name()?))
}

pub(crate) fn read_cname(r: &mut WireReader<'_>, _len: usize) -> Result<RData, WireError> {
    Ok(RData::CNAME(r.read_name()?))
}

pub(crate) fn read_ptr(r: &mut WireReader<'_>, _len: usize) -> Result<RData, WireError> {
    Ok(RData::PTR(r.read_name()?))
}

pub(crate) fn read_dname(r: &mut WireReader<'_>, _len: usize) -> Result<RData, WireError> {
    Ok(RData::DNAME(r.read_name()?))
}

pub(crate) fn read_mx(r: &mut WireReader<'_>, _len: usize) -> Result<RData, WireError> {
    Ok(RData::MX {
        preference: r.read_u16()?,
        exchange: r.read_name()?,
    })
}

pub(crate) fn read_txt(r: &mut WireReader<'_>, len: usize) -> Result<RData, WireError> {
    let start = r.position();
    let mut strings = Vec::new();
    while rest(r, start, len)? > 0 {
        strings.push(r.read_character_string()?.into());
    }
    Ok(RData::TXT(strings))
}

pub(crate) fn read_soa(r: &mut WireReader<'_>, _len: usize) -> Result<RData, WireError> {
    Ok(RData::SOA {
        mname: r.read_name()?,
        rname: r.read_name()?,
        serial: r.read_u32()?,
        refresh: r.read_u32()?,
        retry: r.read_u32()?,
        expire: r.read_u32()?,
        minimum: r.read_u32()?,
    })
}

pub(crate) fn read_srv(r: &mut WireReader<'_>, _len: usize) -> Result<RData, WireError> {
    Ok(RData::SRV {
        priority: r.read_u16()?,
        weight: r.read_u16()?,
        port: r.read_u16()?,
        target: r.read_name()?,
    })
}

pub(crate) fn read_hinfo(r: &mut WireReader<'_>, _len: usize) -> Result<RData, WireError> {
    Ok(RData::HINFO {
        cpu: r.read_character_string()?.into(),
        os: r.read_character_string()?.into(),
    })
}

pub(crate) fn read_caa(r: &mut WireReader<'_>, len: usize) -> Result<RData, WireError> {
    let start = r.position();
    let flags = r.read_u8()?;
    let tag = r.read_character_string()?.into();
    let value_len = rest(r, start, len)?;
    Ok(RData::CAA {
        flags,
        tag,
        value: r.read_bytes(value_len)?.into(),
    })
}

pub(crate) fn read_ds(r: &mut WireReader<'_>, len: usize) -> Result<RData, WireError> {
    let start = r.position();
    let key_tag = r.read_u16()?;
    let algorithm = r.read_u8()?;
    let digest_type = r.read_u8()?;
    let digest_len = rest(r, start, len)?;
    Ok(RData::DS {
        key_tag,
        algorithm,
        digest_type,
        digest: r.read_bytes(digest_len)?.into(),
    })
}

pub(crate) fn read_dnskey(r: &mut WireReader<'_>, len: usize) -> Result<RData, WireError> {
    let start = r.position();
    let flags = r.read_u16()?;
    let protocol = r.read_u8()?;
    let algorithm = r.read_u8()?;
    let key_len = rest(r, start, len)?;
    Ok(RData::DNSKEY {
        flags,
        protocol,
        algorithm,
        public_key: r.read_bytes(key_len)?.into(),
    })
}

pub(crate) fn read_rrsig(r: &mut WireReader<'_>, len: usize) -> Result<RData, WireError> {
    let start = r.position();
    let type_covered = r.read_u16()?;
    let algorithm = r.read_u8()?;
    let labels = r.read_u8()?;
    let original_ttl = r.read_u32()?;
    let expiration = r.read_u32()?;
    let inception = r.read_u32()?;
    let key_tag = r.read_u16()?;
    let signer = r.read_name()?;
    let sig_len = rest(r, start, len)?;
    Ok(RData::RRSIG {
        type_covered,
        algorithm,
        labels,
        original_ttl,
        expiration,
        inception,
        key_tag,
        signer,
        signature: r.read_bytes(sig_len)?.into(),
    })
}

pub(crate) fn read_nsec(r: &mut WireReader<'_>, len: usize) -> Result<RData, WireError> {
    let start = r.position();
    let next = r.read_name()?;
    let bitmap_len = rest(r, start, len)?;
    Ok(RData::NSEC {
        next,
        type_bitmaps: r.read_bytes(bitmap_len)?.into(),
    })
}

pub(crate) fn read_opt(r: &mut WireReader<'_>, len: usize) -> Result<RData, WireError> {
    Ok(RData::OPT(read_options(r, len)?))
}

pub(crate) fn read_unknown(r: &mut WireReader<'_>, len: usize) -> Result<RData, WireError> {
    Ok(RData::Unknown(r.read_bytes(len)?.into()))
}

impl RData {
    /// Writes the payload. Names inside NS, CNAME, PTR, MX and SOA payloads
    /// are compressed when `compress` is set; all other embedded names are
    /// always written in full.
    pub fn write(&self, w: &mut WireWriter, compress: bool) -> Result<(), WireError> {
        match self {
            RData::A(ip) => w.write_bytes(&ip.octets()),
            RData::AAAA(ip) => w.write_bytes(&ip.octets()),
            RData::NS(name) | RData::CNAME(name) | RData::PTR(name) => {
                w.write_name(name, compress)
            }
            RData::DNAME(name) => w.write_name(name, false),
            RData::MX {
                preference,
                exchange,
            } => {
                w.write_u16(*preference);
                w.write_name(exchange, compress);
            }
            RData::TXT(strings) => {
                for s in strings {
                    w.write_character_string(s)?;
                }
            }
            RData::SOA {
                mname,
                rname,
                serial,
                refresh,
                retry,
                expire,
                minimum,
            } => {
                w.write_name(mname, compress);
                w.write_name(rname, compress);
                for v in [serial, refresh, retry, expire, minimum] {
                    w.write_u32(*v);
                }
            }
            RData::SRV {
                priority,
                weight,
                port,
                target,
            } => {
                w.write_u16(*priority);
                w.write_u16(*weight);
                w.write_u16(*port);
                w.write_name(target, false);
            }
            RData::HINFO { cpu, os } => {
                w.write_character_string(cpu)?;
                w.write_character_string(os)?;
            }
            RData::CAA { flags, tag, value } => {
                w.write_u8(*flags);
                w.write_character_string(tag)?;
                w.write_bytes(value);
            }
            RData::DS {
                key_tag,
                algorithm,
                digest_type,
                digest,
            } => {
                w.write_u16(*key_tag);
                w.write_u8(*algorithm);
                w.write_u8(*digest_type);
                w.write_bytes(digest);
            }
            RData::DNSKEY {
                flags,
                protocol,
                algorithm,
                public_key,
            } => {
                w.write_u16(*flags);
                w.write_u8(*protocol);
                w.write_u8(*algorithm);
                w.write_bytes(public_key);
            }
            RData::RRSIG {
                type_covered,
                algorithm,
                labels,
                original_ttl,
                expiration,
                inception,
                key_tag,
                signer,
                signature,
            } => {
                w.write_u16(*type_covered);
                w.write_u8(*algorithm);
                w.write_u8(*labels);
                w.write_u32(*original_ttl);
                w.write_u32(*expiration);
                w.write_u32(*inception);
                w.write_u16(*key_tag);
                w.write_name(signer, false);
                w.write_bytes(signature);
            }
            RData::NSEC { next, type_bitmaps } => {
                w.write_name(next, false);
                w.write_bytes(type_bitmaps);
            }
            RData::OPT(options) => write_options(w, options)?,
            RData::Unknown(raw) => w.write_bytes(raw),
        }
        Ok(())
    }

    /// Uncompressed payload bytes, used for record identity.
    pub fn to_wire_bytes(&self) -> Vec<u8> {
        let mut w = WireWriter::with_capacity(64);
        // Only over-long character strings fail, and those cannot be decoded
        // in the first place; an empty identity is acceptable for them.
        if self.write(&mut w, false).is_err() {
            return Vec::new();
        }
        w.into_bytes()
    }

    pub fn as_ip(&self) -> Option<IpAddr> {
        match self {
            RData::A(ip) => Some(IpAddr::V4(*ip)),
            RData::AAAA(ip) => Some(IpAddr::V6(*ip)),
            _ => None,
        }
    }

    /// The name a PTR, CNAME, NS or DNAME payload points at.
    pub fn target(&self) -> Option<&DomainName> {
        match self {
            RData::PTR(n) | RData::CNAME(n) | RData::NS(n) | RData::DNAME(n) => Some(n),
            _ => None,
        }
    }

    /// Address payload for `ip` with the matching record type.
    pub fn from_ip(ip: IpAddr) -> (RecordType, RData) {
        match ip {
            IpAddr::V4(v4) => (RecordType::A, RData::A(v4)),
            IpAddr::V6(v6) => (RecordType::AAAA, RData::AAAA(v6)),
        }
    }
}

fn fmt_bytes(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    f.write_str("\"")?;
    for &b in bytes {
        match b {
            b'"' | b'\\' => write!(f, "\\{}", b as char)?,
            0x20..=0x7e => write!(f, "{}", b as char)?,
            _ => write!(f, "\\{:03}", b)?,
        }
    }
    f.write_str("\"")
}

fn fmt_hex(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    for b in bytes {
        write!(f, "{:02X}", b)?;
    }
    Ok(())
}

impl fmt::Display for RData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RData::A(ip) => write!(f, "{}", ip),
            RData::AAAA(ip) => write!(f, "{}", ip),
            RData::NS(n) | RData::CNAME(n) | RData::PTR(n) | RData::DNAME(n) => {
                write!(f, "{}.", n)
            }
            RData::MX {
                preference,
                exchange,
            } => write!(f, "{} {}.", preference, exchange),
            RData::TXT(strings) => {
                for (i, s) in strings.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" ")?;
                    }
                    fmt_bytes(f, s)?;
                }
                Ok(())
            }
            RData::SOA {
                mname,
                rname,
                serial,
                refresh,
                retry,
                expire,
                minimum,
            } => write!(
                f,
                "{}. {}. {} {} {} {} {}",
                mname, rname, serial, refresh, retry, expire, minimum
            ),
            RData::SRV {
                priority,
                weight,
                port,
                target,
            } => write!(f, "{} {} {} {}.", priority, weight, port, target),
            RData::HINFO { cpu, os } => {
                fmt_bytes(f, cpu)?;
                f.write_str(" ")?;
                fmt_bytes(f, os)
            }
            RData::CAA { flags, tag, value } => {
                write!(f, "{} {} ", flags, String::from_utf8_lossy(tag))?;
                fmt_bytes(f, value)
            }
            RData::DS {
                key_tag,
                algorithm,
                digest_type,
                digest,
            } => {
                write!(f, "{} {} {} ", key_tag, algorithm, digest_type)?;
                fmt_hex(f, digest)
            }
            RData::DNSKEY {
                flags,
                protocol,
                algorithm,
                public_key,
            } => {
                write!(f, "{} {} {} ", flags, protocol, algorithm)?;
                fmt_hex(f, public_key)
            }
            RData::RRSIG {
                type_covered,
                algorithm,
                labels,
                original_ttl,
                key_tag,
                signer,
                ..
            } => write!(
                f,
                "{} {} {} {} {} {}.",
                RecordType::from_u16(*type_covered),
                algorithm,
                labels,
                original_ttl,
                key_tag,
                signer
            ),
            RData::NSEC { next, .. } => write!(f, "{}.", next),
            RData::OPT(options) => write!(f, "OPT ({} options)", options.len()),
            RData::Unknown(raw) => {
                write!(f, "\\# {} ", raw.len())?;
                fmt_hex(f, raw)
            }
        }
    }
}
