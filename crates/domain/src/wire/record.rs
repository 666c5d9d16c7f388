use std::fmt;
use std::hash::{Hash, Hasher};

use super::codec::{WireReader, WireWriter};
use super::error::WireError;
use super::name::DomainName;
use super::rdata::RData;
use super::record_type::{RecordClass, RecordType};
use super::registry;

#[derive(Debug, Clone)]
pub struct ResourceRecord {
    pub name: DomainName,
    pub record_type: RecordType,
    pub class: RecordClass,
    pub ttl: u32,
    /// Unix seconds at which the record was created or received.
    pub created_at: i64,
    pub data: RData,
    /// Set when the record was parsed from a packet flagged as corrupted.
    pub corrupted: bool,
}

impl ResourceRecord {
    pub fn new(name: DomainName, record_type: RecordType, ttl: u32, data: RData) -> Self {
        Self {
            name,
            record_type,
            class: RecordClass::IN,
            ttl,
            created_at: chrono::Utc::now().timestamp(),
            data,
            corrupted: false,
        }
    }

    pub fn with_class(mut self, class: RecordClass) -> Self {
        self.class = class;
        self
    }

    pub fn is_expired_at(&self, now: i64) -> bool {
        self.corrupted || now > self.created_at + self.ttl as i64
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(chrono::Utc::now().timestamp())
    }

    pub fn remaining_ttl_at(&self, now: i64) -> u32 {
        let left = self.created_at + self.ttl as i64 - now;
        left.clamp(0, u32::MAX as i64) as u32
    }

    /// Same owner, class and type; payload is not compared.
    pub fn same_rrset(&self, other: &ResourceRecord) -> bool {
        self.name == other.name
            && self.class == other.class
            && self.record_type == other.record_type
    }

    pub fn read(reader: &mut WireReader<'_>) -> Result<Self, WireError> {
        let name = reader.read_name()?;
        let type_code = reader.read_u16()?;
        let class = RecordClass(reader.read_u16()?);
        let ttl = reader.read_u32()?;
        let rdlength = reader.read_u16()? as usize;

        let start = reader.position();
        let data = registry::decoder(type_code)(reader, rdlength)?;
        let expected = start + rdlength;
        if reader.position() != expected {
            return Err(WireError::DataCorruption {
                expected,
                actual: reader.position(),
            });
        }

        Ok(Self {
            name,
            record_type: RecordType::from_u16(type_code),
            class,
            ttl,
            created_at: chrono::Utc::now().timestamp(),
            data,
            corrupted: false,
        })
    }

    pub fn write(&self, writer: &mut WireWriter) -> Result<(), WireError> {
        writer.write_name(&self.name, true);
        writer.write_u16(self.record_type.to_u16());
        writer.write_u16(self.class.0);
        writer.write_u32(self.ttl);
        let at = writer.begin_length();
        self.data.write(writer, true)?;
        writer.end_length(at)
    }
}

impl PartialEq for ResourceRecord {
    fn eq(&self, other: &Self) -> bool {
        self.same_rrset(other) && self.data.to_wire_bytes() == other.data.to_wire_bytes()
    }
}

impl Eq for ResourceRecord {}

impl Hash for ResourceRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.class.hash(state);
        self.record_type.to_u16().hash(state);
        self.data.to_wire_bytes().hash(state);
    }
}

impl fmt::Display for ResourceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}. {} {} {} {}",
            self.name, self.ttl, self.class, self.record_type, self.data
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::net::Ipv4Addr;

    fn a(name: &str, ip: [u8; 4], ttl: u32) -> ResourceRecord {
        ResourceRecord::new(
            name.parse().unwrap(),
            RecordType::A,
            ttl,
            RData::A(Ipv4Addr::from(ip)),
        )
    }

    #[test]
    fn test_equality_ignores_ttl_and_case() {
        let mut set = HashSet::new();
        set.insert(a("Host.lan", [10, 0, 0, 1], 60));
        assert!(set.contains(&a("host.LAN", [10, 0, 0, 1], 3600)));
        assert!(!set.contains(&a("host.lan", [10, 0, 0, 2], 60)));
    }

    #[test]
    fn test_expiry() {
        let mut rr = a("host.lan", [10, 0, 0, 1], 60);
        rr.created_at = 1_000;
        assert!(!rr.is_expired_at(1_060));
        assert!(rr.is_expired_at(1_061));
        assert_eq!(rr.remaining_ttl_at(1_030), 30);
        assert_eq!(rr.remaining_ttl_at(5_000), 0);
        rr.corrupted = true;
        assert!(rr.is_expired_at(1_000));
    }

    #[test]
    fn test_rdlength_mismatch_is_data_corruption() {
        let mut w = WireWriter::new();
        w.write_name(&"x".parse().unwrap(), false);
        w.write_u16(1);
        w.write_u16(1);
        w.write_u32(60);
        w.write_u16(5);
        w.write_bytes(&[1, 2, 3, 4, 5]);
        let bytes = w.into_bytes();
        let mut r = WireReader::new(&bytes);
        assert!(matches!(
            ResourceRecord::read(&mut r),
            Err(WireError::DataCorruption { .. })
        ));
    }

    #[test]
    fn test_write_read_preserves_record() {
        let rr = a("host.lan", [192, 168, 1, 5], 300);
        let mut w = WireWriter::new();
        rr.write(&mut w).unwrap();
        let bytes = w.into_bytes();
        let mut r = WireReader::new(&bytes);
        let back = ResourceRecord::read(&mut r).unwrap();
        assert_eq!(back, rr);
        assert_eq!(back.ttl, 300);
    }
}
