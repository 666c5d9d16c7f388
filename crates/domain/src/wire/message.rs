use std::fmt;

use tracing::warn;

use super::codec::{WireReader, WireWriter};
use super::edns::{Edns, EdnsFlags, MIN_UDP_PAYLOAD};
use super::error::WireError;
use super::header::{Header, ResponseCode};
use super::name::DomainName;
use super::rdata::RData;
use super::record::ResourceRecord;
use super::record_type::{RecordClass, RecordType};

/// Some senders emit a question count that is off by exactly 256. Packets
/// carrying this count are parsed best-effort and flagged instead of trusted.
pub const CORRUPTED_QUESTION_COUNT: u16 = 256;

/// Largest operation code representable with the OPT overlay.
pub const MAX_OPCODE: u16 = 0x0FFF;

/// How the answer in a message was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResolveType {
    #[default]
    None,
    ClientBlocked,
    Blocked,
    Authoritative,
    Cache,
    Arpa,
    DoH,
    Classic,
    Failed,
}

impl ResolveType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolveType::None => "none",
            ResolveType::ClientBlocked => "client_blocked",
            ResolveType::Blocked => "blocked",
            ResolveType::Authoritative => "authoritative",
            ResolveType::Cache => "cache",
            ResolveType::Arpa => "arpa",
            ResolveType::DoH => "doh",
            ResolveType::Classic => "classic",
            ResolveType::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "none" => Some(ResolveType::None),
            "client_blocked" => Some(ResolveType::ClientBlocked),
            "blocked" => Some(ResolveType::Blocked),
            "authoritative" => Some(ResolveType::Authoritative),
            "cache" => Some(ResolveType::Cache),
            "arpa" => Some(ResolveType::Arpa),
            "doh" => Some(ResolveType::DoH),
            "classic" => Some(ResolveType::Classic),
            "failed" => Some(ResolveType::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for ResolveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Question {
    pub name: DomainName,
    pub qtype: RecordType,
    pub qclass: RecordClass,
}

impl Question {
    pub fn new(name: DomainName, qtype: RecordType) -> Self {
        Self {
            name,
            qtype,
            qclass: RecordClass::IN,
        }
    }

    pub fn read(reader: &mut WireReader<'_>) -> Result<Self, WireError> {
        Ok(Self {
            name: reader.read_name()?,
            qtype: RecordType::from_u16(reader.read_u16()?),
            qclass: RecordClass(reader.read_u16()?),
        })
    }

    pub fn write(&self, writer: &mut WireWriter) {
        writer.write_name(&self.name, true);
        writer.write_u16(self.qtype.to_u16());
        writer.write_u16(self.qclass.0);
    }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.name, self.qclass, self.qtype)
    }
}

/// One DNS packet plus the per-request annotations the resolver attaches.
#[derive(Debug, Clone, Default)]
pub struct Message {
    pub header: Header,
    pub questions: Vec<Question>,
    pub answers: Vec<ResourceRecord>,
    pub authority_records: Vec<ResourceRecord>,
    pub additional_records: Vec<ResourceRecord>,
    pub is_from_cache: bool,
    pub is_blocked: bool,
    pub resolve_type: ResolveType,
    pub has_packet_error: bool,
}

impl Message {
    pub fn query(id: u16, question: Question) -> Self {
        let mut msg = Message {
            questions: vec![question],
            ..Default::default()
        };
        msg.header.id = id;
        msg.header.recursion_desired = true;
        msg
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, WireError> {
        let mut reader = WireReader::new(bytes);
        let header = Header::read(&mut reader)?;
        let mut msg = Message {
            header,
            ..Default::default()
        };

        if msg.header.qd_count == CORRUPTED_QUESTION_COUNT {
            warn!(
                header = %msg.header,
                size = bytes.len(),
                "Packet reports 256 questions, treating as corrupted"
            );
            msg.has_packet_error = true;
            // Whatever parses is kept for diagnostics only.
            let _ = msg.read_sections(&mut reader);
            for rr in msg.records_mut() {
                rr.corrupted = true;
            }
            return Ok(msg);
        }

        msg.read_sections(&mut reader)?;
        Ok(msg)
    }

    fn read_sections(&mut self, reader: &mut WireReader<'_>) -> Result<(), WireError> {
        for _ in 0..self.header.qd_count {
            self.questions.push(Question::read(reader)?);
        }
        for _ in 0..self.header.an_count {
            self.answers.push(ResourceRecord::read(reader)?);
        }
        for _ in 0..self.header.ns_count {
            self.authority_records.push(ResourceRecord::read(reader)?);
        }
        for _ in 0..self.header.ar_count {
            self.additional_records.push(ResourceRecord::read(reader)?);
        }
        Ok(())
    }

    fn records_mut(&mut self) -> impl Iterator<Item = &mut ResourceRecord> {
        self.answers
            .iter_mut()
            .chain(self.authority_records.iter_mut())
            .chain(self.additional_records.iter_mut())
    }

    fn section_counts(&self) -> Result<[u16; 4], WireError> {
        let mut counts = [0u16; 4];
        for (slot, len) in counts.iter_mut().zip([
            self.questions.len(),
            self.answers.len(),
            self.authority_records.len(),
            self.additional_records.len(),
        ]) {
            *slot = u16::try_from(len).map_err(|_| WireError::MessageTooLarge(len))?;
        }
        Ok(counts)
    }

    /// Serializes the message. Section counts come from the live sections.
    pub fn encode(&self) -> Result<Vec<u8>, WireError> {
        let mut writer = WireWriter::new();
        self.header.write(&mut writer, self.section_counts()?);
        for q in &self.questions {
            q.write(&mut writer);
        }
        for rr in self
            .answers
            .iter()
            .chain(self.authority_records.iter())
            .chain(self.additional_records.iter())
        {
            rr.write(&mut writer)?;
        }
        Ok(writer.into_bytes())
    }

    /// Drops additional, then authority records from the end until the
    /// message fits in `max_bytes`. If both sections are exhausted and it
    /// still does not fit, sets TC and trims answers as well. The OPT record
    /// goes last, so a truncated reply still carries EDNS.
    pub fn truncate(&mut self, max_bytes: usize) -> Result<(), WireError> {
        let mut len = self.encode()?.len();
        while len > max_bytes {
            if !self.pop_additional_keeping_opt() && self.authority_records.pop().is_none() {
                self.header.truncated = true;
                if self.answers.pop().is_none() && self.additional_records.pop().is_none() {
                    break;
                }
            }
            len = self.encode()?.len();
        }
        Ok(())
    }

    fn pop_additional_keeping_opt(&mut self) -> bool {
        match self
            .additional_records
            .iter()
            .rposition(|rr| rr.record_type != RecordType::OPT)
        {
            Some(idx) => {
                self.additional_records.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn rcode(&self) -> ResponseCode {
        ResponseCode::from_u8(self.header.rcode)
    }

    pub fn set_rcode(&mut self, rcode: ResponseCode) {
        self.header.rcode = rcode.to_u8() & 0x0F;
    }

    pub fn opt_record(&self) -> Option<&ResourceRecord> {
        self.additional_records
            .iter()
            .find(|rr| rr.record_type == RecordType::OPT)
    }

    /// Returns the single OPT record, creating it or discarding extra ones.
    fn ensure_opt(&mut self) -> &mut ResourceRecord {
        let mut seen = false;
        self.additional_records.retain(|rr| {
            if rr.record_type != RecordType::OPT {
                return true;
            }
            let keep = !seen;
            seen = true;
            keep
        });
        let idx = match self
            .additional_records
            .iter()
            .position(|rr| rr.record_type == RecordType::OPT)
        {
            Some(idx) => idx,
            None => {
                self.additional_records.push(opt_record(&Edns::default()));
                self.additional_records.len() - 1
            }
        };
        &mut self.additional_records[idx]
    }

    pub fn edns(&self) -> Option<Edns> {
        self.opt_record().map(|rr| Edns {
            payload_size: rr.class.0,
            flags: EdnsFlags::read(rr.ttl),
            options: match &rr.data {
                RData::OPT(options) => options.clone(),
                _ => Vec::new(),
            },
        })
    }

    pub fn set_edns(&mut self, edns: Option<Edns>) {
        self.additional_records
            .retain(|rr| rr.record_type != RecordType::OPT);
        if let Some(edns) = edns {
            self.additional_records.push(opt_record(&edns));
        }
    }

    /// Full operation code: header nibble plus the OPT high byte.
    pub fn opcode(&self) -> u16 {
        let ext = self
            .opt_record()
            .map(|rr| EdnsFlags::read(rr.ttl).extended_opcode)
            .unwrap_or(0);
        ((ext as u16) << 4) | (self.header.opcode as u16 & 0x0F)
    }

    pub fn set_opcode(&mut self, opcode: u16) -> Result<(), WireError> {
        if opcode > MAX_OPCODE {
            return Err(WireError::InvalidData(format!("opcode {} out of range", opcode)));
        }
        self.header.opcode = (opcode & 0x0F) as u8;
        let ext = (opcode >> 4) as u8;
        if ext == 0 && self.opt_record().is_none() {
            return Ok(());
        }
        let opt = self.ensure_opt();
        let mut flags = EdnsFlags::read(opt.ttl);
        flags.extended_opcode = ext;
        opt.ttl = flags.write(opt.ttl);
        Ok(())
    }

    /// Response skeleton: id, opcode, RD, CD, questions and EDNS copied, QR set.
    pub fn create_response(&self) -> Message {
        let mut response = Message {
            header: Header {
                id: self.header.id,
                is_response: true,
                opcode: self.header.opcode,
                recursion_desired: self.header.recursion_desired,
                recursion_available: true,
                checking_disabled: self.header.checking_disabled,
                ..Default::default()
            },
            questions: self.questions.clone(),
            ..Default::default()
        };
        if let Some(edns) = self.edns() {
            response.set_edns(Some(Edns {
                payload_size: super::edns::DEFAULT_EDNS_PAYLOAD,
                flags: edns.flags,
                options: Vec::new(),
            }));
        }
        response
    }

    /// Largest UDP response the sender accepts.
    pub fn max_udp_payload(&self, fallback: u16) -> usize {
        match self.edns() {
            Some(edns) => edns.payload_size.max(MIN_UDP_PAYLOAD) as usize,
            None => fallback.max(MIN_UDP_PAYLOAD) as usize,
        }
    }

    pub fn min_answer_ttl(&self) -> Option<u32> {
        self.answers.iter().map(|rr| rr.ttl).min()
    }

    pub fn first_question(&self) -> Option<&Question> {
        self.questions.first()
    }
}

fn opt_record(edns: &Edns) -> ResourceRecord {
    ResourceRecord::new(
        DomainName::root(),
        RecordType::OPT,
        edns.flags.write(0),
        RData::OPT(edns.options.clone()),
    )
    .with_class(RecordClass(edns.payload_size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn name(s: &str) -> DomainName {
        s.parse().unwrap()
    }

    fn a(owner: &str, last: u8) -> ResourceRecord {
        ResourceRecord::new(
            name(owner),
            RecordType::A,
            300,
            RData::A(Ipv4Addr::new(10, 0, 0, last)),
        )
    }

    fn ns(owner: &str, target: &str) -> ResourceRecord {
        ResourceRecord::new(name(owner), RecordType::NS, 300, RData::NS(name(target)))
    }

    fn sample() -> Message {
        let mut msg = Message::query(0x1234, Question::new(name("www.example.com"), RecordType::A))
            .create_response();
        msg.answers.push(a("www.example.com", 1));
        for i in 0..6 {
            msg.authority_records
                .push(ns("example.com", &format!("ns{}.example.com", i)));
            msg.additional_records
                .push(a(&format!("ns{}.example.com", i), i as u8));
        }
        msg
    }

    #[test]
    fn test_encode_recomputes_counts() {
        let mut msg = sample();
        msg.header.an_count = 99;
        let decoded = Message::decode(&msg.encode().unwrap()).unwrap();
        assert_eq!(decoded.header.an_count, 1);
        assert_eq!(decoded.header.ns_count, 6);
        assert_eq!(decoded.header.ar_count, 6);
        assert_eq!(decoded.answers, msg.answers);
        assert!(decoded.header.is_response);
    }

    #[test]
    fn test_question_count_256_is_flagged_not_fatal() {
        let mut bytes = Message::query(7, Question::new(name("a.test"), RecordType::A))
            .encode()
            .unwrap();
        bytes[4] = 0x01;
        bytes[5] = 0x00;
        let msg = Message::decode(&bytes).unwrap();
        assert!(msg.has_packet_error);
        assert_eq!(msg.questions.len(), 1);
    }

    #[test]
    fn test_truncate_is_noop_when_it_fits() {
        let mut msg = sample();
        let size = msg.encode().unwrap().len();
        msg.truncate(size).unwrap();
        assert_eq!(msg.additional_records.len(), 6);
        assert!(!msg.header.truncated);
    }

    #[test]
    fn test_truncate_drops_additional_before_authority() {
        let mut msg = sample();
        let full = msg.encode().unwrap().len();
        msg.truncate(full - 1).unwrap();
        assert_eq!(msg.additional_records.len(), 5);
        assert_eq!(msg.authority_records.len(), 6);
        assert!(!msg.header.truncated);
        assert!(msg.encode().unwrap().len() < full);
    }

    #[test]
    fn test_truncate_sets_tc_only_when_sections_exhausted() {
        let mut msg = sample();
        let mut bare = msg.clone();
        bare.authority_records.clear();
        bare.additional_records.clear();
        let bare_len = bare.encode().unwrap().len();

        msg.truncate(bare_len).unwrap();
        assert!(!msg.header.truncated);
        assert!(msg.authority_records.is_empty());

        let mut msg = sample();
        msg.truncate(bare_len - 1).unwrap();
        assert!(msg.header.truncated);
        assert!(msg.encode().unwrap().len() <= bare_len - 1);
    }

    #[test]
    fn test_truncate_keeps_opt_until_answers_are_gone() {
        let mut msg = sample();
        msg.set_edns(Some(Edns {
            payload_size: 1232,
            flags: EdnsFlags::default(),
            options: Vec::new(),
        }));
        msg.additional_records.rotate_right(1);
        assert_eq!(msg.additional_records[0].record_type, RecordType::OPT);

        let mut bare = msg.clone();
        bare.authority_records.clear();
        bare.additional_records
            .retain(|rr| rr.record_type == RecordType::OPT);
        let bare_len = bare.encode().unwrap().len();

        msg.truncate(bare_len).unwrap();
        assert!(!msg.header.truncated);
        assert!(msg.authority_records.is_empty());
        assert_eq!(msg.additional_records.len(), 1);
        assert_eq!(msg.edns().map(|e| e.payload_size), Some(1232));

        let mut msg = bare.clone();
        msg.truncate(bare_len - 1).unwrap();
        assert!(msg.header.truncated);
        assert!(msg.answers.is_empty());
        assert!(msg.opt_record().is_some());
    }

    #[test]
    fn test_extended_opcode_lives_in_opt_ttl() {
        let mut msg = Message::query(1, Question::new(name("x.test"), RecordType::A));
        msg.set_opcode(2).unwrap();
        assert!(msg.opt_record().is_none());
        assert_eq!(msg.opcode(), 2);

        msg.set_opcode(0xFF3).unwrap();
        assert_eq!(msg.header.opcode, 3);
        assert_eq!(msg.opcode(), 0xFF3);
        let decoded = Message::decode(&msg.encode().unwrap()).unwrap();
        assert_eq!(decoded.opcode(), 0xFF3);
        assert_eq!(
            decoded
                .additional_records
                .iter()
                .filter(|rr| rr.record_type == RecordType::OPT)
                .count(),
            1
        );
        assert!(msg.set_opcode(0x1000).is_err());
    }

    #[test]
    fn test_response_copies_edns_and_questions() {
        let mut query = Message::query(9, Question::new(name("x.test"), RecordType::AAAA));
        query.set_edns(Some(Edns {
            payload_size: 4096,
            flags: EdnsFlags {
                dnssec_ok: true,
                ..Default::default()
            },
            options: Vec::new(),
        }));
        assert_eq!(query.max_udp_payload(512), 4096);

        let response = query.create_response();
        assert_eq!(response.header.id, 9);
        assert!(response.header.is_response);
        assert!(response.header.recursion_desired);
        assert_eq!(response.questions, query.questions);
        assert!(response.edns().unwrap().flags.dnssec_ok);
    }

    #[test]
    fn test_min_answer_ttl() {
        let mut msg = sample();
        assert_eq!(msg.min_answer_ttl(), Some(300));
        msg.answers[0].ttl = 20;
        msg.answers.push(a("www.example.com", 9));
        assert_eq!(msg.min_answer_ttl(), Some(20));
    }
}
