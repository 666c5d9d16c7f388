use std::fmt;

use super::codec::{WireReader, WireWriter};
use super::error::WireError;

pub const HEADER_LEN: usize = 12;

const QR: u16 = 1 << 15;
const AA: u16 = 1 << 10;
const TC: u16 = 1 << 9;
const RD: u16 = 1 << 8;
const RA: u16 = 1 << 7;
const Z: u16 = 1 << 6;
const AD: u16 = 1 << 5;
const CD: u16 = 1 << 4;

/// The fixed 12-byte message header.
///
/// Section counts are kept as they appeared on the wire so diagnostics can
/// report them; encoding always recomputes them from the message sections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Header {
    pub id: u16,
    pub is_response: bool,
    /// Low four bits of the operation code.
    pub opcode: u8,
    pub authoritative: bool,
    pub truncated: bool,
    pub recursion_desired: bool,
    pub recursion_available: bool,
    pub z: bool,
    pub authentic_data: bool,
    pub checking_disabled: bool,
    /// Low four bits of the response code.
    pub rcode: u8,
    pub qd_count: u16,
    pub an_count: u16,
    pub ns_count: u16,
    pub ar_count: u16,
}

impl Header {
    pub fn flags(&self) -> u16 {
        let mut flags = ((self.opcode as u16 & 0x0F) << 11) | (self.rcode as u16 & 0x0F);
        for (set, bit) in [
            (self.is_response, QR),
            (self.authoritative, AA),
            (self.truncated, TC),
            (self.recursion_desired, RD),
            (self.recursion_available, RA),
            (self.z, Z),
            (self.authentic_data, AD),
            (self.checking_disabled, CD),
        ] {
            if set {
                flags |= bit;
            }
        }
        flags
    }

    pub fn set_flags(&mut self, flags: u16) {
        self.is_response = flags & QR != 0;
        self.opcode = ((flags >> 11) & 0x0F) as u8;
        self.authoritative = flags & AA != 0;
        self.truncated = flags & TC != 0;
        self.recursion_desired = flags & RD != 0;
        self.recursion_available = flags & RA != 0;
        self.z = flags & Z != 0;
        self.authentic_data = flags & AD != 0;
        self.checking_disabled = flags & CD != 0;
        self.rcode = (flags & 0x0F) as u8;
    }

    pub fn read(reader: &mut WireReader<'_>) -> Result<Self, WireError> {
        let mut header = Header {
            id: reader.read_u16()?,
            ..Default::default()
        };
        header.set_flags(reader.read_u16()?);
        header.qd_count = reader.read_u16()?;
        header.an_count = reader.read_u16()?;
        header.ns_count = reader.read_u16()?;
        header.ar_count = reader.read_u16()?;
        Ok(header)
    }

    pub fn write(&self, writer: &mut WireWriter, counts: [u16; 4]) {
        writer.write_u16(self.id);
        writer.write_u16(self.flags());
        for count in counts {
            writer.write_u16(count);
        }
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "id={} flags=0x{:04x} qr={} opcode={} aa={} tc={} rd={} ra={} rcode={} qd={} an={} ns={} ar={}",
            self.id,
            self.flags(),
            self.is_response,
            self.opcode,
            self.authoritative,
            self.truncated,
            self.recursion_desired,
            self.recursion_available,
            self.rcode,
            self.qd_count,
            self.an_count,
            self.ns_count,
            self.ar_count
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseCode {
    NoError,
    FormErr,
    ServFail,
    NxDomain,
    NotImp,
    Refused,
    YxDomain,
    YxRrSet,
    NxRrSet,
    NotAuth,
    NotZone,
    Unknown(u8),
}

impl ResponseCode {
    pub fn from_u8(code: u8) -> Self {
        match code {
            0 => Self::NoError,
            1 => Self::FormErr,
            2 => Self::ServFail,
            3 => Self::NxDomain,
            4 => Self::NotImp,
            5 => Self::Refused,
            6 => Self::YxDomain,
            7 => Self::YxRrSet,
            8 => Self::NxRrSet,
            9 => Self::NotAuth,
            10 => Self::NotZone,
            other => Self::Unknown(other),
        }
    }

    pub fn to_u8(self) -> u8 {
        match self {
            Self::NoError => 0,
            Self::FormErr => 1,
            Self::ServFail => 2,
            Self::NxDomain => 3,
            Self::NotImp => 4,
            Self::Refused => 5,
            Self::YxDomain => 6,
            Self::YxRrSet => 7,
            Self::NxRrSet => 8,
            Self::NotAuth => 9,
            Self::NotZone => 10,
            Self::Unknown(other) => other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoError => "NOERROR",
            Self::FormErr => "FORMERR",
            Self::ServFail => "SERVFAIL",
            Self::NxDomain => "NXDOMAIN",
            Self::NotImp => "NOTIMP",
            Self::Refused => "REFUSED",
            Self::YxDomain => "YXDOMAIN",
            Self::YxRrSet => "YXRRSET",
            Self::NxRrSet => "NXRRSET",
            Self::NotAuth => "NOTAUTH",
            Self::NotZone => "NOTZONE",
            Self::Unknown(_) => "UNKNOWN",
        }
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
