//! EDNS(0) OPT pseudo-record support.
//!
//! The OPT record reuses the class field for the advertised UDP payload
//! size and the TTL field for the extended opcode byte, the EDNS version and
//! the DO bit.

use super::codec::{WireReader, WireWriter};
use super::error::WireError;

pub const DEFAULT_EDNS_PAYLOAD: u16 = 1232;
pub const MIN_UDP_PAYLOAD: u16 = 512;

const EXT_OPCODE_SHIFT: u32 = 24;
const VERSION_SHIFT: u32 = 16;
const DO_BIT: u32 = 1 << 15;
const OVERLAY_MASK: u32 = 0xFFFF_8000;

/// Values carried in the OPT record TTL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct EdnsFlags {
    /// High byte of the operation code; the header holds the low nibble.
    pub extended_opcode: u8,
    pub version: u8,
    pub dnssec_ok: bool,
}

impl EdnsFlags {
    pub fn read(ttl: u32) -> Self {
        Self {
            extended_opcode: (ttl >> EXT_OPCODE_SHIFT) as u8,
            version: (ttl >> VERSION_SHIFT) as u8,
            dnssec_ok: ttl & DO_BIT != 0,
        }
    }

    /// Overlays these flags onto `ttl`, leaving the low 15 bits untouched.
    pub fn write(&self, ttl: u32) -> u32 {
        let mut bits = ((self.extended_opcode as u32) << EXT_OPCODE_SHIFT)
            | ((self.version as u32) << VERSION_SHIFT);
        if self.dnssec_ok {
            bits |= DO_BIT;
        }
        (ttl & !OVERLAY_MASK) | bits
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EdnsOption {
    pub code: u16,
    pub data: Box<[u8]>,
}

pub(crate) fn read_options(
    reader: &mut WireReader<'_>,
    len: usize,
) -> Result<Vec<EdnsOption>, WireError> {
    let end = reader.position() + len;
    let mut options = Vec::new();
    while reader.position() < end {
        let code = reader.read_u16()?;
        let opt_len = reader.read_u16()? as usize;
        let data = reader.read_bytes(opt_len)?;
        options.push(EdnsOption {
            code,
            data: data.into(),
        });
    }
    Ok(options)
}

pub(crate) fn write_options(
    writer: &mut WireWriter,
    options: &[EdnsOption],
) -> Result<(), WireError> {
    for option in options {
        let len = u16::try_from(option.data.len())
            .map_err(|_| WireError::OptionTooLong(option.data.len()))?;
        writer.write_u16(option.code);
        writer.write_u16(len);
        writer.write_bytes(&option.data);
    }
    Ok(())
}

/// Typed view of an OPT record, used when building responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edns {
    pub payload_size: u16,
    pub flags: EdnsFlags,
    pub options: Vec<EdnsOption>,
}

impl Default for Edns {
    fn default() -> Self {
        Self {
            payload_size: DEFAULT_EDNS_PAYLOAD,
            flags: EdnsFlags::default(),
            options: Vec::new(),
        }
    }
}
