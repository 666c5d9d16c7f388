use std::collections::HashMap;
use std::sync::Arc;

use super::error::WireError;
use super::name::DomainName;

/// Upper bound on pointer hops while decoding a single name.
pub const MAX_COMPRESSION_HOPS: usize = 128;

/// Highest offset a 14-bit compression pointer can address.
pub const MAX_POINTER_OFFSET: usize = 0x3FFF;

const POINTER_MASK: u8 = 0xC0;

/// Cursor over a received packet. Names already decoded are remembered by
/// the offset each of their labels started at, so later pointers into them
/// resolve without walking the chain again.
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
    name_cache: HashMap<usize, DomainName>,
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            name_cache: HashMap::new(),
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    fn need(&self, at: usize, n: usize) -> Result<(), WireError> {
        if at + n > self.buf.len() {
            Err(WireError::UnexpectedEnd {
                offset: at,
                needed: n,
            })
        } else {
            Ok(())
        }
    }

    pub fn read_u8(&mut self) -> Result<u8, WireError> {
        self.need(self.pos, 1)?;
        let v = self.buf[self.pos];
        self.pos += 1;
        Ok(v)
    }

    pub fn read_u16(&mut self) -> Result<u16, WireError> {
        self.need(self.pos, 2)?;
        let v = u16::from_be_bytes([self.buf[self.pos], self.buf[self.pos + 1]]);
        self.pos += 2;
        Ok(v)
    }

    pub fn read_u32(&mut self) -> Result<u32, WireError> {
        self.need(self.pos, 4)?;
        let b = &self.buf[self.pos..self.pos + 4];
        self.pos += 4;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], WireError> {
        self.need(self.pos, n)?;
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    /// Reads a single length-prefixed character string.
    pub fn read_character_string(&mut self) -> Result<&'a [u8], WireError> {
        let len = self.read_u8()? as usize;
        self.read_bytes(len)
    }

    pub fn read_name(&mut self) -> Result<DomainName, WireError> {
        let mut labels: Vec<&'a [u8]> = Vec::new();
        let mut offsets: Vec<usize> = Vec::new();
        let mut tail: Option<DomainName> = None;
        let mut cursor = self.pos;
        let mut jumped = false;
        let mut hops = 0;

        loop {
            self.need(cursor, 1)?;
            let len = self.buf[cursor];
            match len & POINTER_MASK {
                0x00 => {
                    if len == 0 {
                        if !jumped {
                            self.pos = cursor + 1;
                        }
                        break;
                    }
                    let start = cursor + 1;
                    self.need(start, len as usize)?;
                    offsets.push(cursor);
                    labels.push(&self.buf[start..start + len as usize]);
                    cursor = start + len as usize;
                }
                POINTER_MASK => {
                    self.need(cursor, 2)?;
                    let target = (((len & !POINTER_MASK) as usize) << 8) | self.buf[cursor + 1] as usize;
                    if !jumped {
                        self.pos = cursor + 2;
                        jumped = true;
                    }
                    hops += 1;
                    // Pointers may only refer to data earlier in the packet.
                    if hops > MAX_COMPRESSION_HOPS || target >= cursor {
                        return Err(WireError::PointerLoop(cursor));
                    }
                    if let Some(cached) = self.name_cache.get(&target) {
                        tail = Some(cached.clone());
                        break;
                    }
                    cursor = target;
                }
                _ => return Err(WireError::InvalidLabelType(len)),
            }
        }

        let name = match tail {
            Some(tail) => DomainName::from_labels(
                labels
                    .iter()
                    .copied()
                    .chain(tail.labels().iter().map(|l| &l[..])),
            )?,
            None => DomainName::from_labels(labels.iter().copied())?,
        };

        for (i, offset) in offsets.into_iter().enumerate() {
            self.name_cache.entry(offset).or_insert_with(|| name.suffix(i));
        }
        Ok(name)
    }
}

/// Output buffer with a name-suffix dictionary for compression.
#[derive(Default)]
pub struct WireWriter {
    buf: Vec<u8>,
    names: HashMap<DomainName, u16>,
}

impl WireWriter {
    pub fn new() -> Self {
        Self::with_capacity(512)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            names: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn write_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_character_string(&mut self, bytes: &[u8]) -> Result<(), WireError> {
        if bytes.len() > u8::MAX as usize {
            return Err(WireError::InvalidData(format!(
                "character string of {} bytes",
                bytes.len()
            )));
        }
        self.write_u8(bytes.len() as u8);
        self.write_bytes(bytes);
        Ok(())
    }

    pub fn patch_u16(&mut self, at: usize, v: u16) {
        self.buf[at..at + 2].copy_from_slice(&v.to_be_bytes());
    }

    /// Writes `name`, replacing the longest suffix already in the packet with
    /// a pointer when `compress` is set. Every suffix written at a pointer
    /// addressable offset becomes available to later names either way.
    pub fn write_name(&mut self, name: &DomainName, compress: bool) {
        for i in 0..name.label_count() {
            let suffix = name.suffix(i);
            if compress {
                if let Some(&offset) = self.names.get(&suffix) {
                    self.write_u16(0xC000 | offset);
                    return;
                }
            }
            let here = self.buf.len();
            if here <= MAX_POINTER_OFFSET {
                self.names.entry(suffix).or_insert(here as u16);
            }
            let label: &Arc<[u8]> = &name.labels()[i];
            self.write_u8(label.len() as u8);
            self.write_bytes(label);
        }
        self.write_u8(0);
    }

    /// Reserves a 16-bit length slot and returns its position.
    pub fn begin_length(&mut self) -> usize {
        let at = self.buf.len();
        self.write_u16(0);
        at
    }

    /// Fills the slot reserved by [`WireWriter::begin_length`] with the
    /// number of bytes written since.
    pub fn end_length(&mut self, at: usize) -> Result<(), WireError> {
        let len = self.buf.len() - at - 2;
        let len16 = u16::try_from(len).map_err(|_| WireError::MessageTooLarge(len))?;
        self.patch_u16(at, len16);
        Ok(())
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}
