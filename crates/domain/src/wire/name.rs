use std::fmt;
use std::hash::{Hash, Hasher};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use std::sync::Arc;

use smallvec::SmallVec;

use super::error::WireError;

pub const MAX_LABEL_LEN: usize = 63;
pub const MAX_NAME_LEN: usize = 255;

/// An immutable, case-insensitive sequence of labels. The root name has no labels.
#[derive(Clone, Default)]
pub struct DomainName {
    labels: SmallVec<[Arc<[u8]>; 4]>,
}

impl DomainName {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn from_labels<I, L>(labels: I) -> Result<Self, WireError>
    where
        I: IntoIterator<Item = L>,
        L: AsRef<[u8]>,
    {
        let mut out: SmallVec<[Arc<[u8]>; 4]> = SmallVec::new();
        let mut wire_len = 1;
        for label in labels {
            let label = label.as_ref();
            if label.is_empty() {
                return Err(WireError::EmptyLabel);
            }
            if label.len() > MAX_LABEL_LEN {
                return Err(WireError::LabelTooLong(label.len()));
            }
            wire_len += label.len() + 1;
            if wire_len > MAX_NAME_LEN {
                return Err(WireError::NameTooLong(wire_len));
            }
            out.push(Arc::from(label));
        }
        Ok(Self { labels: out })
    }

    pub fn labels(&self) -> &[Arc<[u8]>] {
        &self.labels
    }

    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    pub fn is_root(&self) -> bool {
        self.labels.is_empty()
    }

    /// The name with the first `skip` labels removed.
    pub fn suffix(&self, skip: usize) -> DomainName {
        let skip = skip.min(self.labels.len());
        Self {
            labels: self.labels[skip..].iter().cloned().collect(),
        }
    }

    pub fn parent(&self) -> Option<DomainName> {
        if self.is_root() {
            None
        } else {
            Some(self.suffix(1))
        }
    }

    /// Appends `other` below this name: `www`.join(`example.com`) is `www.example.com`.
    pub fn join(&self, other: &DomainName) -> Result<DomainName, WireError> {
        Self::from_labels(self.labels.iter().chain(other.labels.iter()))
    }

    /// Prepends a single label.
    pub fn prepend(&self, label: &[u8]) -> Result<DomainName, WireError> {
        Self::from_labels(std::iter::once(label).chain(self.labels.iter().map(|l| &l[..])))
    }

    pub fn to_lowercase(&self) -> DomainName {
        Self {
            labels: self
                .labels
                .iter()
                .map(|l| Arc::from(l.to_ascii_lowercase().as_slice()))
                .collect(),
        }
    }

    /// True when this name lies strictly below `other`.
    pub fn is_subdomain_of(&self, other: &DomainName) -> bool {
        self.labels.len() > other.labels.len() && self.ends_with(other)
    }

    pub fn is_equal_or_subdomain_of(&self, other: &DomainName) -> bool {
        self.labels.len() >= other.labels.len() && self.ends_with(other)
    }

    fn ends_with(&self, other: &DomainName) -> bool {
        let offset = self.labels.len() - other.labels.len();
        self.labels[offset..]
            .iter()
            .zip(other.labels.iter())
            .all(|(a, b)| a.eq_ignore_ascii_case(b))
    }

    pub fn starts_with_label(&self, label: &str) -> bool {
        self.labels
            .first()
            .is_some_and(|l| l.eq_ignore_ascii_case(label.as_bytes()))
    }

    /// Uncompressed encoded length, including the terminating zero octet.
    pub fn wire_len(&self) -> usize {
        self.labels.iter().map(|l| l.len() + 1).sum::<usize>() + 1
    }

    pub fn is_reverse_zone(&self) -> bool {
        self.is_in_addr_arpa() || self.is_ip6_arpa()
    }

    pub fn is_in_addr_arpa(&self) -> bool {
        self.is_equal_or_subdomain_of(&IN_ADDR_ARPA)
    }

    pub fn is_ip6_arpa(&self) -> bool {
        self.is_equal_or_subdomain_of(&IP6_ARPA)
    }

    /// Builds the `in-addr.arpa` / `ip6.arpa` name used for PTR lookups of `ip`.
    pub fn reverse_lookup(ip: IpAddr) -> DomainName {
        let mut labels: SmallVec<[Arc<[u8]>; 4]> = SmallVec::new();
        match ip {
            IpAddr::V4(v4) => {
                for octet in v4.octets().iter().rev() {
                    labels.push(Arc::from(octet.to_string().as_bytes()));
                }
                labels.extend(IN_ADDR_ARPA.labels.iter().cloned());
            }
            IpAddr::V6(v6) => {
                for byte in v6.octets().iter().rev() {
                    for nibble in [byte & 0x0f, byte >> 4] {
                        labels.push(Arc::from(format!("{:x}", nibble).as_bytes()));
                    }
                }
                labels.extend(IP6_ARPA.labels.iter().cloned());
            }
        }
        Self { labels }
    }

    /// Inverse of [`DomainName::reverse_lookup`]. Returns `None` for partial
    /// or malformed reverse names.
    pub fn to_ip_from_arpa(&self) -> Option<IpAddr> {
        if self.is_in_addr_arpa() {
            let head = &self.labels[..self.labels.len() - IN_ADDR_ARPA.label_count()];
            if head.len() != 4 {
                return None;
            }
            let mut octets = [0u8; 4];
            for (i, label) in head.iter().rev().enumerate() {
                octets[i] = std::str::from_utf8(label).ok()?.parse().ok()?;
            }
            return Some(IpAddr::V4(Ipv4Addr::from(octets)));
        }
        if self.is_ip6_arpa() {
            let head = &self.labels[..self.labels.len() - IP6_ARPA.label_count()];
            if head.len() != 32 {
                return None;
            }
            let mut value: u128 = 0;
            for label in head.iter().rev() {
                if label.len() != 1 {
                    return None;
                }
                let nibble = (label[0] as char).to_digit(16)?;
                value = (value << 4) | nibble as u128;
            }
            return Some(IpAddr::V6(Ipv6Addr::from(value)));
        }
        None
    }
}

static IN_ADDR_ARPA: std::sync::LazyLock<DomainName> = std::sync::LazyLock::new(|| DomainName {
    labels: [&b"in-addr"[..], &b"arpa"[..]]
        .iter()
        .map(|l| Arc::from(*l))
        .collect(),
});

static IP6_ARPA: std::sync::LazyLock<DomainName> = std::sync::LazyLock::new(|| DomainName {
    labels: [&b"ip6"[..], &b"arpa"[..]]
        .iter()
        .map(|l| Arc::from(*l))
        .collect(),
});

impl PartialEq for DomainName {
    fn eq(&self, other: &Self) -> bool {
        self.labels.len() == other.labels.len()
            && self
                .labels
                .iter()
                .zip(other.labels.iter())
                .all(|(a, b)| a.eq_ignore_ascii_case(b))
    }
}

impl Eq for DomainName {}

impl Hash for DomainName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_usize(self.labels.len());
        for label in &self.labels {
            state.write_u8(label.len() as u8);
            for b in label.iter() {
                state.write_u8(b.to_ascii_lowercase());
            }
        }
    }
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return f.write_str(".");
        }
        for (i, label) in self.labels.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            for &b in label.iter() {
                match b {
                    b'.' | b'\\' => write!(f, "\\{}", b as char)?,
                    0x21..=0x7e => write!(f, "{}", b as char)?,
                    _ => write!(f, "\\{:03}", b)?,
                }
            }
        }
        Ok(())
    }
}

impl fmt::Debug for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DomainName({})", self)
    }
}

impl FromStr for DomainName {
    type Err = WireError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s == "." {
            return Ok(Self::root());
        }

        let mut labels: Vec<Vec<u8>> = Vec::new();
        let mut current = Vec::new();
        let bytes = s.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'\\' => {
                    let rest = &bytes[i + 1..];
                    match rest {
                        [d0, d1, d2, ..]
                            if d0.is_ascii_digit() && d1.is_ascii_digit() && d2.is_ascii_digit() =>
                        {
                            let value = (d0 - b'0') as u16 * 100
                                + (d1 - b'0') as u16 * 10
                                + (d2 - b'0') as u16;
                            if value > 255 {
                                return Err(WireError::InvalidEscape(s.to_string()));
                            }
                            current.push(value as u8);
                            i += 4;
                        }
                        [c, ..] => {
                            current.push(*c);
                            i += 2;
                        }
                        [] => return Err(WireError::InvalidEscape(s.to_string())),
                    }
                }
                b'.' => {
                    labels.push(std::mem::take(&mut current));
                    i += 1;
                }
                b => {
                    current.push(b);
                    i += 1;
                }
            }
        }
        // A trailing dot marks a fully-qualified name and leaves `current` empty.
        if !current.is_empty() {
            labels.push(current);
        }
        Self::from_labels(labels)
    }
}
