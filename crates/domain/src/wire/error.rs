use thiserror::Error;

/// Failures raised while reading or writing the binary message format.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("Unexpected end of packet at offset {offset} (needed {needed} bytes)")]
    UnexpectedEnd { offset: usize, needed: usize },

    #[error("Label exceeds 63 octets ({0})")]
    LabelTooLong(usize),

    #[error("Empty label in domain name")]
    EmptyLabel,

    #[error("Domain name exceeds 255 octets ({0})")]
    NameTooLong(usize),

    #[error("Compression pointer loop at offset {0}")]
    PointerLoop(usize),

    #[error("Invalid label type 0x{0:02x}")]
    InvalidLabelType(u8),

    #[error("Record data corrupted: expected to end at {expected}, ended at {actual}")]
    DataCorruption { expected: usize, actual: usize },

    #[error("Invalid escape sequence in name: {0}")]
    InvalidEscape(String),

    #[error("Message too large for the wire format ({0} bytes)")]
    MessageTooLarge(usize),

    #[error("EDNS option exceeds 65535 bytes ({0})")]
    OptionTooLong(usize),

    #[error("Invalid record data: {0}")]
    InvalidData(String),
}
