//! Binary DNS message format.

pub mod codec;
pub mod edns;
pub mod error;
pub mod header;
pub mod message;
pub mod name;
pub mod rdata;
pub mod record;
pub mod record_type;
pub mod registry;

pub use codec::{WireReader, WireWriter};
pub use edns::{Edns, EdnsFlags, EdnsOption};
pub use error::WireError;
pub use header::{Header, ResponseCode};
pub use message::{Message, Question, ResolveType};
pub use name::DomainName;
pub use rdata::RData;
pub use record::ResourceRecord;
pub use record_type::{RecordClass, RecordType};
