pub mod forwarder;

pub use forwarder::{ClassicUpstream, UpstreamForwarder};
