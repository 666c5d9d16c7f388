pub mod answer_cache;
pub mod block_filter;
pub mod connectivity;
pub mod forwarding;
pub mod server;
pub mod transport;

pub use answer_cache::MemoryAnswerCache;
pub use block_filter::{BlockFilterEngine, BlockFilterSettings, HttpListFetcher};
pub use connectivity::TcpConnectivityProbe;
pub use forwarding::{ClassicUpstream, UpstreamForwarder};
pub use server::{TcpResponseChannel, UdpResponseChannel};
