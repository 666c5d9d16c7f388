use async_trait::async_trait;
use std::fmt;
use std::net::SocketAddr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Udp,
    Tcp,
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Udp => f.write_str("UDP"),
            Transport::Tcp => f.write_str("TCP"),
        }
    }
}

/// The way back to the client a query arrived from.
#[async_trait]
pub trait ResponseChannel: Send + Sync {
    fn transport(&self) -> Transport;

    fn peer(&self) -> SocketAddr;

    async fn send(&self, bytes: &[u8]) -> std::io::Result<()>;
}
