use crate::dns::transport::tcp::send_with_length_prefix;
use async_trait::async_trait;
use sinkhole_dns_application::ports::{ResponseChannel, Transport};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::UdpSocket;
use tokio::sync::Mutex;

/// Replies to a datagram through the listening socket it arrived on.
pub struct UdpResponseChannel {
    socket: Arc<UdpSocket>,
    peer: SocketAddr,
}

impl UdpResponseChannel {
    pub fn new(socket: Arc<UdpSocket>, peer: SocketAddr) -> Self {
        Self { socket, peer }
    }
}

#[async_trait]
impl ResponseChannel for UdpResponseChannel {
    fn transport(&self) -> Transport {
        Transport::Udp
    }

    fn peer(&self) -> SocketAddr {
        self.peer
    }

    async fn send(&self, bytes: &[u8]) -> std::io::Result<()> {
        self.socket.send_to(bytes, self.peer).await.map(|_| ())
    }
}

/// Replies on an accepted TCP connection. Several queries on one connection
/// may answer concurrently, so writes are serialized.
pub struct TcpResponseChannel {
    writer: Arc<Mutex<OwnedWriteHalf>>,
    peer: SocketAddr,
}

impl TcpResponseChannel {
    pub fn new(writer: Arc<Mutex<OwnedWriteHalf>>, peer: SocketAddr) -> Self {
        Self { writer, peer }
    }
}

#[async_trait]
impl ResponseChannel for TcpResponseChannel {
    fn transport(&self) -> Transport {
        Transport::Tcp
    }

    fn peer(&self) -> SocketAddr {
        self.peer
    }

    async fn send(&self, bytes: &[u8]) -> std::io::Result<()> {
        let mut writer = self.writer.lock().await;
        send_with_length_prefix(&mut *writer, bytes).await
    }
}
