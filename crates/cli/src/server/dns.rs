use sinkhole_dns_application::use_cases::HandleDnsQueryUseCase;
use sinkhole_dns_infrastructure::dns::transport::tcp::read_framed;
use sinkhole_dns_infrastructure::dns::{TcpResponseChannel, UdpResponseChannel};
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const RECV_BUFFER_SIZE: usize = 4096;

/// Binds UDP and TCP on every address and serves until `shutdown` fires.
pub async fn start_dns_server(
    addresses: Vec<IpAddr>,
    port: u16,
    handler: Arc<HandleDnsQueryUseCase>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let mut join_set: JoinSet<()> = JoinSet::new();

    for ip in addresses {
        let socket_addr = SocketAddr::new(ip, port);
        let domain = if socket_addr.is_ipv4() {
            Domain::IPV4
        } else {
            Domain::IPV6
        };

        let udp_socket = Arc::new(create_udp_socket(domain, socket_addr)?);
        join_set.spawn(run_udp_listener(
            udp_socket,
            handler.clone(),
            shutdown.clone(),
        ));

        let tcp_listener = create_tcp_listener(domain, socket_addr)?;
        join_set.spawn(run_tcp_listener(
            tcp_listener,
            handler.clone(),
            shutdown.clone(),
        ));

        info!(bind_address = %socket_addr, "DNS listener ready (udp+tcp)");
    }

    if join_set.is_empty() {
        anyhow::bail!("no listen addresses configured");
    }

    while join_set.join_next().await.is_some() {}
    info!("DNS listeners stopped");
    Ok(())
}

async fn run_udp_listener(
    socket: Arc<UdpSocket>,
    handler: Arc<HandleDnsQueryUseCase>,
    shutdown: CancellationToken,
) {
    let mut recv_buf = [0u8; RECV_BUFFER_SIZE];

    loop {
        let (n, from) = tokio::select! {
            _ = shutdown.cancelled() => break,
            received = socket.recv_from(&mut recv_buf) => match received {
                Ok(r) => r,
                Err(e) => {
                    warn!(error = %e, "UDP receive failed");
                    continue;
                }
            },
        };

        let query = recv_buf[..n].to_vec();
        let channel = UdpResponseChannel::new(socket.clone(), from);
        let handler = handler.clone();
        tokio::spawn(async move {
            handler.execute(&query, &channel).await;
        });
    }
}

async fn run_tcp_listener(
    listener: TcpListener,
    handler: Arc<HandleDnsQueryUseCase>,
    shutdown: CancellationToken,
) {
    loop {
        let (stream, peer) = tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok(a) => a,
                Err(e) => {
                    warn!(error = %e, "TCP accept failed");
                    continue;
                }
            },
        };

        tokio::spawn(serve_tcp_connection(
            stream,
            peer,
            handler.clone(),
            shutdown.clone(),
        ));
    }
}

async fn serve_tcp_connection(
    stream: TcpStream,
    peer: SocketAddr,
    handler: Arc<HandleDnsQueryUseCase>,
    shutdown: CancellationToken,
) {
    let _ = stream.set_nodelay(true);
    let (mut reader, writer) = stream.into_split();
    let writer = Arc::new(Mutex::new(writer));

    loop {
        let frame = tokio::select! {
            _ = shutdown.cancelled() => break,
            frame = read_framed(&mut reader) => frame,
        };

        match frame {
            Ok(Some(query)) => {
                let channel = TcpResponseChannel::new(writer.clone(), peer);
                let handler = handler.clone();
                tokio::spawn(async move {
                    handler.execute(&query, &channel).await;
                });
            }
            Ok(None) => break,
            Err(e) => {
                debug!(peer = %peer, error = %e, "TCP connection closed with error");
                break;
            }
        }
    }
}

fn create_udp_socket(domain: Domain, socket_addr: SocketAddr) -> anyhow::Result<UdpSocket> {
    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
    if socket_addr.is_ipv6() {
        socket.set_only_v6(true)?;
    }
    socket.set_reuse_address(true)?;
    socket.bind(&socket_addr.into()).map_err(|e| {
        error!(bind_address = %socket_addr, error = %e, "Failed to bind UDP socket");
        e
    })?;
    socket.set_nonblocking(true)?;
    let std_socket: std::net::UdpSocket = socket.into();
    Ok(UdpSocket::from_std(std_socket)?)
}

fn create_tcp_listener(domain: Domain, socket_addr: SocketAddr) -> anyhow::Result<TcpListener> {
    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
    if socket_addr.is_ipv6() {
        socket.set_only_v6(true)?;
    }
    socket.set_reuse_address(true)?;
    socket.bind(&socket_addr.into()).map_err(|e| {
        error!(bind_address = %socket_addr, error = %e, "Failed to bind TCP socket");
        e
    })?;
    socket.listen(1024)?;
    socket.set_nonblocking(true)?;
    let std_listener: std::net::TcpListener = socket.into();
    Ok(TcpListener::from_std(std_listener)?)
}
