use async_trait::async_trait;
use sinkhole_dns_application::ports::ConnectivityProbe;
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tracing::debug;

const DEFAULT_CACHE_FOR: Duration = Duration::from_secs(5);

/// Decides whether the internet is reachable by opening a TCP connection
/// to a well-known resolver. The verdict is reused for a few seconds so a
/// burst of queries costs one connect.
pub struct TcpConnectivityProbe {
    target: SocketAddr,
    timeout: Duration,
    cache_for: Duration,
    last: Mutex<Option<(Instant, bool)>>,
}

impl TcpConnectivityProbe {
    pub fn new(target: SocketAddr, timeout: Duration) -> Self {
        Self {
            target,
            timeout,
            cache_for: DEFAULT_CACHE_FOR,
            last: Mutex::new(None),
        }
    }

    pub fn with_cache_for(mut self, cache_for: Duration) -> Self {
        self.cache_for = cache_for;
        self
    }

    fn cached(&self) -> Option<bool> {
        let last = *self.last.lock().unwrap_or_else(|e| e.into_inner());
        last.filter(|(at, _)| at.elapsed() < self.cache_for)
            .map(|(_, reachable)| reachable)
    }

    fn store(&self, reachable: bool) {
        *self.last.lock().unwrap_or_else(|e| e.into_inner()) = Some((Instant::now(), reachable));
    }
}

#[async_trait]
impl ConnectivityProbe for TcpConnectivityProbe {
    async fn is_reachable(&self) -> bool {
        if let Some(reachable) = self.cached() {
            return reachable;
        }

        let reachable = matches!(
            tokio::time::timeout(self.timeout, TcpStream::connect(self.target)).await,
            Ok(Ok(_))
        );
        if !reachable {
            debug!(target = %self.target, "Connectivity probe failed");
        }

        self.store(reachable);
        reachable
    }
}
