use async_trait::async_trait;
use sinkhole_dns_application::ports::ListFetcher;
use sinkhole_dns_domain::DomainError;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;
use std::time::Duration;

/// Serves canned list bodies by URL; unknown URLs fail like an HTTP 404.
#[derive(Default)]
pub struct StaticListFetcher {
    bodies: RwLock<HashMap<String, String>>,
    downloads: AtomicUsize,
    delay: RwLock<Option<Duration>>,
    settle: RwLock<Option<Duration>>,
}

impl StaticListFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_list(self, url: &str, body: &str) -> Self {
        self.set_list(url, body);
        self
    }

    pub fn set_list(&self, url: &str, body: &str) {
        self.bodies
            .write()
            .unwrap()
            .insert(url.to_string(), body.to_string());
    }

    pub fn remove_list(&self, url: &str) {
        self.bodies.write().unwrap().remove(url);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.write().unwrap() = Some(delay);
    }

    /// Sleeps after the body is written, keeping the file open to races.
    pub fn set_settle(&self, settle: Duration) {
        *self.settle.write().unwrap() = Some(settle);
    }

    pub fn downloads(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ListFetcher for StaticListFetcher {
    async fn download(&self, url: &str, dest: &Path) -> Result<u64, DomainError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);

        let delay = *self.delay.read().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let body = self
            .bodies
            .read()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| DomainError::BlockListFetchError(format!("HTTP 404 for {}", url)))?;

        tokio::fs::write(dest, body.as_bytes())
            .await
            .map_err(|e| DomainError::IoError(e.to_string()))?;

        let settle = *self.settle.read().unwrap();
        if let Some(settle) = settle {
            tokio::time::sleep(settle).await;
        }
        Ok(body.len() as u64)
    }
}
