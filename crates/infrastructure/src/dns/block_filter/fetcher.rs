use async_trait::async_trait;
use sinkhole_dns_application::ports::ListFetcher;
use sinkhole_dns_domain::DomainError;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Downloads block lists over HTTP(S) straight to disk.
pub struct HttpListFetcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpListFetcher {
    pub fn new(timeout: Duration) -> Result<Self, DomainError> {
        let client = reqwest::Client::builder()
            .user_agent("Sinkhole-DNS/1.0 (blocklist-sync)")
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| DomainError::BlockListFetchError(e.to_string()))?;

        Ok(Self { client, timeout })
    }

    async fn stream_to_file(&self, url: &str, dest: &Path) -> Result<u64, DomainError> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DomainError::BlockListFetchError(format!("{}: {}", url, e)))?;

        if !response.status().is_success() {
            return Err(DomainError::BlockListFetchError(format!(
                "HTTP {} for {}",
                response.status().as_u16(),
                url
            )));
        }

        let mut file = tokio::fs::File::create(dest)
            .await
            .map_err(|e| DomainError::IoError(format!("{}: {}", dest.display(), e)))?;

        let mut written = 0u64;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| DomainError::BlockListFetchError(format!("{}: {}", url, e)))?
        {
            file.write_all(&chunk)
                .await
                .map_err(|e| DomainError::IoError(format!("{}: {}", dest.display(), e)))?;
            written += chunk.len() as u64;
        }

        file.flush()
            .await
            .map_err(|e| DomainError::IoError(format!("{}: {}", dest.display(), e)))?;

        Ok(written)
    }
}

#[async_trait]
impl ListFetcher for HttpListFetcher {
    async fn download(&self, url: &str, dest: &Path) -> Result<u64, DomainError> {
        let written = tokio::time::timeout(self.timeout, self.stream_to_file(url, dest))
            .await
            .map_err(|_| {
                DomainError::BlockListFetchError(format!(
                    "{}: timed out after {}s",
                    url,
                    self.timeout.as_secs()
                ))
            })??;

        debug!(url = %url, bytes = written, "Block list downloaded");
        Ok(written)
    }
}
