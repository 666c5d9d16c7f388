use crate::ports::BlockListRepository;
use sinkhole_dns_domain::DomainError;
use std::sync::Arc;
use tracing::{info, warn};

pub struct SeedDefaultListsUseCase {
    lists: Arc<dyn BlockListRepository>,
}

impl SeedDefaultListsUseCase {
    pub fn new(lists: Arc<dyn BlockListRepository>) -> Self {
        Self { lists }
    }

    /// Adds each URL as an enabled list unless it is already known.
    pub async fn execute(&self, urls: &[String]) -> Result<u64, DomainError> {
        let mut added = 0u64;
        for url in urls {
            let url = url.trim();
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                warn!(url, "Skipping default list with unsupported scheme");
                continue;
            }
            if self.lists.ensure_exists(url).await? {
                added += 1;
            }
        }
        if added > 0 {
            info!(added, "Default block lists registered");
        }
        Ok(added)
    }
}
