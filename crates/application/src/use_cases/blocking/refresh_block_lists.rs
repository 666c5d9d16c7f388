use crate::ports::{BlockFilterEnginePort, BlockListRepository};
use crate::services::{EngineEvent, EventBus};
use sinkhole_dns_domain::{DomainError, UpdateRequest};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, info};

/// Queues a refresh of every enabled block list.
pub struct RefreshBlockListsUseCase {
    lists: Arc<dyn BlockListRepository>,
    engine: Arc<dyn BlockFilterEnginePort>,
    events: EventBus,
    redirect: IpAddr,
}

impl RefreshBlockListsUseCase {
    pub fn new(
        lists: Arc<dyn BlockListRepository>,
        engine: Arc<dyn BlockFilterEnginePort>,
        events: EventBus,
        redirect: IpAddr,
    ) -> Self {
        Self {
            lists,
            engine,
            events,
            redirect,
        }
    }

    /// Returns the number of lists queued.
    pub async fn execute(&self) -> Result<usize, DomainError> {
        let urls: Vec<_> = self
            .lists
            .list_enabled()
            .await?
            .into_iter()
            .map(|list| list.url)
            .collect();
        if urls.is_empty() {
            debug!("No enabled block lists to refresh");
            return Ok(0);
        }

        let count = urls.len();
        self.engine
            .enqueue(UpdateRequest::new(urls, self.redirect))
            .await?;
        self.events.publish(EngineEvent::UpdateRequested);
        info!(lists = count, "Block list refresh queued");
        Ok(count)
    }
}
