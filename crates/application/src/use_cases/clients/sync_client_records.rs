use crate::ports::ClientRepository;
use crate::services::ZoneCatalog;
use sinkhole_dns_domain::{DomainError, DomainName};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const CLIENT_RECORD_TTL: u32 = 300;

/// Publishes named clients as authoritative host records, with reverse PTRs.
pub struct SyncClientRecordsUseCase {
    client_repo: Arc<dyn ClientRepository>,
    catalog: Arc<ZoneCatalog>,
    local_domain: Option<String>,
}

impl SyncClientRecordsUseCase {
    pub fn new(
        client_repo: Arc<dyn ClientRepository>,
        catalog: Arc<ZoneCatalog>,
        local_domain: Option<String>,
    ) -> Self {
        Self {
            client_repo,
            catalog,
            local_domain,
        }
    }

    pub async fn execute(&self) -> Result<u64, DomainError> {
        let clients = self.client_repo.get_all().await?;
        let mut added = 0u64;

        for client in &clients {
            let Some(hostname) = client.usable_hostname() else {
                continue;
            };
            let fqdn = match (&self.local_domain, hostname.contains('.')) {
                (Some(domain), false) => format!("{}.{}", hostname, domain),
                _ => hostname.to_string(),
            };
            let name = match fqdn.parse::<DomainName>() {
                Ok(name) => name,
                Err(e) => {
                    warn!(hostname = %fqdn, error = %e, "Skipping client with invalid hostname");
                    continue;
                }
            };
            match self
                .catalog
                .add_host(&name, client.ip_address, CLIENT_RECORD_TTL)
            {
                Ok(true) => {
                    debug!(hostname = %name, ip = %client.ip_address, "Client record added");
                    added += 1;
                }
                Ok(false) => {}
                Err(e) => warn!(error = %e, hostname = %name, "Failed to add client record"),
            }
        }

        info!(clients = clients.len(), added, "Client records synchronized");
        Ok(added)
    }
}
