pub mod auto_update;
pub mod blocklist_housekeeping;
pub mod client_sync;
pub mod runner;

pub use auto_update::AutoUpdateJob;
pub use blocklist_housekeeping::{BlocklistHousekeepingJob, TickOutcome};
pub use client_sync::ClientSyncJob;
pub use runner::JobRunner;
