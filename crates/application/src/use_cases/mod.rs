pub mod blocking;
pub mod clients;
pub mod dns;

pub use blocking::{EnsureDefaultAllowlistUseCase, RefreshBlockListsUseCase, SeedDefaultListsUseCase};
pub use clients::SyncClientRecordsUseCase;
pub use dns::{DropReason, HandleDnsQueryUseCase, QueryOutcome, QueryPolicy};
