pub mod handle_dns_query;

pub use handle_dns_query::{DropReason, HandleDnsQueryUseCase, QueryOutcome, QueryPolicy};
