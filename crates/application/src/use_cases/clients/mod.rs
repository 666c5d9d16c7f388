pub mod sync_client_records;

pub use sync_client_records::{SyncClientRecordsUseCase, CLIENT_RECORD_TTL};
