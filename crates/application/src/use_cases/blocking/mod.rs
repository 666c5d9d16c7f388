pub mod ensure_default_allowlist;
pub mod refresh_block_lists;
pub mod seed_default_lists;

pub use ensure_default_allowlist::{EnsureDefaultAllowlistUseCase, DEFAULT_ALLOWED};
pub use refresh_block_lists::RefreshBlockListsUseCase;
pub use seed_default_lists::SeedDefaultListsUseCase;
