pub mod engine;
pub mod fetcher;
pub mod label_cache;
pub mod list_parser;

pub use engine::{BlockFilterEngine, BlockFilterSettings, ListOutcome, STALENESS_WINDOW_SECS};
pub use fetcher::HttpListFetcher;
pub use label_cache::{LabelCache, Verdict, LABEL_CACHE_TTL_SECS};
pub use list_parser::parse_list_line;
