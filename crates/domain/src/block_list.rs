use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};
use std::net::IpAddr;
use std::sync::Arc;

const SNAPSHOT_PREFIX_LEN: usize = 120;

/// A remote hosts-style list whose entries are loaded as blocked domains.
#[derive(Debug, Clone)]
pub struct BlockList {
    pub id: Option<i64>,
    pub url: Arc<str>,
    pub enabled: bool,
    pub entry_count: u64,
    /// Unix seconds of the last successful refresh.
    pub last_updated: Option<i64>,
}

impl BlockList {
    pub fn new(url: impl Into<Arc<str>>) -> Self {
        Self {
            id: None,
            url: url.into(),
            enabled: true,
            entry_count: 0,
            last_updated: None,
        }
    }

    pub fn updated_within(&self, window_secs: i64, now: i64) -> bool {
        self.last_updated
            .is_some_and(|ts| now - ts < window_secs)
    }

    /// File name used for the on-disk snapshot of this list. The readable
    /// prefix is lossy, so a hash of the full URL keeps names distinct.
    pub fn snapshot_file_name(&self) -> String {
        let stripped = self
            .url
            .trim_start_matches("https://")
            .trim_start_matches("http://");
        let prefix: String = stripped
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .take(SNAPSHOT_PREFIX_LEN)
            .collect();

        let mut hasher = FxHasher::default();
        self.url.as_bytes().hash(&mut hasher);
        format!("{}-{:016x}.txt", prefix, hasher.finish())
    }
}

/// One unit of work for the ingestion queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRequest {
    pub urls: Vec<Arc<str>>,
    /// Address blocked names resolve to.
    pub redirect: IpAddr,
}

impl UpdateRequest {
    pub fn new(urls: Vec<Arc<str>>, redirect: IpAddr) -> Self {
        Self { urls, redirect }
    }
}

/// Progress of a list download currently in flight.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadProgress {
    pub url: Arc<str>,
    pub lines_parsed: u64,
    pub finished: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_updated_within_window() {
        let mut list = BlockList::new("https://lists.example/hosts");
        assert!(!list.updated_within(600, 10_000));
        list.last_updated = Some(9_500);
        assert!(list.updated_within(600, 10_000));
        assert!(!list.updated_within(600, 10_100));
    }

    #[test]
    fn test_snapshot_file_name_is_path_safe() {
        let name = BlockList::new("https://lists.example/a/b?x=1").snapshot_file_name();
        assert!(name.starts_with("lists.example_a_b_x_1-"));
        assert!(name.ends_with(".txt"));
        assert!(!name.contains('/'));
        assert_eq!(name, BlockList::new("https://lists.example/a/b?x=1").snapshot_file_name());
    }

    #[test]
    fn test_snapshot_file_names_differ_when_prefixes_collide() {
        let names: HashSet<String> = [
            "https://lists.example/a/b.txt",
            "https://lists.example/a_b.txt",
            "http://lists.example/a/b.txt",
        ]
        .iter()
        .map(|url| BlockList::new(*url).snapshot_file_name())
        .collect();
        assert_eq!(names.len(), 3);

        let long = "x".repeat(300);
        let a = BlockList::new(format!("https://lists.example/{}a", long)).snapshot_file_name();
        let b = BlockList::new(format!("https://lists.example/{}b", long)).snapshot_file_name();
        assert_ne!(a, b);
    }
}
