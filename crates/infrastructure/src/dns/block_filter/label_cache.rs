use dashmap::DashMap;
use rustc_hash::FxBuildHasher;
use std::sync::Arc;

/// How long a matched suffix keeps its verdict.
pub const LABEL_CACHE_TTL_SECS: i64 = 900;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Blocked,
    Allowed,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    verdict: Verdict,
    inserted_at: i64,
}

/// Verdicts keyed by the exact suffix that produced them. Reads never block
/// on each other; expired entries are dropped on the read that finds them.
pub struct LabelCache {
    entries: DashMap<Arc<str>, Entry, FxBuildHasher>,
    ttl_secs: i64,
}

impl LabelCache {
    pub fn new() -> Self {
        Self::with_ttl(LABEL_CACHE_TTL_SECS)
    }

    pub fn with_ttl(ttl_secs: i64) -> Self {
        Self {
            entries: DashMap::with_hasher(FxBuildHasher),
            ttl_secs,
        }
    }

    pub fn get(&self, suffix: &str) -> Option<Verdict> {
        self.get_at(suffix, chrono::Utc::now().timestamp())
    }

    pub fn get_at(&self, suffix: &str, now: i64) -> Option<Verdict> {
        let entry = *self.entries.get(suffix)?;
        if now - entry.inserted_at >= self.ttl_secs {
            self.entries
                .remove_if(suffix, |_, e| e.inserted_at == entry.inserted_at);
            return None;
        }
        Some(entry.verdict)
    }

    pub fn insert(&self, suffix: &str, verdict: Verdict) {
        self.insert_at(suffix, verdict, chrono::Utc::now().timestamp());
    }

    pub fn insert_at(&self, suffix: &str, verdict: Verdict, now: i64) {
        self.entries.insert(
            Arc::from(suffix),
            Entry {
                verdict,
                inserted_at: now,
            },
        );
    }

    pub fn remove(&self, suffix: &str) {
        self.entries.remove(suffix);
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for LabelCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_expires_after_ttl() {
        let cache = LabelCache::new();
        cache.insert_at("ads.example", Verdict::Blocked, 1_000);

        assert_eq!(cache.get_at("ads.example", 1_899), Some(Verdict::Blocked));
        assert_eq!(cache.get_at("ads.example", 1_900), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_reinsert_refreshes_timestamp() {
        let cache = LabelCache::with_ttl(10);
        cache.insert_at("example", Verdict::Allowed, 0);
        cache.insert_at("example", Verdict::Blocked, 8);

        assert_eq!(cache.get_at("example", 15), Some(Verdict::Blocked));
    }

    #[test]
    fn test_remove_and_clear() {
        let cache = LabelCache::new();
        cache.insert("a.example", Verdict::Blocked);
        cache.insert("b.example", Verdict::Blocked);

        cache.remove("a.example");
        assert_eq!(cache.get("a.example"), None);
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
    }
}
