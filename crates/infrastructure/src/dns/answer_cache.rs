use dashmap::DashMap;
use rustc_hash::FxBuildHasher;
use sinkhole_dns_application::ports::AnswerCache;
use sinkhole_dns_domain::{Message, Question, RecordType, ResolveType, ResourceRecord};

struct CachedAnswer {
    response: Message,
    stored_at: i64,
    expires_at: i64,
}

/// Forwarded answers keyed by question. Names compare case-insensitively,
/// so `Example.COM A IN` and `example.com A IN` share an entry.
pub struct MemoryAnswerCache {
    entries: DashMap<Question, CachedAnswer, FxBuildHasher>,
}

impl MemoryAnswerCache {
    pub fn new() -> Self {
        Self {
            entries: DashMap::with_hasher(FxBuildHasher),
        }
    }

    pub fn get_at(&self, question: &Question, now: i64) -> Option<Message> {
        let cached = {
            let entry = self.entries.get(question)?;
            let hit = (now < entry.expires_at)
                .then(|| (entry.response.clone(), (now - entry.stored_at).max(0) as u32));
            hit
        };
        let Some((mut response, elapsed)) = cached else {
            self.entries.remove_if(question, |_, e| now >= e.expires_at);
            return None;
        };

        for record in response
            .answers
            .iter_mut()
            .chain(response.authority_records.iter_mut())
            .chain(response.additional_records.iter_mut())
        {
            age(record, elapsed);
        }
        response.is_from_cache = true;
        response.resolve_type = ResolveType::Cache;
        Some(response)
    }

    pub fn insert_at(&self, question: &Question, response: &Message, now: i64) {
        let Some(ttl) = response.min_answer_ttl().filter(|ttl| *ttl > 0) else {
            return;
        };

        let mut stored = response.clone();
        stored.is_from_cache = false;
        self.entries.insert(
            question.clone(),
            CachedAnswer {
                response: stored,
                stored_at: now,
                expires_at: now + ttl as i64,
            },
        );
    }

    pub fn remove_expired_at(&self, now: i64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| now < entry.expires_at);
        before.saturating_sub(self.entries.len())
    }
}

impl Default for MemoryAnswerCache {
    fn default() -> Self {
        Self::new()
    }
}

fn age(record: &mut ResourceRecord, elapsed: u32) {
    // OPT reuses the TTL field for flags.
    if record.record_type != RecordType::OPT {
        record.ttl = record.ttl.saturating_sub(elapsed);
    }
}

impl AnswerCache for MemoryAnswerCache {
    fn get(&self, question: &Question) -> Option<Message> {
        self.get_at(question, chrono::Utc::now().timestamp())
    }

    fn insert(&self, question: &Question, response: &Message) {
        self.insert_at(question, response, chrono::Utc::now().timestamp());
    }

    fn remove_expired(&self) -> usize {
        self.remove_expired_at(chrono::Utc::now().timestamp())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
