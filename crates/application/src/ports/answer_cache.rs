use sinkhole_dns_domain::{Message, Question};

/// Resolver-level cache of forwarded answers, keyed by question.
pub trait AnswerCache: Send + Sync {
    /// A copy of the cached response with TTLs reduced by the time spent in
    /// the cache, or `None` when absent or expired.
    fn get(&self, question: &Question) -> Option<Message>;

    /// Stores `response` for the minimum TTL of its answers.
    fn insert(&self, question: &Question, response: &Message);

    fn remove_expired(&self) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
