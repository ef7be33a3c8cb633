use std::time::Duration;
use tokio::time::Instant;

/// A cached value and when it was fetched
#[derive(Debug, Clone)]
pub(crate) struct CacheEntry<T> {
    pub value: T,
    fetched_at: Instant,
}

impl<T> CacheEntry<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            fetched_at: Instant::now(),
        }
    }

    /// Valid while strictly younger than `ttl`
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() < ttl
    }
}
