//! LRU caching for authorization decisions

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

use super::decision::{AccessDecision, AccessRequest};

/// Default number of cached decisions
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub capacity: usize,
}

/// Authorization decision cache keyed by the full request
///
/// Every [`DecisionCache::clear`] starts a new generation. A decision
/// computed during an older generation is never stored, so an
/// evaluation that raced with a write cannot outlive it.
pub struct DecisionCache {
    entries: Mutex<LruCache<AccessRequest, AccessDecision>>,
    generation: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl DecisionCache {
    /// Create a new cache; a zero capacity falls back to one entry
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            generation: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub async fn get(&self, request: &AccessRequest) -> Option<AccessDecision> {
        let mut entries = self.entries.lock().await;
        let found = entries.get(request).cloned();
        let counter = if found.is_some() { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        found
    }

    /// Current generation; read it before loading the data a decision
    /// is computed from
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Stores the decision unless the cache was cleared since `generation`
    ///
    /// Returns whether the decision was stored.
    pub async fn put(&self, request: AccessRequest, decision: AccessDecision, generation: u64) -> bool {
        let mut entries = self.entries.lock().await;
        if self.generation.load(Ordering::SeqCst) != generation {
            return false;
        }
        entries.put(request, decision);
        true
    }

    /// Drops every cached decision and starts a new generation
    pub async fn clear(&self) {
        let mut entries = self.entries.lock().await;
        self.generation.fetch_add(1, Ordering::SeqCst);
        entries.clear();
    }

    pub async fn stats(&self) -> CacheStats {
        let entries = self.entries.lock().await;
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: entries.len(),
            capacity: entries.cap().get(),
        }
    }
}

impl Default for DecisionCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Principal, Verb};
    use bastion_core::OrgId;

    fn request(user: &str) -> AccessRequest {
        AccessRequest::resource(
            Principal::new(user),
            OrgId::default(),
            "assets",
            "asset",
            None,
            Verb::List,
        )
    }

    #[tokio::test]
    async fn test_cache_roundtrip() {
        let cache = DecisionCache::new(10);
        assert!(cache.get(&request("alice")).await.is_none());

        assert!(cache.put(request("alice"), AccessDecision::deny("no rule"), cache.generation()).await);
        let cached = cache.get(&request("alice")).await.unwrap();
        assert!(!cached.allowed);

        let stats = cache.stats().await;
        assert_eq!((stats.hits, stats.misses, stats.entries), (1, 1, 1));
    }

    #[tokio::test]
    async fn test_cache_eviction() {
        let cache = DecisionCache::new(1);
        cache.put(request("alice"), AccessDecision::deny("a"), 0).await;
        cache.put(request("bob"), AccessDecision::deny("b"), 0).await;

        assert!(cache.get(&request("alice")).await.is_none());
        assert!(cache.get(&request("bob")).await.is_some());
    }

    #[tokio::test]
    async fn test_zero_capacity_falls_back() {
        let cache = DecisionCache::new(0);
        assert_eq!(cache.stats().await.capacity, 1);
        cache.put(request("alice"), AccessDecision::deny("a"), 0).await;
        cache.clear().await;
        assert_eq!(cache.stats().await.entries, 0);
    }

    #[tokio::test]
    async fn test_decision_from_before_clear_is_dropped() {
        let cache = DecisionCache::new(10);
        let generation = cache.generation();

        // A write lands while the decision is being computed
        cache.clear().await;

        assert!(!cache.put(request("alice"), AccessDecision::allow("viewer", "stale"), generation).await);
        assert!(cache.get(&request("alice")).await.is_none());
        assert_eq!(cache.generation(), generation + 1);
    }
}
