//! Result cache for searches.
//!
//! Entries are keyed by the reader's cache key and a fingerprint of the
//! query. Filtered views scope their keys with the security context, so two
//! callers seeing different documents never share an entry even when they
//! search the same snapshot with the same query.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use super::search::{SearchQuery, SearchResponse};
use crate::segment::CacheKey;

/// Default maximum number of cached responses.
pub const DEFAULT_MAX_ENTRIES: usize = 1024;

/// Digest of a query's full content, values included.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct QueryFingerprint([u8; 32]);

impl QueryFingerprint {
    /// Fingerprint `query`.
    ///
    /// Returns `None` if the query cannot be serialized; such a query is not
    /// cached.
    pub fn from_query(query: &SearchQuery) -> Option<Self> {
        match serde_json::to_vec(query) {
            Ok(bytes) => Some(Self(*blake3::hash(&bytes).as_bytes())),
            Err(e) => {
                warn!(error = %e, "failed to fingerprint query");
                None
            }
        }
    }
}

/// Cache lookup key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ResultKey {
    reader: CacheKey,
    query: QueryFingerprint,
}

impl ResultKey {
    /// Key for `query` against the reader identified by `reader`.
    pub fn new(reader: CacheKey, query: &SearchQuery) -> Option<Self> {
        QueryFingerprint::from_query(query).map(|query| Self { reader, query })
    }
}

#[derive(Debug)]
struct CachedResponse {
    response: Arc<SearchResponse>,
    hit_count: AtomicU64,
}

impl CachedResponse {
    fn record_hit(&self) -> u64 {
        self.hit_count.fetch_add(1, AtomicOrdering::Relaxed) + 1
    }

    fn hits(&self) -> u64 {
        self.hit_count.load(AtomicOrdering::Relaxed)
    }
}

/// Cache statistics.
#[derive(Debug, Default)]
pub struct CacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl CacheStats {
    /// Get hit count.
    pub fn hits(&self) -> u64 {
        self.hits.load(AtomicOrdering::Relaxed)
    }

    /// Get miss count.
    pub fn misses(&self) -> u64 {
        self.misses.load(AtomicOrdering::Relaxed)
    }

    /// Get eviction count.
    pub fn evictions(&self) -> u64 {
        self.evictions.load(AtomicOrdering::Relaxed)
    }

    /// Calculate hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits() as f64;
        let total = hits + self.misses() as f64;
        if total > 0.0 {
            hits / total
        } else {
            0.0
        }
    }
}

/// Bounded cache of search responses with least-hit eviction.
pub struct ResultCache {
    cache: RwLock<HashMap<ResultKey, CachedResponse>>,
    max_entries: usize,
    stats: CacheStats,
}

impl ResultCache {
    /// Create a cache holding at most `max_entries` responses.
    pub fn new(max_entries: usize) -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
            max_entries,
            stats: CacheStats::default(),
        }
    }

    /// Look up a cached response.
    pub fn get(&self, key: &ResultKey) -> Option<Arc<SearchResponse>> {
        let guard = self.cache.read();
        match guard.get(key) {
            Some(cached) => {
                cached.record_hit();
                self.stats.hits.fetch_add(1, AtomicOrdering::Relaxed);
                Some(Arc::clone(&cached.response))
            }
            None => {
                self.stats.misses.fetch_add(1, AtomicOrdering::Relaxed);
                None
            }
        }
    }

    /// Cache a response, evicting the least-hit entry when full.
    pub fn insert(&self, key: ResultKey, response: Arc<SearchResponse>) {
        if self.max_entries == 0 {
            return;
        }

        let mut guard = self.cache.write();
        if guard.len() >= self.max_entries && !guard.contains_key(&key) {
            self.evict_least_hit(&mut guard);
        }

        guard.insert(
            key,
            CachedResponse {
                response,
                hit_count: AtomicU64::new(0),
            },
        );
    }

    /// Drop every response computed from `index`.
    pub fn invalidate_index(&self, index: &str) -> usize {
        let mut guard = self.cache.write();
        let before = guard.len();
        guard.retain(|_, cached| cached.response.index != index);
        let removed = before - guard.len();
        if removed > 0 {
            debug!(index, removed, "invalidated cached results");
        }
        removed
    }

    fn evict_least_hit(&self, cache: &mut HashMap<ResultKey, CachedResponse>) {
        let evict_key = cache
            .iter()
            .min_by_key(|(_, v)| v.hits())
            .map(|(k, _)| *k);

        if let Some(key) = evict_key {
            cache.remove(&key);
            self.stats.evictions.fetch_add(1, AtomicOrdering::Relaxed);
        }
    }

    /// Get cache statistics.
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Get the current number of cached entries.
    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear all cached entries.
    pub fn clear(&self) {
        self.cache.write().clear();
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}
