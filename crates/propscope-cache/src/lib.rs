//! Propscope Cache
//!
//! Two size-bounded, TTL-expiring, LRU response pools keyed by the
//! canonicalized request line, plus the strong entity-tag used for
//! conditional responses. The cache is purely advisory: a miss is never
//! an error, and cache faults must never fail a request.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;

pub mod etag;
pub mod key;

/// Api pool sizing: light endpoints, short TTL.
pub const API_POOL_CAPACITY: usize = 200;
pub const API_POOL_TTL: Duration = Duration::from_secs(10 * 60);

/// Stats pool sizing: heavy analytics, longer TTL.
pub const STATS_POOL_CAPACITY: usize = 50;
pub const STATS_POOL_TTL: Duration = Duration::from_secs(30 * 60);

/// A cached serialized body with its entity-tag.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub body: Arc<Vec<u8>>,
    pub etag: String,
}

impl CachedResponse {
    pub fn new(body: Vec<u8>) -> Self {
        let etag = etag::compute(&body);
        Self {
            body: Arc::new(body),
            etag,
        }
    }
}

struct Entry {
    response: CachedResponse,
    expires_at: Instant,
}

/// One size-bounded TTL/LRU pool.
pub struct ResponseCache {
    name: &'static str,
    default_ttl: Duration,
    inner: Mutex<LruCache<String, Entry>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

/// Hit-rate diagnostics for one pool.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub name: &'static str,
    pub hits: u64,
    pub misses: u64,
    pub size: usize,
    pub capacity: usize,
    /// Percentage of lookups served from the pool, one decimal.
    pub hit_rate: f64,
}

impl ResponseCache {
    pub fn new(name: &'static str, capacity: usize, default_ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            name,
            default_ttl,
            inner: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// The pool serving dataset listings, metadata, and paginated rows.
    pub fn api_pool() -> Self {
        Self::new("api", API_POOL_CAPACITY, API_POOL_TTL)
    }

    /// The pool serving aggregates, series, insights, and agent roll-ups.
    pub fn stats_pool() -> Self {
        Self::new("stats", STATS_POOL_CAPACITY, STATS_POOL_TTL)
    }

    /// Look a key up, promoting it on hit. Entries found expired are
    /// deleted and counted as a miss.
    pub fn get(&self, key: &str) -> Option<CachedResponse> {
        let mut cache = self.inner.lock();
        let now = Instant::now();
        let lookup: Option<Option<CachedResponse>> = cache.get(key).map(|entry| {
            if entry.expires_at > now {
                Some(entry.response.clone())
            } else {
                None
            }
        });
        match lookup {
            Some(Some(response)) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(response)
            }
            Some(None) => {
                // Lazily expired on read.
                cache.pop(key);
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Insert with the pool's default TTL, evicting the least-recently
    /// used entry at capacity. A duplicate put is idempotent.
    pub fn put(&self, key: String, response: CachedResponse) {
        self.put_with_ttl(key, response, self.default_ttl);
    }

    pub fn put_with_ttl(&self, key: String, response: CachedResponse, ttl: Duration) {
        let entry = Entry {
            response,
            expires_at: Instant::now() + ttl,
        };
        self.inner.lock().put(key, entry);
    }

    /// Remove every entry whose key contains the fragment; returns the
    /// number removed. Used for dataset-scoped flushes.
    pub fn invalidate(&self, fragment: &str) -> usize {
        let mut cache = self.inner.lock();
        let doomed: Vec<String> = cache
            .iter()
            .filter(|(k, _)| k.contains(fragment))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &doomed {
            cache.pop(key);
        }
        if !doomed.is_empty() {
            tracing::debug!(pool = self.name, removed = doomed.len(), "cache invalidate");
        }
        doomed.len()
    }

    /// Drop everything; returns the number of entries removed.
    pub fn clear(&self) -> usize {
        let mut cache = self.inner.lock();
        let size = cache.len();
        cache.clear();
        size
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let lookups = hits + misses;
        let hit_rate = if lookups == 0 {
            0.0
        } else {
            (hits as f64 / lookups as f64 * 1000.0).round() / 10.0
        };
        let cache = self.inner.lock();
        CacheStats {
            name: self.name,
            hits,
            misses,
            size: cache.len(),
            capacity: cache.cap().get(),
            hit_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(body: &str) -> CachedResponse {
        CachedResponse::new(body.as_bytes().to_vec())
    }

    #[test]
    fn test_miss_then_hit() {
        let cache = ResponseCache::new("test", 4, Duration::from_secs(60));
        assert!(cache.get("GET:/a").is_none());

        cache.put("GET:/a".into(), response("body"));
        let hit = cache.get("GET:/a").unwrap();
        assert_eq!(hit.body.as_slice(), b"body");

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_rate, 50.0);
    }

    #[test]
    fn test_capacity_never_exceeded_and_lru_evicted() {
        let cache = ResponseCache::new("test", 2, Duration::from_secs(60));
        cache.put("k1".into(), response("1"));
        cache.put("k2".into(), response("2"));

        // Touch k1 so k2 becomes least-recently-used.
        cache.get("k1");
        cache.put("k3".into(), response("3"));

        assert_eq!(cache.stats().size, 2);
        assert!(cache.get("k1").is_some());
        assert!(cache.get("k2").is_none(), "LRU entry should be evicted");
        assert!(cache.get("k3").is_some());
    }

    #[test]
    fn test_expired_entries_are_deleted_and_count_as_miss() {
        let cache = ResponseCache::new("test", 4, Duration::from_secs(60));
        cache.put_with_ttl("k".into(), response("x"), Duration::ZERO);

        assert!(cache.get("k").is_none());
        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 0);
    }

    #[test]
    fn test_duplicate_put_is_idempotent() {
        let cache = ResponseCache::new("test", 4, Duration::from_secs(60));
        cache.put("k".into(), response("same"));
        cache.put("k".into(), response("same"));
        assert_eq!(cache.stats().size, 1);
    }

    #[test]
    fn test_invalidate_by_fragment() {
        let cache = ResponseCache::new("test", 8, Duration::from_secs(60));
        cache.put("GET:/api/datasets/cea/data".into(), response("1"));
        cache.put("GET:/api/datasets/cea/stats".into(), response("2"));
        cache.put("GET:/api/datasets/other/data".into(), response("3"));

        assert_eq!(cache.invalidate("/cea/"), 2);
        assert_eq!(cache.stats().size, 1);
        assert!(cache.get("GET:/api/datasets/other/data").is_some());
    }

    #[test]
    fn test_clear() {
        let cache = ResponseCache::new("test", 8, Duration::from_secs(60));
        cache.put("a".into(), response("1"));
        cache.put("b".into(), response("2"));
        assert_eq!(cache.clear(), 2);
        assert_eq!(cache.stats().size, 0);
    }

    #[test]
    fn test_pool_presets() {
        assert_eq!(ResponseCache::api_pool().stats().capacity, 200);
        assert_eq!(ResponseCache::stats_pool().stats().capacity, 50);
    }
}
