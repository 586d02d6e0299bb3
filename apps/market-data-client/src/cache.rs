//! Time-boxed caching for API responses.
//!
//! Provides TTL-based caching keyed by request fingerprint
//! (`SYMBOL:kind`) to reduce API calls and keep the dashboard responsive
//! while the backend is struggling.
//!
//! Reads of a stale entry behave as a miss; the entry is not eagerly
//! evicted and a later write simply overwrites it. Timestamps use
//! `tokio::time::Instant` so tests can drive a paused clock.

use std::collections::HashMap;

use parking_lot::RwLock;
use tokio::time::{Duration, Instant};

/// Default TTL for cached responses (5 minutes).
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

/// A cached value and the moment it was captured.
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    captured_at: Instant,
}

/// TTL cache keyed by request fingerprint.
#[derive(Debug)]
pub struct TtlCache<V> {
    ttl: Duration,
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
}

impl<V: Clone> TtlCache<V> {
    /// Create a cache with the given TTL.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Create a cache with the default 5 minute TTL.
    #[must_use]
    pub fn with_default_ttl() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }

    /// Get a value if present and fresh.
    ///
    /// A stale entry reads as a miss; it stays in the map until the next
    /// write to the same key or an explicit removal.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<V> {
        let entries = self.entries.read();
        let entry = entries.get(key)?;
        if entry.captured_at.elapsed() < self.ttl {
            Some(entry.value.clone())
        } else {
            None
        }
    }

    /// Store a value under the given fingerprint, stamping the capture time.
    pub fn insert(&self, key: impl Into<String>, value: V) {
        let entry = CacheEntry {
            value,
            captured_at: Instant::now(),
        };
        self.entries.write().insert(key.into(), entry);
    }

    /// Remove a single entry. Returns whether it was present.
    pub fn remove(&self, key: &str) -> bool {
        self.entries.write().remove(key).is_some()
    }

    /// Remove every entry whose key contains the given substring.
    ///
    /// Used to invalidate a family of fingerprints at once, e.g. all
    /// `watchlist` entries after a mutation. Returns the number removed.
    pub fn remove_matching(&self, substring: &str) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|key, _| !key.contains(substring));
        before - entries.len()
    }

    /// Remove all entries.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Number of entries, including stale ones not yet overwritten.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Diagnostic snapshot of size and stored keys.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.read();
        let mut keys: Vec<String> = entries.keys().cloned().collect();
        keys.sort();
        CacheStats {
            size: entries.len(),
            keys,
        }
    }
}

/// Diagnostic snapshot of the cache.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Number of stored entries.
    pub size: usize,
    /// Stored fingerprints, sorted.
    pub keys: Vec<String>,
}
