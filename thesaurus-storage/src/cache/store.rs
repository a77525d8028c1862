//! TTL + LRU cache store.
//!
//! All operations take one coarse mutex. Each operation is O(1) on the hash
//! map plus O(log n) on the recency index, and capacity is bounded, so the
//! lock is only ever held briefly. Callers must never hold it across I/O;
//! the API makes that impossible by returning owned values.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use thesaurus_core::{Clock, Timestamp};

use super::stats::CacheStats;

/// A cached value with its timing metadata.
///
/// Entries are replaced wholesale by [`CacheStore::put`]; nothing mutates a
/// stored value in place.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub inserted_at: Timestamp,
    pub expires_at: Timestamp,
    pub last_accessed_at: Timestamp,
    /// Monotonic access sequence; breaks ties between equal timestamps.
    access_seq: u64,
}

impl<V> CacheEntry<V> {
    /// Whether the entry is past its expiry at `now`.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        now > self.expires_at
    }
}

#[derive(Debug)]
struct CacheInner<V> {
    entries: HashMap<String, CacheEntry<V>>,
    /// access_seq -> key, oldest first.
    recency: BTreeMap<u64, String>,
    next_seq: u64,
    /// Bumped by every invalidation, present key or not.
    generation: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
    expirations: u64,
}

impl<V> CacheInner<V> {
    fn new() -> Self {
        Self {
            entries: HashMap::new(),
            recency: BTreeMap::new(),
            next_seq: 0,
            generation: 0,
            hits: 0,
            misses: 0,
            evictions: 0,
            expirations: 0,
        }
    }

    fn bump_seq(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    fn remove(&mut self, key: &str) -> Option<CacheEntry<V>> {
        let entry = self.entries.remove(key)?;
        self.recency.remove(&entry.access_seq);
        Some(entry)
    }

    /// Drop the least recently accessed entry.
    fn evict_lru(&mut self) -> Option<String> {
        let (_, key) = self.recency.pop_first()?;
        self.entries.remove(&key);
        self.evictions += 1;
        Some(key)
    }
}

/// Bounded, thread-safe cache keyed by normalized term.
pub struct CacheStore<V> {
    inner: Mutex<CacheInner<V>>,
    max_size: usize,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> CacheStore<V> {
    /// Create a cache holding at most `max_size` entries (minimum 1).
    pub fn new(max_size: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Mutex::new(CacheInner::new()),
            max_size: max_size.max(1),
            clock,
        }
    }

    // The cache never panics while holding the lock, so a poisoned guard
    // still protects consistent state.
    fn lock(&self) -> MutexGuard<'_, CacheInner<V>> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Look up a key.
    ///
    /// An entry past its `expires_at` is removed and reported as a miss.
    /// A hit refreshes `last_accessed_at` and the entry's LRU position.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let mut inner = self.lock();

        let expired = match inner.entries.get(key) {
            None => {
                inner.misses += 1;
                return None;
            }
            Some(entry) => entry.is_expired_at(now),
        };

        if expired {
            inner.remove(key);
            inner.expirations += 1;
            inner.misses += 1;
            tracing::debug!(key, "Cache entry expired");
            return None;
        }

        let seq = inner.bump_seq();
        let inner = &mut *inner;
        let entry = inner.entries.get_mut(key)?;
        inner.recency.remove(&entry.access_seq);
        entry.access_seq = seq;
        entry.last_accessed_at = now;
        inner.recency.insert(seq, key.to_string());
        inner.hits += 1;
        Some(entry.value.clone())
    }

    /// Insert or replace a value.
    ///
    /// When inserting a new key into a full cache, the least recently
    /// accessed entry is evicted first, so the size never exceeds capacity.
    pub fn put(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let now = self.clock.now();
        let mut inner = self.lock();
        self.insert(&mut inner, key.into(), value, now, ttl);
    }

    /// Current invalidation generation.
    ///
    /// Read it before loading a value from the source of truth and hand it
    /// to [`put_if_current`](Self::put_if_current).
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Like [`put`](Self::put), but only if no invalidation happened since
    /// `generation` was read. Returns whether the value was stored.
    ///
    /// A value loaded before an invalidation may predate the change that
    /// caused it and must not be cached.
    pub fn put_if_current(
        &self,
        key: impl Into<String>,
        value: V,
        ttl: Duration,
        generation: u64,
    ) -> bool {
        let key = key.into();
        let now = self.clock.now();
        let mut inner = self.lock();
        if inner.generation != generation {
            tracing::debug!(
                key = %key,
                loaded_at = generation,
                current = inner.generation,
                "Skipped caching value loaded before an invalidation"
            );
            return false;
        }
        self.insert(&mut inner, key, value, now, ttl);
        true
    }

    fn insert(
        &self,
        inner: &mut CacheInner<V>,
        key: String,
        value: V,
        now: Timestamp,
        ttl: Duration,
    ) {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        let expires_at = now.checked_add_signed(ttl).unwrap_or(Timestamp::MAX_UTC);

        if inner.remove(&key).is_none() {
            while inner.entries.len() >= self.max_size {
                match inner.evict_lru() {
                    Some(evicted) => tracing::debug!(key = %evicted, "Evicted LRU cache entry"),
                    None => break,
                }
            }
        }

        let seq = inner.bump_seq();
        inner.recency.insert(seq, key.clone());
        inner.entries.insert(
            key,
            CacheEntry {
                value,
                inserted_at: now,
                expires_at,
                last_accessed_at: now,
                access_seq: seq,
            },
        );
    }

    /// Remove one entry. Returns whether it was present.
    pub fn invalidate(&self, key: &str) -> bool {
        let mut inner = self.lock();
        inner.generation += 1;
        inner.remove(key).is_some()
    }

    /// Remove every entry. Returns how many were dropped.
    pub fn invalidate_all(&self) -> usize {
        let mut inner = self.lock();
        inner.generation += 1;
        let dropped = inner.entries.len();
        inner.entries.clear();
        inner.recency.clear();
        dropped
    }

    /// Whether a live (unexpired) entry exists, without touching stats or
    /// recency.
    pub fn contains(&self, key: &str) -> bool {
        let now = self.clock.now();
        self.lock()
            .entries
            .get(key)
            .is_some_and(|entry| !entry.is_expired_at(now))
    }

    /// Snapshot of an entry's metadata, without touching stats or recency.
    pub fn peek_entry(&self, key: &str) -> Option<CacheEntry<V>> {
        self.lock().entries.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        CacheStats {
            hits: inner.hits,
            misses: inner.misses,
            hit_rate: CacheStats::compute_hit_rate(inner.hits, inner.misses),
            size: inner.entries.len(),
            max_size: self.max_size,
            evictions: inner.evictions,
            expirations: inner.expirations,
        }
    }
}

impl<V> std::fmt::Debug for CacheStore<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let size = self
            .inner
            .lock()
            .map(|inner| inner.entries.len())
            .unwrap_or(0);
        f.debug_struct("CacheStore")
            .field("max_size", &self.max_size)
            .field("size", &size)
            .finish()
    }
}
