//! Cache statistics snapshot.

use serde::{Deserialize, Serialize};

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses (including expired entries).
    pub misses: u64,
    /// `hits / (hits + misses)`, 0.0 before the first lookup.
    pub hit_rate: f64,
    /// Number of entries currently in cache.
    pub size: usize,
    /// Capacity of the cache.
    pub max_size: usize,
    /// Number of evictions due to capacity.
    pub evictions: u64,
    /// Number of entries dropped on read because their TTL had passed.
    pub expirations: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn compute_hit_rate(hits: u64, misses: u64) -> f64 {
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }

    /// Total number of lookups observed.
    pub fn lookups(&self) -> u64 {
        self.hits + self.misses
    }

    /// Whether occupancy is at or above `ratio` of capacity.
    pub fn is_near_capacity(&self, ratio: f64) -> bool {
        self.max_size > 0 && self.size as f64 >= ratio * self.max_size as f64
    }
}
