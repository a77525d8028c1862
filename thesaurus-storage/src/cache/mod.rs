//! Bounded in-process cache with lazy TTL expiry and LRU eviction.
//!
//! # Design Philosophy
//!
//! A miss is never an error: whatever is not cached can always be resolved
//! again from the registry. The cache therefore only has to guarantee that
//! it never serves something older than its TTL and never grows past its
//! capacity.
//!
//! # Expiry
//!
//! Entries are not swept in the background. Every read compares the entry's
//! `expires_at` with the clock and drops the entry if it is past due, so an
//! expired entry is never returned even if some other path skipped cleanup.
//!
//! # Example
//!
//! ```ignore
//! let cache = CacheStore::new(1000, Arc::new(SystemClock));
//! cache.put("voorarrest", value, Duration::from_secs(3600));
//! if let Some(hit) = cache.get("voorarrest") {
//!     // ...
//! }
//! ```

pub mod stats;
pub mod store;

pub use stats::CacheStats;
pub use store::{CacheEntry, CacheStore};
