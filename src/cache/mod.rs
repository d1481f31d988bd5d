//! Cache Module
//!
//! Expiring storage for encoded torrents, keyed by file fingerprint.
//!
//! Two backends implement [`CacheBackend`]: an in-memory [`CacheStore`]
//! (TTL + LRU bound, shared behind a mutex) and a directory-backed
//! [`DiskCache`]. Expiry is lazy in both: a stale entry is reported as a miss
//! on lookup and replaced by the next `put`.

mod disk;
mod entry;
mod fingerprint;
mod lru;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;

use crate::error::Result;

// Re-export public types
pub use disk::DiskCache;
pub use entry::{current_timestamp_ms, CacheEntry};
pub use fingerprint::Fingerprint;
pub use lru::LruTracker;
pub use stats::CacheStats;
pub use store::CacheStore;

// == Cache Backend ==
/// Generic expiring key-value store for encoded torrents.
///
/// Writes for one fingerprint are idempotent, so concurrent `put`s need no
/// coordination; the last write wins.
pub trait CacheBackend: Send + Sync {
    /// Returns the stored bytes, or `None` when absent or expired.
    fn get(&self, key: &Fingerprint) -> Option<Bytes>;

    /// Stores `value` under `key` for `ttl`.
    fn put(&self, key: &Fingerprint, value: Bytes, ttl: Duration) -> Result<()>;

    /// Current counters.
    fn stats(&self) -> CacheStats;
}

impl CacheBackend for Mutex<CacheStore> {
    fn get(&self, key: &Fingerprint) -> Option<Bytes> {
        self.lock().get(key)
    }

    fn put(&self, key: &Fingerprint, value: Bytes, ttl: Duration) -> Result<()> {
        self.lock().put(key.clone(), value, Some(ttl));
        Ok(())
    }

    fn stats(&self) -> CacheStats {
        self.lock().stats()
    }
}
