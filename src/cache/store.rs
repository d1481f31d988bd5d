//! Cache Store Module
//!
//! In-memory cache engine combining HashMap storage with LRU tracking and TTL
//! expiration.

use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;

use crate::cache::{CacheEntry, CacheStats, Fingerprint, LruTracker};

// == Cache Store ==
/// In-memory torrent cache with LRU eviction and lazy TTL expiry.
#[derive(Debug)]
pub struct CacheStore {
    /// Key-value storage
    entries: HashMap<Fingerprint, CacheEntry>,
    /// LRU access tracker
    lru: LruTracker<Fingerprint>,
    /// Performance statistics
    stats: CacheStats,
    /// Maximum number of entries allowed
    max_entries: usize,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a new CacheStore holding at most `max_entries` torrents.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            stats: CacheStats::new(),
            max_entries: max_entries.max(1),
        }
    }

    // == Put ==
    /// Stores encoded torrent bytes under a fingerprint.
    ///
    /// An existing entry is replaced and its TTL restarted. At capacity the
    /// least recently used entry is evicted first.
    pub fn put(&mut self, key: Fingerprint, value: Bytes, ttl: Option<Duration>) {
        let is_overwrite = self.entries.contains_key(&key);

        if !is_overwrite && self.entries.len() >= self.max_entries {
            if let Some(evicted) = self.lru.evict_oldest() {
                self.entries.remove(&evicted);
                self.stats.record_eviction();
            }
        }

        self.entries.insert(key.clone(), CacheEntry::new(value, ttl));
        self.lru.touch(&key);

        self.stats.record_write();
        self.stats.set_total_entries(self.entries.len());
    }

    // == Get ==
    /// Returns the bytes stored for a fingerprint.
    ///
    /// Expired entries are dropped on the spot and counted as misses.
    pub fn get(&mut self, key: &Fingerprint) -> Option<Bytes> {
        let Some(entry) = self.entries.get(key) else {
            self.stats.record_miss();
            return None;
        };

        if entry.is_expired() {
            self.entries.remove(key);
            self.lru.remove(key);
            self.stats.set_total_entries(self.entries.len());
            self.stats.record_expired();
            return None;
        }

        let value = entry.value.clone();
        self.stats.record_hit();
        self.lru.touch(key);
        Some(value)
    }

    // == Remove ==
    /// Drops an entry. Returns whether one was present.
    pub fn remove(&mut self, key: &Fingerprint) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            self.lru.remove(key);
            self.stats.set_total_entries(self.entries.len());
        }
        removed
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
