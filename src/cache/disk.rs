//! Disk Cache Module
//!
//! Directory-backed cache holding one file per source path, named by
//! [`Fingerprint::path_digest`]. Each file holds a BEncoded record
//! `d7:expiresi<unix ms>e8:modifiedli<secs>ei<nanos>ee5:value<len>:<bytes>e`.
//!
//! A record only answers a lookup whose mtime matches `modified`, so a file
//! that changed misses and the following `put` overwrites the old version in
//! place. Expired records are deleted when a lookup finds them.
//!
//! Writes go to a temporary file that is renamed into place, so readers see
//! either the old record or the new one. Concurrent writers for the same key
//! race harmlessly; the last rename wins.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::bencode::{decode, encode, Value};
use crate::cache::{current_timestamp_ms, CacheBackend, CacheStats, Fingerprint};
use crate::error::Result;

const ENTRY_EXTENSION: &str = "entry";

// == Disk Record ==
/// Decoded contents of one entry file.
#[derive(Debug)]
struct DiskRecord {
    expires: u64,
    modified: (i64, i64),
    value: Bytes,
}

impl DiskRecord {
    fn matches(&self, key: &Fingerprint) -> bool {
        self.modified == modified_parts(key)
    }
}

fn modified_parts(key: &Fingerprint) -> (i64, i64) {
    let modified = key.modified();
    (
        modified.timestamp(),
        i64::from(modified.timestamp_subsec_nanos()),
    )
}

// == Disk Cache ==
/// Cache backend storing entries as files in one directory.
#[derive(Debug)]
pub struct DiskCache {
    dir: PathBuf,
    stats: Mutex<CacheStats>,
    tmp_counter: AtomicU64,
}

impl DiskCache {
    // == Constructor ==
    /// Opens (and creates if needed) a cache directory.
    pub fn open(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            stats: Mutex::new(CacheStats::new()),
            tmp_counter: AtomicU64::new(0),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &Fingerprint) -> PathBuf {
        self.dir
            .join(format!("{}.{}", key.path_digest(), ENTRY_EXTENSION))
    }

    /// Reads a record; `Ok(None)` when no file exists for the path.
    fn read_record(&self, path: &Path) -> io::Result<Option<DiskRecord>> {
        let raw = match fs::read(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };

        let record =
            decode(&raw).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let expires = record
            .get(b"expires")
            .and_then(Value::as_integer)
            .and_then(|ms| u64::try_from(ms).ok());
        let modified = match record.get(b"modified").and_then(Value::as_list) {
            Some([Value::Integer(secs), Value::Integer(nanos)]) => Some((*secs, *nanos)),
            _ => None,
        };
        let value = record.get(b"value").and_then(Value::as_bytes).cloned();

        match (expires, modified, value) {
            (Some(expires), Some(modified), Some(value)) => Ok(Some(DiskRecord {
                expires,
                modified,
                value,
            })),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "cache record missing fields",
            )),
        }
    }

    fn remove_entry(&self, path: &Path) {
        if let Err(e) = fs::remove_file(path) {
            if e.kind() != io::ErrorKind::NotFound {
                warn!("Could not remove disk cache entry {}: {}", path.display(), e);
            }
        }
    }

    fn count_entries(&self) -> usize {
        fs::read_dir(&self.dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter(|e| e.path().extension().is_some_and(|ext| ext == ENTRY_EXTENSION))
                    .count()
            })
            .unwrap_or(0)
    }
}

impl CacheBackend for DiskCache {
    fn get(&self, key: &Fingerprint) -> Option<Bytes> {
        let path = self.entry_path(key);

        match self.read_record(&path) {
            Ok(Some(record)) if !record.matches(key) => {
                debug!("Disk cache entry for {} is for another version", key);
                self.stats.lock().record_miss();
                None
            }
            Ok(Some(record)) if current_timestamp_ms() < record.expires => {
                self.stats.lock().record_hit();
                Some(record.value)
            }
            Ok(Some(_)) => {
                debug!("Disk cache entry for {} expired", key);
                self.remove_entry(&path);
                self.stats.lock().record_expired();
                None
            }
            Ok(None) => {
                self.stats.lock().record_miss();
                None
            }
            Err(e) => {
                warn!("Unreadable disk cache entry {}: {}", path.display(), e);
                self.remove_entry(&path);
                self.stats.lock().record_miss();
                None
            }
        }
    }

    fn put(&self, key: &Fingerprint, value: Bytes, ttl: Duration) -> Result<()> {
        let expires = current_timestamp_ms().saturating_add(ttl.as_millis() as u64);
        let (secs, nanos) = modified_parts(key);
        let record = Value::dict([
            ("expires", Value::Integer(expires.min(i64::MAX as u64) as i64)),
            (
                "modified",
                Value::List(vec![Value::Integer(secs), Value::Integer(nanos)]),
            ),
            ("value", Value::Bytes(value)),
        ]);

        let path = self.entry_path(key);
        let tmp = self.dir.join(format!(
            "{}.{}.{}.tmp",
            key.path_digest(),
            std::process::id(),
            self.tmp_counter.fetch_add(1, Ordering::Relaxed)
        ));

        if let Err(e) = fs::write(&tmp, encode(&record)).and_then(|_| fs::rename(&tmp, &path)) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }

        self.stats.lock().record_write();
        Ok(())
    }

    fn stats(&self) -> CacheStats {
        let mut stats = self.stats.lock().clone();
        stats.set_total_entries(self.count_entries());
        stats
    }
}
