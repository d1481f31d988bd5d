//! Metadata Registry Module
//!
//! Receives a record for every torrent built. The record is informational;
//! nothing reads it back on the request path.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::torrent::Torrent;

// == Torrent Record ==
/// Summary of one generated torrent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TorrentRecord {
    pub name: String,
    /// Hex SHA-1 of the encoded info dictionary
    pub info_hash: String,
    pub total_length: u64,
    pub piece_length: u64,
    pub piece_count: usize,
    /// Canonical path the torrent was built from
    pub source: PathBuf,
    pub registered_at: DateTime<Utc>,
}

impl TorrentRecord {
    pub fn from_torrent(torrent: &Torrent, source: &Path) -> Self {
        Self {
            name: torrent.name().to_string(),
            info_hash: torrent.info_hash_hex(),
            total_length: torrent.total_length(),
            piece_length: torrent.piece_length(),
            piece_count: torrent.piece_count(),
            source: source.to_path_buf(),
            registered_at: Utc::now(),
        }
    }
}

// == Metadata Store ==
/// Sink notified after each successful build and before it is cached.
pub trait MetadataStore: Send + Sync {
    fn register(&self, record: &TorrentRecord) -> Result<()>;
}

// == Memory Registry ==
/// Keeps records in memory. Used when no registry file is configured.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    records: Mutex<Vec<TorrentRecord>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<TorrentRecord> {
        self.records.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl MetadataStore for MemoryRegistry {
    fn register(&self, record: &TorrentRecord) -> Result<()> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}

// == JSON Lines Registry ==
/// Appends one JSON object per line to a file.
#[derive(Debug)]
pub struct JsonLinesRegistry {
    path: PathBuf,
    /// Serializes appends so lines never interleave
    write_lock: Mutex<()>,
}

impl JsonLinesRegistry {
    /// Creates the parent directory if needed. The file itself is created on
    /// first append.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| Error::Registry(format!("{}: {}", parent.display(), e)))?;
        }
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every record back. A missing file is an empty registry.
    pub fn read_all(&self) -> Result<Vec<TorrentRecord>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::Registry(format!("{}: {}", self.path.display(), e))),
        };

        contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(|e| Error::Registry(e.to_string())))
            .collect()
    }
}

impl MetadataStore for JsonLinesRegistry {
    fn register(&self, record: &TorrentRecord) -> Result<()> {
        let mut line =
            serde_json::to_string(record).map_err(|e| Error::Registry(e.to_string()))?;
        line.push('\n');

        let _guard = self.write_lock.lock();
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| file.write_all(line.as_bytes()))
            .map_err(|e| Error::Registry(format!("{}: {}", self.path.display(), e)))?;

        debug!("Registered {} ({})", record.name, record.info_hash);
        Ok(())
    }
}
