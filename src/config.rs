//! Configuration Module
//!
//! Handles loading and validating configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};
use crate::torrent::{DEFAULT_PIECE_LENGTH, MAX_PIECE_LENGTH, MIN_PIECE_LENGTH};

/// Server and generation parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory whose files torrents are served for
    pub root_dir: PathBuf,
    /// Tracker announce URL written into every torrent
    pub tracker_url: String,
    /// Webseed base URLs; the file's location under the root is appended to each
    pub webseed_urls: Vec<String>,
    /// Piece length in bytes
    pub piece_length: u64,
    /// TTL in seconds for cached torrents
    pub cache_ttl: u64,
    /// Maximum number of torrents kept by the in-memory cache
    pub max_entries: usize,
    /// HTTP server port
    pub server_port: u16,
    /// Directory for the on-disk cache; in-memory cache when unset
    pub cache_dir: Option<PathBuf>,
    /// JSON-lines file receiving registered torrents; in-memory when unset
    pub registry_path: Option<PathBuf>,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `TORRENT_ROOT` - Served directory (default: `.`)
    /// - `TRACKER_URL` - Announce URL (default: `http://localhost:6969/announce`)
    /// - `WEBSEED_URLS` - Comma separated webseed base URLs (default: none)
    /// - `PIECE_LENGTH` - Piece length in bytes (default: 262144)
    /// - `CACHE_TTL` - Cache TTL in seconds (default: 3600)
    /// - `MAX_ENTRIES` - Maximum in-memory cache entries (default: 1000)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CACHE_DIR` - On-disk cache directory (default: unset)
    /// - `REGISTRY_PATH` - Registry JSON-lines file (default: unset)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a Config from any key lookup, applying the same defaults as
    /// [`Config::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            root_dir: lookup("TORRENT_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.root_dir),
            tracker_url: lookup("TRACKER_URL").unwrap_or(defaults.tracker_url),
            webseed_urls: lookup("WEBSEED_URLS")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or(defaults.webseed_urls),
            piece_length: parsed(&lookup, "PIECE_LENGTH").unwrap_or(defaults.piece_length),
            cache_ttl: parsed(&lookup, "CACHE_TTL").unwrap_or(defaults.cache_ttl),
            max_entries: parsed(&lookup, "MAX_ENTRIES").unwrap_or(defaults.max_entries),
            server_port: parsed(&lookup, "SERVER_PORT").unwrap_or(defaults.server_port),
            cache_dir: lookup("CACHE_DIR")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            registry_path: lookup("REGISTRY_PATH")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        }
    }

    /// Checks values that can't be defaulted away.
    pub fn validate(&self) -> Result<()> {
        if !self.root_dir.is_dir() {
            return Err(Error::Config(format!(
                "root directory {} does not exist",
                self.root_dir.display()
            )));
        }

        Url::parse(&self.tracker_url)
            .map_err(|e| Error::Config(format!("tracker url {:?}: {}", self.tracker_url, e)))?;

        for seed in &self.webseed_urls {
            let url =
                Url::parse(seed).map_err(|e| Error::Config(format!("webseed url {seed:?}: {e}")))?;
            if url.cannot_be_a_base() {
                return Err(Error::Config(format!("webseed url {seed:?} cannot be a base")));
            }
        }

        if !self.piece_length.is_power_of_two()
            || !(MIN_PIECE_LENGTH..=MAX_PIECE_LENGTH).contains(&self.piece_length)
        {
            return Err(Error::Config(format!(
                "piece length {} must be a power of two between {} and {}",
                self.piece_length, MIN_PIECE_LENGTH, MAX_PIECE_LENGTH
            )));
        }

        if self.cache_ttl == 0 {
            return Err(Error::Config("cache ttl must be positive".into()));
        }

        Ok(())
    }

    /// Cache TTL as a Duration.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl)
    }
}

/// Parses a numeric value; missing or unparsable values yield `None`.
fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|v| v.trim().parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("."),
            tracker_url: "http://localhost:6969/announce".to_string(),
            webseed_urls: Vec::new(),
            piece_length: DEFAULT_PIECE_LENGTH,
            cache_ttl: 3600,
            max_entries: 1000,
            server_port: 3000,
            cache_dir: None,
            registry_path: None,
        }
    }
}
