//! Torrent Service Module
//!
//! Orchestrates one request: resolve the path, look up the cache by file
//! fingerprint, and on a miss build, register and cache the torrent.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, info, warn};
use url::Url;

use crate::cache::{CacheBackend, Fingerprint};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::generator::{MetadataStore, ResolvedFile, Resolver, TorrentRecord};
use crate::torrent::build;

/// MIME type of a `.torrent` file.
pub const TORRENT_CONTENT_TYPE: &str = "application/x-bittorrent";

// == Torrent Response ==
/// Encoded torrent plus what a transport needs to deliver it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TorrentResponse {
    pub bytes: Bytes,
    pub content_type: &'static str,
    /// Suggested download name, `<name>.torrent`
    pub file_name: String,
    pub cache_hit: bool,
}

impl TorrentResponse {
    fn new(bytes: Bytes, resolved: &ResolvedFile, cache_hit: bool) -> Self {
        Self {
            bytes,
            content_type: TORRENT_CONTENT_TYPE,
            file_name: format!("{}.torrent", resolved.name()),
            cache_hit,
        }
    }
}

// == Torrent Service ==
/// Blocking request handler shared by all callers.
pub struct TorrentService {
    resolver: Resolver,
    tracker_url: String,
    webseed_urls: Vec<Url>,
    piece_length: u64,
    cache_ttl: Duration,
    cache: Arc<dyn CacheBackend>,
    registry: Arc<dyn MetadataStore>,
}

impl TorrentService {
    // == Constructor ==
    pub fn new(
        config: &Config,
        cache: Arc<dyn CacheBackend>,
        registry: Arc<dyn MetadataStore>,
    ) -> Result<Self> {
        let resolver = Resolver::new(&config.root_dir)?;
        let webseed_urls = config
            .webseed_urls
            .iter()
            .map(|seed| {
                Url::parse(seed).map_err(|e| Error::Config(format!("webseed url {seed:?}: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            resolver,
            tracker_url: config.tracker_url.clone(),
            webseed_urls,
            piece_length: config.piece_length,
            cache_ttl: config.cache_ttl(),
            cache,
            registry,
        })
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    // == Resolve ==
    pub fn resolve(&self, request: &str) -> Result<ResolvedFile> {
        self.resolver.resolve(request)
    }

    // == Fingerprint ==
    pub fn fingerprint(&self, resolved: &ResolvedFile) -> Result<Fingerprint> {
        Ok(Fingerprint::for_file(resolved.path())?)
    }

    // == Webseeds ==
    /// Appends a file's location below the root to every configured webseed
    /// base. Callers pass [`ResolvedFile::subpath`], which is the same for
    /// every alias of a file, so the cached torrent fits all of them.
    pub fn webseeds_for(&self, subpath: &[String]) -> Result<Vec<String>> {
        self.webseed_urls
            .iter()
            .map(|base| {
                let mut url = base.clone();
                url.path_segments_mut()
                    .map_err(|_| Error::Config(format!("webseed url {base} cannot be a base")))?
                    .pop_if_empty()
                    .extend(subpath);
                Ok(url.to_string())
            })
            .collect()
    }

    // == Torrent For ==
    /// Returns the encoded torrent for a raw request path.
    ///
    /// A cached torrent is served while the file's mtime is unchanged. On a
    /// miss the record is registered before the bytes are cached, so a
    /// rejected registration leaves nothing behind in the cache.
    pub fn torrent_for(&self, request: &str) -> Result<TorrentResponse> {
        let resolved = self.resolve(request)?;
        let fingerprint = self.fingerprint(&resolved)?;

        if let Some(bytes) = self.cache.get(&fingerprint) {
            debug!("Cache hit for {}", fingerprint);
            return Ok(TorrentResponse::new(bytes, &resolved, true));
        }

        info!("Building torrent for {}", resolved.path().display());
        let webseeds = self.webseeds_for(resolved.subpath())?;
        let torrent = build(
            resolved.path(),
            self.piece_length,
            &self.tracker_url,
            &webseeds,
        )?;
        let bytes = Bytes::from(torrent.to_bytes());

        self.registry
            .register(&TorrentRecord::from_torrent(&torrent, resolved.path()))?;

        if let Err(e) = self.cache.put(&fingerprint, bytes.clone(), self.cache_ttl) {
            warn!("Could not cache torrent for {}: {}", fingerprint, e);
        }

        info!(
            "Built {} ({} pieces, info hash {})",
            torrent.name(),
            torrent.piece_count(),
            torrent.info_hash_hex()
        );
        Ok(TorrentResponse::new(bytes, &resolved, false))
    }
}
