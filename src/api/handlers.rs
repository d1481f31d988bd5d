//! API Handlers
//!
//! HTTP request handlers for each endpoint.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderValue, StatusCode, Uri},
    response::{IntoResponse, Response},
    Json,
};
use parking_lot::Mutex;

use crate::cache::{CacheBackend, CacheStore, DiskCache};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::generator::{JsonLinesRegistry, MemoryRegistry, MetadataStore, TorrentService};
use crate::models::{HealthResponse, StatsResponse};

const TORRENT_PREFIX: &str = "/torrent";

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Blocking torrent pipeline
    pub service: Arc<TorrentService>,
    /// Same backend the service writes to, read for `/stats`
    pub cache: Arc<dyn CacheBackend>,
}

impl AppState {
    pub fn new(service: Arc<TorrentService>, cache: Arc<dyn CacheBackend>) -> Self {
        Self { service, cache }
    }

    /// Creates a new AppState from configuration.
    ///
    /// `CACHE_DIR` selects the disk cache and `REGISTRY_PATH` the JSON-lines
    /// registry; otherwise both stay in memory.
    pub fn from_config(config: &Config) -> Result<Self> {
        let cache: Arc<dyn CacheBackend> = match &config.cache_dir {
            Some(dir) => Arc::new(DiskCache::open(dir)?),
            None => Arc::new(Mutex::new(CacheStore::new(config.max_entries))),
        };
        let registry: Arc<dyn MetadataStore> = match &config.registry_path {
            Some(path) => Arc::new(JsonLinesRegistry::open(path)?),
            None => Arc::new(MemoryRegistry::new()),
        };

        let service = TorrentService::new(config, cache.clone(), registry)?;
        Ok(Self::new(Arc::new(service), cache))
    }
}

/// Handler for GET /torrent/*path
///
/// Reads the raw, still percent-encoded path from the URI so the resolver
/// sees exactly what the client sent. Hashing is blocking work and runs on
/// the blocking pool.
pub async fn torrent_handler(State(state): State<AppState>, uri: Uri) -> Result<Response> {
    let request = uri
        .path()
        .strip_prefix(TORRENT_PREFIX)
        .unwrap_or_default()
        .trim_start_matches('/')
        .to_string();

    let service = state.service.clone();
    let torrent = tokio::task::spawn_blocking(move || service.torrent_for(&request))
        .await
        .map_err(|e| Error::Internal(e.to_string()))??;

    let cache_status = if torrent.cache_hit { "hit" } else { "miss" };
    let disposition = format!(
        "attachment; filename=\"{}\"",
        torrent.file_name.replace('"', "")
    );

    let mut response = (
        StatusCode::OK,
        [(header::CONTENT_TYPE, torrent.content_type)],
        torrent.bytes,
    )
        .into_response();

    let headers = response.headers_mut();
    // Names that aren't visible ASCII go without a suggested filename
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    headers.insert("x-cache", HeaderValue::from_static(cache_status));

    Ok(response)
}

/// Handler for GET /stats
///
/// Returns current cache statistics.
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    Json(StatsResponse::from(state.cache.stats()))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
