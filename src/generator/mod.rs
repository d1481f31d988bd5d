//! Generator Module
//!
//! Turns a request path into an encoded torrent. [`Resolver`] confines the
//! path to the served root, [`TorrentService`] consults the cache and builds on
//! a miss, and a [`MetadataStore`] is told about every new torrent.

mod registry;
mod resolve;
mod service;

// Re-export public types
pub use registry::{JsonLinesRegistry, MemoryRegistry, MetadataStore, TorrentRecord};
pub use resolve::{ResolvedFile, Resolver};
pub use service::{TorrentResponse, TorrentService, TORRENT_CONTENT_TYPE};
