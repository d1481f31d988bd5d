//! Torrent Forge - on-demand `.torrent` generation
//!
//! Builds torrents for files under a served directory, with a BEncode codec,
//! streaming SHA-1 piece hashing and a TTL cache keyed by file fingerprint.

pub mod api;
pub mod bencode;
pub mod cache;
pub mod config;
pub mod error;
pub mod generator;
pub mod models;
pub mod torrent;

pub use api::AppState;
pub use config::Config;
pub use error::{Error, Result};
pub use generator::{TorrentResponse, TorrentService};
