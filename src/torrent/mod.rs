//! Torrent Module
//!
//! The torrent metadata entity and the builder that hashes files into it.
//!
//! A built torrent encodes as:
//!
//! ```text
//! d
//!   8:announce  <tracker url>
//!   4:info d
//!     6:length        <total bytes>        (single file)
//!     5:files         l d 6:length .. 4:path l .. e e .. e   (directory)
//!     4:name          <basename>
//!     12:piece length <bytes per piece>
//!     6:pieces        <20-byte SHA-1 per piece>
//!   e
//!   8:url-list  l <webseed url> .. e
//! e
//! ```

mod builder;
mod error;
mod metainfo;

// Re-export public types
pub use builder::{
    build, TorrentBuilder, DEFAULT_PIECE_LENGTH, MAX_PIECE_LENGTH, MIN_PIECE_LENGTH,
};
pub use error::TorrentError;
pub use metainfo::{FileEntry, Layout, Torrent, PIECE_HASH_LEN};
