//! Torrent Builder
//!
//! Streams a file (or every file under a directory) through SHA-1 in
//! fixed-size pieces and assembles the resulting [`Torrent`].
//!
//! ```no_run
//! use torrent_forge::torrent::TorrentBuilder;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let torrent = TorrentBuilder::new("path/to/file.zip")
//!     .piece_length(262144)
//!     .announce("http://tracker.example.com/announce")
//!     .web_seed("http://mirror.example.com/file.zip")
//!     .build()?;
//!
//! std::fs::write("file.zip.torrent", torrent.to_bytes())?;
//! # Ok(())
//! # }
//! ```

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use sha1::{Digest, Sha1};
use tracing::debug;
use walkdir::WalkDir;

use super::error::TorrentError;
use super::metainfo::{FileEntry, Layout, Torrent, PIECE_HASH_LEN};

/// Default piece length (256 KiB).
pub const DEFAULT_PIECE_LENGTH: u64 = 256 * 1024;

/// Smallest accepted piece length (16 KiB, one wire block).
pub const MIN_PIECE_LENGTH: u64 = 16 * 1024;

/// Largest accepted piece length (64 MiB).
pub const MAX_PIECE_LENGTH: u64 = 64 * 1024 * 1024;

const READ_BUFFER_SIZE: usize = 64 * 1024;

// == Build ==
/// Builds a torrent for `path` with one tracker and a set of webseeds.
///
/// Webseed URLs are used verbatim. The result depends only on the file bytes
/// and the arguments, so two builds of an unchanged file are identical.
///
/// # Errors
/// [`TorrentError::Io`] if the file can't be read or changes size while it is
/// hashed; [`TorrentError::InvalidPieceLength`] for an unsupported piece size.
pub fn build(
    path: impl AsRef<Path>,
    piece_length: u64,
    tracker_url: &str,
    webseed_urls: &[String],
) -> Result<Torrent, TorrentError> {
    TorrentBuilder::new(path.as_ref())
        .piece_length(piece_length)
        .announce(tracker_url)
        .web_seeds(webseed_urls.iter().cloned())
        .build()
}

// == Torrent Builder ==
/// Fluent configuration for a single torrent build.
#[derive(Debug, Clone)]
pub struct TorrentBuilder {
    /// File or directory to hash
    source: PathBuf,
    /// Overrides the basename of `source`
    name: Option<String>,
    piece_length: u64,
    announce: Option<String>,
    web_seeds: Vec<String>,
}

impl TorrentBuilder {
    /// Starts a builder for a file or directory on disk.
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            name: None,
            piece_length: DEFAULT_PIECE_LENGTH,
            announce: None,
            web_seeds: Vec::new(),
        }
    }

    /// Sets the torrent name instead of the source basename.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the piece length in bytes.
    ///
    /// Must be a power of two between [`MIN_PIECE_LENGTH`] and
    /// [`MAX_PIECE_LENGTH`].
    pub fn piece_length(mut self, length: u64) -> Self {
        self.piece_length = length;
        self
    }

    /// Sets the tracker announce URL.
    pub fn announce(mut self, url: impl Into<String>) -> Self {
        self.announce = Some(url.into());
        self
    }

    /// Adds a webseed URL.
    pub fn web_seed(mut self, url: impl Into<String>) -> Self {
        self.web_seeds.push(url.into());
        self
    }

    /// Adds several webseed URLs, keeping their order.
    pub fn web_seeds(mut self, urls: impl IntoIterator<Item = String>) -> Self {
        self.web_seeds.extend(urls);
        self
    }

    /// Hashes the source and returns the finished torrent.
    pub fn build(self) -> Result<Torrent, TorrentError> {
        validate_piece_length(self.piece_length)?;

        let name = match &self.name {
            Some(name) => name.clone(),
            None => self
                .source
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or(TorrentError::MissingField("name"))?,
        };

        let metadata = std::fs::metadata(&self.source)?;
        let mut hasher = PieceHasher::new(self.piece_length as usize);

        let layout = if metadata.is_dir() {
            let files = collect_files(&self.source)?;
            if files.is_empty() {
                return Err(TorrentError::MissingField("files"));
            }
            let mut entries = Vec::with_capacity(files.len());
            for (disk_path, segments) in files {
                let length = hash_file(&disk_path, &mut hasher)?;
                entries.push(FileEntry {
                    path: segments,
                    length,
                });
            }
            Layout::Multi { files: entries }
        } else {
            Layout::Single {
                length: hash_file(&self.source, &mut hasher)?,
            }
        };

        let pieces = hasher.finish();
        debug!(
            "Hashed {} into {} pieces of {} bytes",
            self.source.display(),
            pieces.len() / PIECE_HASH_LEN,
            self.piece_length
        );

        Torrent::new(
            name,
            self.piece_length,
            Bytes::from(pieces),
            layout,
            self.announce,
            self.web_seeds,
        )
    }
}

fn validate_piece_length(length: u64) -> Result<(), TorrentError> {
    if !length.is_power_of_two() || !(MIN_PIECE_LENGTH..=MAX_PIECE_LENGTH).contains(&length) {
        return Err(TorrentError::InvalidPieceLength(length));
    }
    Ok(())
}

/// Lists regular files under `root` in sorted order with their path segments.
fn collect_files(root: &Path) -> io::Result<Vec<(PathBuf, Vec<String>)>> {
    let mut files = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let segments = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        files.push((entry.into_path(), segments));
    }

    Ok(files)
}

// == File Hashing ==
/// Feeds one file into `hasher` and returns its length.
fn hash_file(path: &Path, hasher: &mut PieceHasher) -> io::Result<u64> {
    let file = File::open(path)?;
    let expected = file.metadata()?.len();
    hash_reader(file, expected, hasher)
}

/// Feeds exactly `expected` bytes from `reader` into `hasher`.
///
/// Fails if the reader ends early or still has data after `expected` bytes.
fn hash_reader<R: Read>(reader: R, expected: u64, hasher: &mut PieceHasher) -> io::Result<u64> {
    let mut reader = reader.take(expected.saturating_add(1));
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    let mut total: u64 = 0;

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        total += n as u64;
        if total > expected {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "file grew while it was being hashed",
            ));
        }
        hasher.update(&buf[..n]);
    }

    if total < expected {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("file shrank while it was being hashed ({total} of {expected} bytes)"),
        ));
    }

    Ok(total)
}

// == Piece Hasher ==
/// Splits a byte stream into fixed-size pieces and hashes each one.
///
/// Pieces run across `update` calls, so several files can be fed in sequence.
#[derive(Debug)]
pub(crate) struct PieceHasher {
    piece_length: usize,
    hasher: Sha1,
    filled: usize,
    pieces: Vec<u8>,
}

impl PieceHasher {
    pub(crate) fn new(piece_length: usize) -> Self {
        Self {
            piece_length,
            hasher: Sha1::new(),
            filled: 0,
            pieces: Vec::new(),
        }
    }

    pub(crate) fn update(&mut self, mut data: &[u8]) {
        while !data.is_empty() {
            let take = (self.piece_length - self.filled).min(data.len());
            self.hasher.update(&data[..take]);
            self.filled += take;
            data = &data[take..];

            if self.filled == self.piece_length {
                self.pieces.extend_from_slice(&self.hasher.finalize_reset());
                self.filled = 0;
            }
        }
    }

    /// Closes the last, possibly short, piece and returns all digests.
    pub(crate) fn finish(mut self) -> Vec<u8> {
        if self.filled > 0 {
            self.pieces.extend_from_slice(&self.hasher.finalize());
        }
        self.pieces
    }
}
