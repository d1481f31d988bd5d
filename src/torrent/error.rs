//! Torrent Error Module

use thiserror::Error;

use crate::bencode::BencodeError;

// == Torrent Error Enum ==
/// Errors raised while building a torrent or reading one back.
#[derive(Debug, Error)]
pub enum TorrentError {
    /// Source file unreadable, or changed while it was being hashed
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Piece length outside the accepted range or not a power of two
    #[error("invalid piece length {0}")]
    InvalidPieceLength(u64),

    /// Required metadata key absent
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// Metadata key present with the wrong type or an inconsistent value
    #[error("invalid field: {0}")]
    InvalidField(&'static str),

    /// Torrent bytes are not valid BEncode
    #[error("bencode error: {0}")]
    Bencode(#[from] BencodeError),
}
