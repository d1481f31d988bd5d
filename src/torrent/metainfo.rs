//! Torrent Metainfo
//!
//! The immutable torrent entity and its conversion to and from a BEncode
//! dictionary.

use std::collections::BTreeMap;

use bytes::Bytes;
use sha1::{Digest, Sha1};

use super::error::TorrentError;
use crate::bencode::{decode, encode, Value};

/// Size of one SHA-1 piece digest.
pub const PIECE_HASH_LEN: usize = 20;

/// `info` keys this type models; anything else is carried through untouched.
const INFO_KEYS: [&[u8]; 5] = [b"files", b"length", b"name", b"piece length", b"pieces"];

// == File Entry ==
/// One file of a multi-file torrent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Path segments relative to the torrent root directory
    pub path: Vec<String>,
    /// File size in bytes
    pub length: u64,
}

// == Layout ==
/// How the hashed byte stream maps onto files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layout {
    /// A single file named after the torrent
    Single { length: u64 },
    /// A directory; files are concatenated in list order
    Multi { files: Vec<FileEntry> },
}

impl Layout {
    /// Total number of bytes covered by the piece hashes.
    pub fn total_length(&self) -> u64 {
        match self {
            Layout::Single { length } => *length,
            Layout::Multi { files } => files.iter().map(|f| f.length).sum(),
        }
    }
}

// == Torrent ==
/// Metadata of a `.torrent` file.
///
/// Always satisfies `pieces().len() == piece_count() * 20` where
/// `piece_count() == ceil(total_length / piece_length)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Torrent {
    name: String,
    piece_length: u64,
    pieces: Bytes,
    layout: Layout,
    announce: Option<String>,
    web_seeds: Vec<String>,
    /// Unmodelled `info` keys (`private`, `source`, ..) kept so a parsed
    /// torrent re-encodes to the same info hash
    info_extra: BTreeMap<Bytes, Value>,
}

impl Torrent {
    // == Constructor ==
    /// Assembles a torrent, checking the piece invariant.
    pub(crate) fn new(
        name: String,
        piece_length: u64,
        pieces: Bytes,
        layout: Layout,
        announce: Option<String>,
        web_seeds: Vec<String>,
    ) -> Result<Self, TorrentError> {
        if name.is_empty() {
            return Err(TorrentError::MissingField("name"));
        }
        if piece_length == 0 || piece_length > i64::MAX as u64 {
            return Err(TorrentError::InvalidPieceLength(piece_length));
        }
        if let Layout::Multi { files } = &layout {
            if files.iter().any(|f| f.path.is_empty()) {
                return Err(TorrentError::InvalidField("path"));
            }
        }

        let total = match &layout {
            Layout::Single { length } => Some(*length),
            Layout::Multi { files } => files
                .iter()
                .try_fold(0u64, |acc, f| acc.checked_add(f.length)),
        }
        .filter(|total| *total <= i64::MAX as u64)
        .ok_or(TorrentError::InvalidField("length"))?;

        let expected = usize::try_from(total.div_ceil(piece_length))
            .ok()
            .and_then(|count| count.checked_mul(PIECE_HASH_LEN))
            .ok_or(TorrentError::InvalidField("length"))?;
        if pieces.len() != expected {
            return Err(TorrentError::InvalidField("pieces"));
        }

        Ok(Self {
            name,
            piece_length,
            pieces,
            layout,
            announce,
            web_seeds,
            info_extra: BTreeMap::new(),
        })
    }

    // == Accessors ==
    /// Suggested file or directory name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bytes per piece.
    pub fn piece_length(&self) -> u64 {
        self.piece_length
    }

    /// Concatenated SHA-1 digests, one per piece, in file order.
    pub fn pieces(&self) -> &[u8] {
        &self.pieces
    }

    /// Digest of piece `index`.
    pub fn piece_hash(&self, index: usize) -> Option<&[u8]> {
        let start = index.checked_mul(PIECE_HASH_LEN)?;
        self.pieces.get(start..start.checked_add(PIECE_HASH_LEN)?)
    }

    /// Number of pieces.
    pub fn piece_count(&self) -> usize {
        self.pieces.len() / PIECE_HASH_LEN
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn total_length(&self) -> u64 {
        self.layout.total_length()
    }

    /// Tracker announce URL.
    pub fn announce(&self) -> Option<&str> {
        self.announce.as_deref()
    }

    /// Webseed URLs, carried under `url-list`.
    pub fn web_seeds(&self) -> &[String] {
        &self.web_seeds
    }

    /// `info` entries read from a foreign torrent that this type doesn't model.
    pub fn info_extra(&self) -> &BTreeMap<Bytes, Value> {
        &self.info_extra
    }

    // == Info Dictionary ==
    /// The `info` dictionary; its encoding is what the info hash covers.
    pub fn info_value(&self) -> Value {
        let mut info = self.info_extra.clone();

        info.insert(Bytes::from_static(b"name"), Value::string(&self.name));
        info.insert(
            Bytes::from_static(b"piece length"),
            Value::Integer(self.piece_length as i64),
        );
        info.insert(Bytes::from_static(b"pieces"), Value::Bytes(self.pieces.clone()));

        match &self.layout {
            Layout::Single { length } => {
                info.insert(Bytes::from_static(b"length"), Value::Integer(*length as i64));
            }
            Layout::Multi { files } => {
                let list = files
                    .iter()
                    .map(|file| {
                        Value::dict([
                            ("length", Value::Integer(file.length as i64)),
                            (
                                "path",
                                Value::List(file.path.iter().map(|s| Value::string(s)).collect()),
                            ),
                        ])
                    })
                    .collect();
                info.insert(Bytes::from_static(b"files"), Value::List(list));
            }
        }

        Value::Dict(info)
    }

    /// SHA-1 of the encoded `info` dictionary.
    pub fn info_hash(&self) -> [u8; 20] {
        Sha1::digest(encode(&self.info_value())).into()
    }

    /// Lowercase hex form of [`Torrent::info_hash`].
    pub fn info_hash_hex(&self) -> String {
        hex::encode(self.info_hash())
    }

    // == Conversion ==
    /// Converts the torrent to its top-level BEncode dictionary.
    pub fn to_value(&self) -> Value {
        let mut root = BTreeMap::new();

        root.insert(Bytes::from_static(b"info"), self.info_value());
        if let Some(announce) = &self.announce {
            root.insert(Bytes::from_static(b"announce"), Value::string(announce));
        }
        if !self.web_seeds.is_empty() {
            root.insert(
                Bytes::from_static(b"url-list"),
                Value::List(self.web_seeds.iter().map(|s| Value::string(s)).collect()),
            );
        }

        Value::Dict(root)
    }

    /// Encodes the torrent to `.torrent` file bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        encode(&self.to_value())
    }

    /// Reads a torrent back from its BEncode dictionary.
    pub fn from_value(value: Value) -> Result<Self, TorrentError> {
        let mut root = value
            .into_dict()
            .ok_or(TorrentError::InvalidField("root"))?;
        let info = root
            .remove(b"info".as_slice())
            .ok_or(TorrentError::MissingField("info"))?;

        let name = required_str(&info, "name")?.to_string();
        let piece_length = required_uint(&info, "piece length")?;
        let pieces = info
            .get(b"pieces")
            .ok_or(TorrentError::MissingField("pieces"))?
            .as_bytes()
            .ok_or(TorrentError::InvalidField("pieces"))?
            .clone();

        let layout = match (info.get(b"length"), info.get(b"files")) {
            (Some(_), None) => Layout::Single {
                length: required_uint(&info, "length")?,
            },
            (None, Some(files)) => Layout::Multi {
                files: parse_files(files)?,
            },
            (Some(_), Some(_)) => return Err(TorrentError::InvalidField("length")),
            (None, None) => return Err(TorrentError::MissingField("length")),
        };

        let announce = match root.get(b"announce".as_slice()) {
            Some(v) => Some(
                v.as_str()
                    .ok_or(TorrentError::InvalidField("announce"))?
                    .to_string(),
            ),
            None => None,
        };

        // url-list may be a single string or a list of strings
        let web_seeds = match root.get(b"url-list".as_slice()) {
            None => Vec::new(),
            Some(Value::List(items)) => items
                .iter()
                .map(|v| v.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
                .ok_or(TorrentError::InvalidField("url-list"))?,
            Some(v) => vec![v
                .as_str()
                .ok_or(TorrentError::InvalidField("url-list"))?
                .to_string()],
        };

        let mut info_extra = info.into_dict().unwrap_or_default();
        info_extra.retain(|key, _| !INFO_KEYS.contains(&key.as_ref()));

        let mut torrent = Self::new(name, piece_length, pieces, layout, announce, web_seeds)?;
        torrent.info_extra = info_extra;
        Ok(torrent)
    }

    /// Parses `.torrent` file bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self, TorrentError> {
        Self::from_value(decode(data)?)
    }
}

// == Field Helpers ==
fn required_str<'a>(dict: &'a Value, key: &'static str) -> Result<&'a str, TorrentError> {
    dict.get(key.as_bytes())
        .ok_or(TorrentError::MissingField(key))?
        .as_str()
        .ok_or(TorrentError::InvalidField(key))
}

fn required_uint(dict: &Value, key: &'static str) -> Result<u64, TorrentError> {
    let value = dict
        .get(key.as_bytes())
        .ok_or(TorrentError::MissingField(key))?
        .as_integer()
        .ok_or(TorrentError::InvalidField(key))?;
    u64::try_from(value).map_err(|_| TorrentError::InvalidField(key))
}

fn parse_files(files: &Value) -> Result<Vec<FileEntry>, TorrentError> {
    files
        .as_list()
        .ok_or(TorrentError::InvalidField("files"))?
        .iter()
        .map(|file| {
            let path = file
                .get(b"path")
                .ok_or(TorrentError::MissingField("path"))?
                .as_list()
                .ok_or(TorrentError::InvalidField("path"))?
                .iter()
                .map(|seg| seg.as_str().map(str::to_string))
                .collect::<Option<Vec<_>>>()
                .ok_or(TorrentError::InvalidField("path"))?;
            Ok(FileEntry {
                path,
                length: required_uint(file, "length")?,
            })
        })
        .collect()
}
