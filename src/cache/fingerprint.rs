//! Fingerprint Module
//!
//! Typed cache key derived from a resolved file path and its modification
//! time. Any write to the file moves its mtime and therefore its key, so stale
//! torrents are never served without an explicit invalidation step.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use sha1::{Digest, Sha1};

use crate::bencode::{encode, Value};

// == Fingerprint ==
/// Cache key for one version of one file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint {
    /// Canonical path of the file
    path: PathBuf,
    /// Last modification time
    modified: DateTime<Utc>,
}

impl Fingerprint {
    // == Constructor ==
    pub fn new(path: impl Into<PathBuf>, modified: impl Into<DateTime<Utc>>) -> Self {
        Self {
            path: path.into(),
            modified: modified.into(),
        }
    }

    /// Reads the modification time of `path` from the filesystem.
    pub fn for_file(path: &Path) -> io::Result<Self> {
        let modified = std::fs::metadata(path)?.modified()?;
        Ok(Self::new(path, modified))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn modified(&self) -> DateTime<Utc> {
        self.modified
    }

    // == Digest ==
    /// Flat 40-character key for backends that need a plain string.
    ///
    /// Hashes the BEncoded list `[path, seconds, nanoseconds]`; the length
    /// prefix on the path keeps the fields from running into each other.
    pub fn digest(&self) -> String {
        let value = Value::List(vec![
            Value::from(self.path.as_os_str().as_encoded_bytes().to_vec()),
            Value::Integer(self.modified.timestamp()),
            Value::Integer(i64::from(self.modified.timestamp_subsec_nanos())),
        ]);
        hex::encode(Sha1::digest(encode(&value)))
    }

    /// Flat key for the path alone; every version of a file shares it.
    pub fn path_digest(&self) -> String {
        hex::encode(Sha1::digest(self.path.as_os_str().as_encoded_bytes()))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}",
            self.path.display(),
            self.modified.to_rfc3339_opts(SecondsFormat::Nanos, true)
        )
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::{Duration, SystemTime};

    fn at(secs: i64, nanos: u32) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, nanos).unwrap()
    }

    #[test]
    fn test_equal_inputs_equal_keys() {
        let a = Fingerprint::new("/srv/files/a.zip", at(1_700_000_000, 5));
        let b = Fingerprint::new("/srv/files/a.zip", at(1_700_000_000, 5));
        assert_eq!(a, b);
        assert_eq!(a.digest(), b.digest());
    }

    #[test]
    fn test_mtime_changes_key() {
        let a = Fingerprint::new("/srv/files/a.zip", at(1_700_000_000, 0));
        let b = Fingerprint::new("/srv/files/a.zip", at(1_700_000_000, 1));
        assert_ne!(a, b);
        assert_ne!(a.digest(), b.digest());
    }

    #[test]
    fn test_path_changes_key() {
        let a = Fingerprint::new("/srv/files/a.zip", at(1_700_000_000, 0));
        let b = Fingerprint::new("/srv/files/b.zip", at(1_700_000_000, 0));
        assert_ne!(a.digest(), b.digest());
    }

    #[test]
    fn test_path_digest_ignores_mtime() {
        let a = Fingerprint::new("/srv/files/a.zip", at(1_700_000_000, 0));
        let b = Fingerprint::new("/srv/files/a.zip", at(1_800_000_000, 0));
        let c = Fingerprint::new("/srv/files/b.zip", at(1_700_000_000, 0));
        assert_eq!(a.path_digest(), b.path_digest());
        assert_ne!(a.path_digest(), c.path_digest());
        assert_ne!(a.path_digest(), a.digest());
    }

    #[test]
    fn test_fields_do_not_collide() {
        // Plain concatenation would make both of these "/a1" + "23"
        let a = Fingerprint::new("/a1", at(23, 0));
        let b = Fingerprint::new("/a", at(123, 0));
        assert_ne!(a.digest(), b.digest());
    }

    #[test]
    fn test_digest_shape() {
        let digest = Fingerprint::new("/x", at(0, 0)).digest();
        assert_eq!(digest.len(), 40);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_from_system_time() {
        let time = SystemTime::UNIX_EPOCH + Duration::from_secs(86_400);
        let fp = Fingerprint::new("/x", time);
        assert_eq!(fp.modified().timestamp(), 86_400);
        assert_eq!(fp.to_string(), "/x@1970-01-02T00:00:00.000000000Z");
    }

    #[test]
    fn test_for_file_reads_mtime() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("f.bin");
        std::fs::write(&path, b"x").unwrap();

        let fp = Fingerprint::for_file(&path).unwrap();
        assert_eq!(fp.path(), path.as_path());

        assert!(Fingerprint::for_file(&dir.path().join("missing")).is_err());
    }
}
