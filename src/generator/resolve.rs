//! Path Resolution Module
//!
//! Maps a raw request path onto a regular file under the served root.
//!
//! Resolution runs in order:
//! 1. raw input containing `..` is rejected before any decoding
//! 2. the input is percent-decoded; `..` segments or NUL bytes are rejected
//! 3. `root/segments[skip..]` is tried for `skip = 0, 1, ..`, so a request
//!    carrying a leading alias (`/mirror/linux/iso`) still finds `linux/iso`
//! 4. the first regular file found is canonicalized and must still live under
//!    the canonical root, which catches symlinks pointing outside it

use std::io;
use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;
use tracing::{debug, warn};

use crate::error::{Error, Result};

// == Resolved File ==
/// A request that passed every safety check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFile {
    /// Canonical path of the file
    path: PathBuf,
    /// Segments of the canonical path below the canonical root
    subpath: Vec<String>,
}

impl ResolvedFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Location of the file below the root, after symlinks inside the root
    /// are followed. Every alias of one file yields the same subpath.
    pub fn subpath(&self) -> &[String] {
        &self.subpath
    }

    /// Basename of the canonical file.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

// == Resolver ==
/// Confines request paths to one root directory.
#[derive(Debug, Clone)]
pub struct Resolver {
    root: PathBuf,
    canonical_root: PathBuf,
}

impl Resolver {
    // == Constructor ==
    /// Fails if the root does not exist.
    pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        let canonical_root = root.canonicalize()?;
        Ok(Self {
            root,
            canonical_root,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    // == Resolve ==
    pub fn resolve(&self, request: &str) -> Result<ResolvedFile> {
        self.try_resolve(request).inspect_err(|e| match e {
            Error::Security(_) => warn!("Rejected request {:?}: {}", request, e),
            _ => debug!("Could not resolve {:?}: {}", request, e),
        })
    }

    fn try_resolve(&self, request: &str) -> Result<ResolvedFile> {
        if request.contains("..") {
            return Err(Error::Security(format!("{request}: parent reference")));
        }

        let decoded = percent_decode_str(request)
            .decode_utf8()
            .map_err(|_| Error::NotFound(format!("{request}: not valid UTF-8")))?;

        if decoded.contains('\0') {
            return Err(Error::Security(format!("{request}: NUL byte")));
        }

        let segments = split_segments(&decoded)?;
        if segments.is_empty() {
            return Err(Error::NotFound(format!("{request}: empty path")));
        }

        for skip in 0..segments.len() {
            let tail = &segments[skip..];
            let candidate: PathBuf = tail.iter().fold(self.root.clone(), |p, s| p.join(s));

            if !candidate.is_file() {
                continue;
            }

            let canonical = candidate.canonicalize()?;
            let Ok(relative) = canonical.strip_prefix(&self.canonical_root) else {
                return Err(Error::Security(format!(
                    "{request}: resolves outside the served root"
                )));
            };
            let subpath = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();

            if skip > 0 {
                debug!("Resolved {:?} after dropping {} leading segment(s)", request, skip);
            }

            return Ok(ResolvedFile {
                path: canonical,
                subpath,
            });
        }

        Err(Error::NotFound(request.to_string()))
    }
}

/// Splits a decoded path on `/`, dropping empty and `.` segments.
fn split_segments(decoded: &str) -> Result<Vec<String>> {
    let mut segments = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => {}
            ".." => return Err(Error::Security(format!("{decoded}: parent reference"))),
            s => segments.push(s.to_string()),
        }
    }
    Ok(segments)
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, Resolver) {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("linux/iso")).unwrap();
        fs::write(dir.path().join("linux/iso/disk.img"), b"image").unwrap();
        fs::write(dir.path().join("top.bin"), b"top").unwrap();
        fs::write(dir.path().join("with space.txt"), b"sp").unwrap();
        let resolver = Resolver::new(dir.path()).unwrap();
        (dir, resolver)
    }

    #[test]
    fn test_resolves_direct_path() {
        let (dir, resolver) = fixture();
        let resolved = resolver.resolve("linux/iso/disk.img").unwrap();

        assert_eq!(
            resolved.path(),
            dir.path().join("linux/iso/disk.img").canonicalize().unwrap()
        );
        assert_eq!(resolved.subpath(), ["linux", "iso", "disk.img"]);
        assert_eq!(resolved.name(), "disk.img");
    }

    #[test]
    fn test_leading_slash_and_dot_segments_ignored() {
        let (_dir, resolver) = fixture();
        let resolved = resolver.resolve("/./top.bin").unwrap();
        assert_eq!(resolved.subpath(), ["top.bin"]);
    }

    #[test]
    fn test_percent_decoding() {
        let (_dir, resolver) = fixture();
        let resolved = resolver.resolve("with%20space.txt").unwrap();
        assert_eq!(resolved.name(), "with space.txt");
    }

    #[test]
    fn test_fallback_drops_leading_segments() {
        let (_dir, resolver) = fixture();
        let resolved = resolver.resolve("mirror/pub/linux/iso/disk.img").unwrap();
        assert_eq!(resolved.subpath(), ["linux", "iso", "disk.img"]);
    }

    #[test]
    fn test_parent_reference_rejected() {
        let (_dir, resolver) = fixture();
        for request in ["../etc/passwd", "linux/../top.bin", "a..b"] {
            assert!(
                matches!(resolver.resolve(request), Err(Error::Security(_))),
                "{request} should be rejected"
            );
        }
    }

    #[test]
    fn test_encoded_parent_reference_rejected() {
        let (_dir, resolver) = fixture();
        assert!(matches!(
            resolver.resolve("%2e%2e/top.bin"),
            Err(Error::Security(_))
        ));
        assert!(matches!(
            resolver.resolve("linux/%2E%2E/%2e%2e/x"),
            Err(Error::Security(_))
        ));
    }

    #[test]
    fn test_nul_byte_rejected() {
        let (_dir, resolver) = fixture();
        assert!(matches!(
            resolver.resolve("top.bin%00.txt"),
            Err(Error::Security(_))
        ));
    }

    #[test]
    fn test_missing_file_not_found() {
        let (_dir, resolver) = fixture();
        assert!(matches!(resolver.resolve("nope.bin"), Err(Error::NotFound(_))));
        assert!(matches!(resolver.resolve(""), Err(Error::NotFound(_))));
        assert!(matches!(resolver.resolve("///"), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_directory_is_not_a_match() {
        let (_dir, resolver) = fixture();
        assert!(matches!(resolver.resolve("linux/iso"), Err(Error::NotFound(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_escape_rejected() {
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("secret"), b"secret").unwrap();

        let (dir, resolver) = fixture();
        std::os::unix::fs::symlink(outside.path().join("secret"), dir.path().join("link"))
            .unwrap();

        assert!(matches!(resolver.resolve("link"), Err(Error::Security(_))));
        // Reached through the fallback, still rejected
        assert!(matches!(resolver.resolve("mirror/link"), Err(Error::Security(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_inside_root_allowed() {
        let (dir, resolver) = fixture();
        std::os::unix::fs::symlink(dir.path().join("top.bin"), dir.path().join("alias.bin"))
            .unwrap();

        let resolved = resolver.resolve("alias.bin").unwrap();
        assert_eq!(resolved.name(), "top.bin");
        assert_eq!(resolved.subpath(), ["top.bin"]);
    }
}
