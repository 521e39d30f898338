//! Content digests and mtime-based staleness checks.
//!
//! Uses SHA256 hashes to detect actual content changes, not just mtimes.
//! Digests are memoized in an explicit [`ChecksumCache`] owned by the caller
//! rather than in hidden global state.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::{Duration, SystemTime};

/// Digest shared by every object that has no meaningful content.
///
/// Computed once over empty input.
pub fn sentinel_digest() -> &'static str {
    static SENTINEL: OnceLock<String> = OnceLock::new();
    SENTINEL.get_or_init(|| digest_bytes(b""))
}

/// SHA256 of a byte slice, lowercase hex.
pub fn digest_bytes(content: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content);
    format!("{:x}", hasher.finalize())
}

/// SHA256 of a file's full content, streamed.
pub fn digest_file(path: &Path) -> io::Result<String> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// Memo of file digests keyed by path.
#[derive(Debug, Default)]
pub struct ChecksumCache {
    digests: HashMap<PathBuf, String>,
}

impl ChecksumCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Digest of `path`, computed at most once per cache.
    ///
    /// Read failures are not memoized so a later call can succeed.
    pub fn digest(&mut self, path: &Path) -> io::Result<String> {
        if let Some(hit) = self.digests.get(path) {
            return Ok(hit.clone());
        }
        let digest = digest_file(path)?;
        self.digests.insert(path.to_path_buf(), digest.clone());
        Ok(digest)
    }

    pub fn len(&self) -> usize {
        self.digests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.digests.is_empty()
    }
}

/// Check if a file is missing or was last modified longer ago than `max_age`.
///
/// Unreadable metadata or a modification time in the future counts as stale.
pub fn is_stale(path: &Path, max_age: Duration) -> bool {
    let Ok(meta) = path.metadata() else {
        return true;
    };
    let Ok(modified) = meta.modified() else {
        return true;
    };
    match SystemTime::now().duration_since(modified) {
        Ok(age) => age > max_age,
        Err(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sentinel_is_empty_input_digest() {
        assert_eq!(
            sentinel_digest(),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(sentinel_digest(), digest_bytes(b""));
    }

    #[test]
    fn test_digest_file_matches_bytes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("f");
        fs::write(&path, "hello\n").unwrap();
        assert_eq!(digest_file(&path).unwrap(), digest_bytes(b"hello\n"));
    }

    #[test]
    fn test_cache_memoizes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("f");
        fs::write(&path, "one").unwrap();

        let mut cache = ChecksumCache::new();
        let first = cache.digest(&path).unwrap();
        fs::write(&path, "two").unwrap();
        // Second lookup hits the memo, not the changed file.
        assert_eq!(cache.digest(&path).unwrap(), first);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_does_not_memoize_errors() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("later");
        let mut cache = ChecksumCache::new();
        assert!(cache.digest(&path).is_err());
        fs::write(&path, "now").unwrap();
        assert!(cache.digest(&path).is_ok());
    }

    #[test]
    fn test_is_stale() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snapshot");
        assert!(is_stale(&path, Duration::from_secs(3600)));
        fs::write(&path, "x").unwrap();
        assert!(!is_stale(&path, Duration::from_secs(3600)));
    }
}
