use std::path::{Path, PathBuf};
use crate::global::dirs::get_global_cache_dir;
use crate::util::{format_hash, sha256_path};
use anyhow::{anyhow, Context, Result};
use tracing::{debug, warn};

/// Release archives downloaded by the installer, keyed by archive file name.
///
/// An entry is only handed back when its content still hashes to the checksum
/// the caller expects; stale or corrupted entries are dropped on lookup.
#[derive(Debug, Clone)]
pub struct ArchiveCache {
    dir: PathBuf,
}

impl ArchiveCache {
    pub fn new<P: Into<PathBuf>>(dir: P) -> Self {
        Self { dir: dir.into() }
    }

    /// Cache rooted in the per-user cache directory.
    pub fn global() -> Result<Self> {
        Ok(Self::new(get_global_cache_dir()?))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, url: &str) -> Result<PathBuf> {
        let file_name = url
            .split('/')
            .next_back()
            .filter(|s| !s.is_empty())
            .ok_or(anyhow!("Could not determine archive name from {url}"))?;
        Ok(self.dir.join(file_name))
    }

    /// Returns the cached archive for `url` if it matches `checksum`.
    pub fn get(&self, url: &str, checksum: &str) -> Result<Option<Vec<u8>>> {
        let path = self.entry_path(url)?;
        if !path.exists() {
            return Ok(None);
        }
        let digest = sha256_path(&path)
            .with_context(|| format!("Could not hash cached archive {:?}", path))?;
        if digest == format_hash(checksum) {
            debug!(path = %path.display(), "archive cache hit");
            let bytes = std::fs::read(&path)
                .with_context(|| format!("Could not read cached archive {:?}", path))?;
            Ok(Some(bytes))
        } else {
            warn!(path = %path.display(), "cached archive does not match checksum, discarding");
            std::fs::remove_file(&path)?;
            Ok(None)
        }
    }

    pub fn store(&self, url: &str, bytes: &[u8]) -> Result<PathBuf> {
        if !self.dir.exists() {
            std::fs::create_dir_all(&self.dir)
                .with_context(|| format!("Could not create cache dir {:?}", self.dir))?;
            debug!(dir = %self.dir.display(), "cache directory created");
        }
        let path = self.entry_path(url)?;
        std::fs::write(&path, bytes)
            .with_context(|| format!("Could not write cache file {:?}", path))?;
        Ok(path)
    }

    pub fn clean(&self) -> Result<()> {
        if self.dir.exists() {
            std::fs::remove_dir_all(&self.dir)?;
        }
        std::fs::create_dir_all(&self.dir)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::sha256_hex;
    use tempfile::tempdir;

    const URL: &str = "https://example.com/releases/download/v1.0.0/tool-linux-x86_64.zip";

    #[test]
    fn test_store_then_get_with_matching_checksum() {
        let dir = tempdir().unwrap();
        let cache = ArchiveCache::new(dir.path().join("archives"));
        let path = cache.store(URL, b"archive").unwrap();
        assert!(path.ends_with("tool-linux-x86_64.zip"));

        let hit = cache.get(URL, &sha256_hex(b"archive")).unwrap();
        assert_eq!(hit.as_deref(), Some(&b"archive"[..]));
    }

    #[test]
    fn test_get_discards_mismatched_entry() {
        let dir = tempdir().unwrap();
        let cache = ArchiveCache::new(dir.path());
        let path = cache.store(URL, b"tampered").unwrap();

        let hit = cache.get(URL, &sha256_hex(b"archive")).unwrap();
        assert!(hit.is_none());
        assert!(!path.exists());
    }

    #[test]
    fn test_clean_empties_directory() {
        let dir = tempdir().unwrap();
        let cache = ArchiveCache::new(dir.path().join("archives"));
        cache.store(URL, b"archive").unwrap();
        cache.clean().unwrap();
        assert!(cache.dir().exists());
        assert_eq!(std::fs::read_dir(cache.dir()).unwrap().count(), 0);
    }
}
