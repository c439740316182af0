use std::path::{Path, PathBuf};

use md5::{Digest, Md5};
use tokio::fs;
use tracing::{debug, warn};

use crate::core::error::{LoaderError, LoaderResult};

/// Content-verified store of downloaded builds.
///
/// Layout: `<root>/cache/version/<file name>`. The store keeps at most one
/// file per [`base_name`]; caching a new build evicts its predecessors.
#[derive(Debug, Clone)]
pub struct ChecksumCache {
    version_dir: PathBuf,
}

impl ChecksumCache {
    /// Open the cache under `root`, creating `cache/version/` if absent.
    pub async fn open(root: &Path) -> LoaderResult<Self> {
        let version_dir = root.join("cache").join("version");
        fs::create_dir_all(&version_dir)
            .await
            .map_err(|e| LoaderError::io(&version_dir, e))?;
        Ok(Self { version_dir })
    }

    pub fn version_dir(&self) -> &Path {
        &self.version_dir
    }

    /// Lowercase hex MD5 of `bytes`.
    pub fn checksum(bytes: &[u8]) -> String {
        let mut hasher = Md5::new();
        hasher.update(bytes);
        hex::encode(hasher.finalize())
    }

    /// Write `bytes` as `name`, first evicting older builds sharing its base name.
    pub async fn store(&self, name: &str, bytes: &[u8]) -> LoaderResult<PathBuf> {
        self.evict_siblings(name).await?;

        let path = self.version_dir.join(name);
        fs::write(&path, bytes)
            .await
            .map_err(|e| LoaderError::io(&path, e))?;
        debug!("Cached new version: {}", name);
        Ok(path)
    }

    /// `true` iff `name` is cached and its MD5 equals `expected` (any case).
    pub async fn verify(&self, name: &str, expected: &str) -> bool {
        let path = self.version_dir.join(name);
        match fs::read(&path).await {
            Ok(bytes) => Self::checksum(&bytes).eq_ignore_ascii_case(expected.trim()),
            Err(_) => false,
        }
    }

    pub async fn lookup(&self, name: &str) -> Option<PathBuf> {
        let path = self.version_dir.join(name);
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Some(path),
            _ => None,
        }
    }

    async fn evict_siblings(&self, name: &str) -> LoaderResult<()> {
        let base = base_name(name);
        let mut entries = fs::read_dir(&self.version_dir)
            .await
            .map_err(|e| LoaderError::io(&self.version_dir, e))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| LoaderError::io(&self.version_dir, e))?
        {
            let file_name = entry.file_name().to_string_lossy().to_string();
            if !file_name.ends_with(".jar") || file_name == name {
                continue;
            }
            if base_name(&file_name) != base {
                continue;
            }
            let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
            if !is_file {
                continue;
            }

            let path = entry.path();
            match fs::remove_file(&path).await {
                Ok(()) => debug!("Deleted old version: {}", file_name),
                Err(e) => warn!("Failed to delete old version {}: {}", file_name, e),
            }
        }

        Ok(())
    }
}

/// Group key for eviction: cut at the last `-`, then at the last `.`.
///
/// `lambda-0.1.1+1.21.1-20240101.000000-3.jar` → `lambda-0.1.1+1.21.1-20240101`
/// `lambda-0.1.0+1.21.1.jar` → `lambda`
pub fn base_name(file_name: &str) -> &str {
    let without_suffix = file_name
        .rfind('-')
        .map(|idx| &file_name[..idx])
        .unwrap_or(file_name);
    without_suffix
        .rfind('.')
        .map(|idx| &without_suffix[..idx])
        .unwrap_or(without_suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jar_names(cache: &ChecksumCache) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(cache.version_dir())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn checksum_matches_known_md5() {
        assert_eq!(
            ChecksumCache::checksum(b""),
            "d41d8cd98f00b204e9800998ecf8427e"
        );
        assert_eq!(
            ChecksumCache::checksum(b"The quick brown fox jumps over the lazy dog"),
            "9e107d9d372bb6826bd81d3542a419d6"
        );
        let first = ChecksumCache::checksum(b"lambda");
        assert_eq!(first, ChecksumCache::checksum(b"lambda"));
    }

    #[tokio::test]
    async fn open_creates_version_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = ChecksumCache::open(tmp.path()).await.unwrap();
        assert!(cache.version_dir().is_dir());
        assert_eq!(cache.version_dir(), tmp.path().join("cache").join("version"));
    }

    #[tokio::test]
    async fn verify_after_store() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = ChecksumCache::open(tmp.path()).await.unwrap();
        let bytes = b"jar contents".to_vec();

        cache.store("lambda-1.0.0.jar", &bytes).await.unwrap();

        let digest = ChecksumCache::checksum(&bytes);
        assert!(cache.verify("lambda-1.0.0.jar", &digest).await);
        assert!(cache.verify("lambda-1.0.0.jar", &digest.to_uppercase()).await);
        assert!(!cache.verify("lambda-1.0.0.jar", "00000000000000000000000000000000").await);
    }

    #[tokio::test]
    async fn verify_missing_entry_is_false() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = ChecksumCache::open(tmp.path()).await.unwrap();
        assert!(!cache.verify("absent.jar", &ChecksumCache::checksum(b"")).await);
        assert!(cache.lookup("absent.jar").await.is_none());
    }

    #[tokio::test]
    async fn lookup_ignores_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = ChecksumCache::open(tmp.path()).await.unwrap();
        std::fs::create_dir(cache.version_dir().join("lambda-1.0.0.jar")).unwrap();
        assert!(cache.lookup("lambda-1.0.0.jar").await.is_none());
    }

    #[tokio::test]
    async fn store_keeps_single_slot_per_base_name() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = ChecksumCache::open(tmp.path()).await.unwrap();

        cache
            .store("lambda-0.1.1+1.21.1-20240101.000000-3.jar", b"build 3")
            .await
            .unwrap();
        cache
            .store("lambda-0.1.1+1.21.1-20240101.000000-4.jar", b"build 4")
            .await
            .unwrap();

        assert_eq!(
            jar_names(&cache),
            vec!["lambda-0.1.1+1.21.1-20240101.000000-4.jar".to_string()]
        );
    }

    #[tokio::test]
    async fn store_leaves_other_families_alone() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = ChecksumCache::open(tmp.path()).await.unwrap();

        cache.store("loader-1.0.0.jar", b"loader").await.unwrap();
        cache.store("lambda-0.1.0+1.21.1.jar", b"stable").await.unwrap();
        cache.store("lambda-0.1.0+1.21.4.jar", b"stable newer").await.unwrap();

        assert_eq!(
            jar_names(&cache),
            vec![
                "lambda-0.1.0+1.21.4.jar".to_string(),
                "loader-1.0.0.jar".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn store_overwrites_same_name() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = ChecksumCache::open(tmp.path()).await.unwrap();

        cache.store("lambda-1.0.0.jar", b"old").await.unwrap();
        let path = cache.store("lambda-1.0.0.jar", b"new").await.unwrap();

        assert_eq!(std::fs::read(path).unwrap(), b"new");
        assert_eq!(
            cache.lookup("lambda-1.0.0.jar").await,
            Some(cache.version_dir().join("lambda-1.0.0.jar"))
        );
    }

    #[test]
    fn base_name_strips_build_suffix_then_extension() {
        assert_eq!(
            base_name("lambda-0.1.1+1.21.1-20240101.000000-3.jar"),
            "lambda-0.1.1+1.21.1-20240101"
        );
        assert_eq!(base_name("lambda-0.1.0+1.21.1.jar"), "lambda");
        assert_eq!(base_name("plain.jar"), "plain");
        assert_eq!(base_name("noext"), "noext");
    }
}
