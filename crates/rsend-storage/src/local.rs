//! Directory-backed cache store.

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use rsend_models::CacheKey;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};
use crate::staging::StagedFile;
use crate::store::{ArtifactReader, CacheStore};

/// Mode of published artifacts.
#[cfg(unix)]
const ARTIFACT_MODE: u32 = 0o644;

/// Cache store keeping one file per key directly under a root directory.
#[derive(Debug, Clone)]
pub struct LocalCacheStore {
    root: PathBuf,
}

impl LocalCacheStore {
    /// Create the root directory if needed and open the store.
    ///
    /// Called once by whoever owns the process; nothing else creates the
    /// cache directory.
    pub async fn init(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        info!(root = %root.display(), "Cache store ready");
        Ok(Self { root })
    }
}

/// Reject keys that are not a single plain file name.
fn check_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::invalid_path("empty cache key"));
    }
    if key.contains(['/', '\\', '\0']) {
        return Err(StorageError::invalid_path(format!(
            "cache key '{}' contains a path separator",
            key
        )));
    }

    let mut components = Path::new(key).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(StorageError::invalid_path(format!(
            "cache key '{}' is not a plain file name",
            key
        ))),
    }
}

#[async_trait]
impl CacheStore for LocalCacheStore {
    fn root(&self) -> &Path {
        &self.root
    }

    fn resolve_path(&self, key: &CacheKey) -> StorageResult<PathBuf> {
        check_key(key.as_str())?;
        let path = self.root.join(key.as_str());

        if path.parent() != Some(self.root.as_path()) {
            return Err(StorageError::invalid_path(format!(
                "cache key '{}' resolves outside the cache root",
                key
            )));
        }

        Ok(path)
    }

    async fn exists(&self, location: &Path) -> StorageResult<bool> {
        match tokio::fs::metadata(location).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn open(&self, location: &Path) -> StorageResult<ArtifactReader> {
        match tokio::fs::File::open(location).await {
            Ok(file) => Ok(Box::new(file)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StorageError::not_found(location)),
            Err(e) => Err(e.into()),
        }
    }

    async fn stage(&self, extension: &str) -> StorageResult<StagedFile> {
        let root = self.root.clone();
        let extension = extension.to_string();
        let staged = tokio::task::spawn_blocking(move || StagedFile::create_in(&root, &extension))
            .await
            .map_err(std::io::Error::other)??;
        debug!(path = %staged.path().display(), "Staged render output");
        Ok(staged)
    }

    async fn persist(&self, staged: StagedFile, location: &Path) -> StorageResult<()> {
        let persist_failed = |source| StorageError::PersistFailed {
            path: location.to_path_buf(),
            source,
        };

        // tempfile creates 0600 files; artifacts are served by other processes too.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tokio::fs::set_permissions(
                staged.path(),
                std::fs::Permissions::from_mode(ARTIFACT_MODE),
            )
            .await
            .map_err(persist_failed)?;
        }

        tokio::fs::rename(staged.path(), location)
            .await
            .map_err(persist_failed)?;
        staged.disarm();
        debug!(location = %location.display(), "Artifact published");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    async fn store() -> (TempDir, LocalCacheStore) {
        let dir = TempDir::new().unwrap();
        let store = LocalCacheStore::init(dir.path().join("cache")).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_init_creates_root() {
        let (_dir, store) = store().await;
        assert!(store.root().is_dir());
    }

    #[tokio::test]
    async fn test_resolve_path_under_root() {
        let (_dir, store) = store().await;
        let key = CacheKey::from_string("a-1554300855285-100x100.jpg");
        let path = store.resolve_path(&key).unwrap();
        assert_eq!(path, store.root().join("a-1554300855285-100x100.jpg"));
    }

    #[tokio::test]
    async fn test_resolve_path_rejects_traversal() {
        let (_dir, store) = store().await;
        for bad in ["../etc/passwd", "..", ".", "a/b.jpg", "a\\..\\b.jpg", "/abs.jpg", "", "nul\0.jpg"] {
            let err = store.resolve_path(&CacheKey::from_string(bad)).unwrap_err();
            assert!(matches!(err, StorageError::InvalidPath(_)), "accepted {:?}", bad);
        }
    }

    #[tokio::test]
    async fn test_exists_and_open() {
        let (_dir, store) = store().await;
        let location = store.resolve_path(&CacheKey::from_string("x.jpg")).unwrap();
        assert!(!store.exists(&location).await.unwrap());

        tokio::fs::write(&location, b"pixels").await.unwrap();
        assert!(store.exists(&location).await.unwrap());

        let mut reader = store.open(&location).await.unwrap();
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await.unwrap();
        assert_eq!(buf, b"pixels");
    }

    #[tokio::test]
    async fn test_open_missing_is_not_found() {
        let (_dir, store) = store().await;
        let location = store.root().join("missing.jpg");
        assert!(matches!(
            store.open(&location).await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_exists_surfaces_probe_errors() {
        // A path "through" a regular file fails with NotADirectory, not NotFound.
        let (_dir, store) = store().await;
        let file = store.root().join("plain");
        tokio::fs::write(&file, b"x").await.unwrap();
        assert!(store.exists(&file.join("child.jpg")).await.is_err());
    }

    #[tokio::test]
    async fn test_stage_and_persist() {
        let (_dir, store) = store().await;
        let location = store.resolve_path(&CacheKey::from_string("out.png")).unwrap();

        let staged = store.stage("png").await.unwrap();
        let staged_path = staged.path().to_path_buf();
        assert_eq!(staged_path.parent(), Some(store.root()));
        tokio::fs::write(&staged_path, b"done").await.unwrap();

        store.persist(staged, &location).await.unwrap();
        assert!(!staged_path.exists());
        assert_eq!(tokio::fs::read(&location).await.unwrap(), b"done");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_persisted_artifact_is_world_readable() {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, store) = store().await;
        let location = store.resolve_path(&CacheKey::from_string("shared.jpg")).unwrap();

        let staged = store.stage("jpg").await.unwrap();
        tokio::fs::write(staged.path(), b"pixels").await.unwrap();
        store.persist(staged, &location).await.unwrap();

        let mode = tokio::fs::metadata(&location).await.unwrap().permissions().mode();
        assert_eq!(mode & 0o777, ARTIFACT_MODE);
    }

    #[tokio::test]
    async fn test_dropped_stage_leaves_nothing() {
        let (_dir, store) = store().await;
        let staged = store.stage("mp4").await.unwrap();
        tokio::fs::write(staged.path(), b"half").await.unwrap();
        drop(staged);

        let mut entries = tokio::fs::read_dir(store.root()).await.unwrap();
        assert!(entries.next_entry().await.unwrap().is_none());
    }
}
