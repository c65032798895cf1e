//! Cache store abstraction.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use rsend_models::CacheKey;
use tokio::io::AsyncRead;

use crate::error::StorageResult;
use crate::staging::StagedFile;

/// Readable artifact bytes.
pub type ArtifactReader = Box<dyn AsyncRead + Send + Unpin>;

/// Existence, lookup and publication of artifacts named by cache keys.
///
/// Artifacts are append-only: once persisted under a key they are never
/// modified, only replaced by an identical render.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Directory all artifacts live in.
    fn root(&self) -> &Path;

    /// Location of the artifact for `key`. Fails when the key would escape
    /// the cache root.
    fn resolve_path(&self, key: &CacheKey) -> StorageResult<PathBuf>;

    /// Whether an artifact exists at `location`. Errors other than "not
    /// found" are returned, not treated as absence.
    async fn exists(&self, location: &Path) -> StorageResult<bool>;

    /// Open an artifact for reading.
    async fn open(&self, location: &Path) -> StorageResult<ArtifactReader>;

    /// Create a staging file for a render whose output is `.<extension>`.
    async fn stage(&self, extension: &str) -> StorageResult<StagedFile>;

    /// Atomically move a finished staging file to `location`.
    async fn persist(&self, staged: StagedFile, location: &Path) -> StorageResult<()>;
}
