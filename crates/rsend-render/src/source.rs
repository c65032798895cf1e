//! Render sources and requests.

use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rsend_models::{SourceIdentity, TransformOptions};
use rsend_storage::{CacheStore, StagedFile};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::{RenderError, RenderResult};

/// Extension used when spooling a stream whose name has none.
const SPOOL_EXTENSION: &str = "bin";

/// Where the source bytes come from.
pub enum Source {
    /// A file on disk; its mtime is part of the cache key.
    File(PathBuf),
    /// An opaque byte stream. `name` supplies the base name and extension;
    /// with no mtime available the caller must keep names unique.
    Stream {
        name: String,
        reader: Box<dyn AsyncRead + Send + Unpin>,
    },
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::File(path) => f.debug_tuple("File").field(path).finish(),
            Source::Stream { name, .. } => f.debug_struct("Stream").field("name", name).finish(),
        }
    }
}

impl Source {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Source::File(path.into())
    }

    pub fn stream(name: impl Into<String>, reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Source::Stream {
            name: name.into(),
            reader: Box::new(reader),
        }
    }

    /// Path or declared name.
    pub fn name(&self) -> String {
        match self {
            Source::File(path) => path.to_string_lossy().into_owned(),
            Source::Stream { name, .. } => name.clone(),
        }
    }

    /// Identity used for key derivation. Files are stat'ed for their mtime.
    ///
    /// The returned future does not borrow the source, which may hold a
    /// reader that is `Send` but not `Sync`.
    pub fn identity(&self) -> impl Future<Output = RenderResult<SourceIdentity>> + Send + 'static {
        let name = self.name();
        let path = match self {
            Source::File(path) => Some(path.clone()),
            Source::Stream { .. } => None,
        };

        async move {
            let Some(path) = path else {
                return Ok(SourceIdentity::new(name, None));
            };

            let unavailable =
                |e: std::io::Error| RenderError::source_unavailable(format!("{}: {}", path.display(), e));
            let meta = tokio::fs::metadata(&path).await.map_err(unavailable)?;
            if !meta.is_file() {
                return Err(RenderError::source_unavailable(format!(
                    "{} is not a regular file",
                    path.display()
                )));
            }
            let modified = meta.modified().map_err(unavailable)?;
            let mtime_ms = DateTime::<Utc>::from(modified).timestamp_millis();
            Ok(SourceIdentity::new(name, Some(mtime_ms)))
        }
    }

    /// Read the whole source into memory.
    pub async fn read_all(self) -> RenderResult<Vec<u8>> {
        match self {
            Source::File(path) => tokio::fs::read(&path).await.map_err(|e| {
                RenderError::source_unavailable(format!("{}: {}", path.display(), e))
            }),
            Source::Stream { name, mut reader } => {
                let mut buf = Vec::new();
                reader
                    .read_to_end(&mut buf)
                    .await
                    .map_err(|e| RenderError::source_unavailable(format!("{}: {}", name, e)))?;
                Ok(buf)
            }
        }
    }

    /// A seekable local file holding the source.
    ///
    /// Files are used in place. Streams are copied to a staging file in the
    /// cache root, removed when the returned input is dropped.
    pub async fn into_local(self, store: &dyn CacheStore) -> RenderResult<LocalInput> {
        match self {
            Source::File(path) => Ok(LocalInput::Path(path)),
            Source::Stream { name, mut reader } => {
                let extension = Path::new(&name)
                    .extension()
                    .and_then(|e| e.to_str())
                    .unwrap_or(SPOOL_EXTENSION)
                    .to_ascii_lowercase();
                let spool = store.stage(&extension).await?;

                let mut file = tokio::fs::File::create(spool.path())
                    .await
                    .map_err(|e| RenderError::render_failed(format!("spool {}: {}", name, e)))?;
                tokio::io::copy(&mut reader, &mut file)
                    .await
                    .map_err(|e| RenderError::source_unavailable(format!("{}: {}", name, e)))?;

                Ok(LocalInput::Spooled(spool))
            }
        }
    }
}

/// Source bytes available at a filesystem path.
#[derive(Debug)]
pub enum LocalInput {
    Path(PathBuf),
    Spooled(StagedFile),
}

impl LocalInput {
    pub fn path(&self) -> &Path {
        match self {
            LocalInput::Path(path) => path,
            LocalInput::Spooled(staged) => staged.path(),
        }
    }
}

/// A source plus the transform to apply to it.
#[derive(Debug)]
pub struct TransformRequest {
    pub source: Source,
    pub options: TransformOptions,
}

impl TransformRequest {
    pub fn new(source: Source, options: TransformOptions) -> Self {
        Self { source, options }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsend_storage::LocalCacheStore;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_file_identity_has_mtime() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.jpg");
        tokio::fs::write(&path, b"x").await.unwrap();

        let identity = Source::file(&path).identity().await.unwrap();
        assert_eq!(identity.base_name(), Some("a"));
        assert!(identity.mtime_ms.unwrap() > 0);
    }

    #[tokio::test]
    async fn test_missing_file_is_unavailable() {
        let err = Source::file("/definitely/not/here.jpg")
            .identity()
            .await
            .unwrap_err();
        assert!(matches!(err, RenderError::SourceUnavailable(_)));
    }

    #[tokio::test]
    async fn test_stream_identity_and_read() {
        let source = Source::stream("upload.png", &b"bytes"[..]);
        let identity = source.identity().await.unwrap();
        assert_eq!(identity.mtime_ms, None);
        assert_eq!(source.read_all().await.unwrap(), b"bytes");
    }

    #[tokio::test]
    async fn test_stream_is_spooled_and_cleaned_up() {
        let dir = TempDir::new().unwrap();
        let store = LocalCacheStore::init(dir.path()).await.unwrap();

        let input = Source::stream("clip.MP4", &b"frames"[..])
            .into_local(&store)
            .await
            .unwrap();
        let path = input.path().to_path_buf();
        assert!(path.to_string_lossy().ends_with(".mp4"));
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"frames");

        drop(input);
        assert!(!path.exists());
    }
}
