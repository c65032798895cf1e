//! Streaming artifacts to a byte sink.

use std::path::Path;

use rsend_storage::CacheStore;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::error::{RenderError, RenderResult};

const CHUNK_SIZE: usize = 64 * 1024;

/// Copy the artifact at `location` into `sink`, returning the bytes written.
///
/// Sink write failures are `DeliveryFailed`; they say nothing about the
/// artifact, which stays valid for the next caller.
pub async fn deliver<W>(store: &dyn CacheStore, location: &Path, sink: &mut W) -> RenderResult<u64>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut reader = store.open(location).await?;
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut total = 0u64;

    loop {
        let n = reader.read(&mut buf).await.map_err(|e| {
            RenderError::Storage(format!("read {}: {}", location.display(), e))
        })?;
        if n == 0 {
            break;
        }
        sink.write_all(&buf[..n])
            .await
            .map_err(|e| RenderError::delivery_failed(e.to_string()))?;
        total += n as u64;
    }

    sink.flush()
        .await
        .map_err(|e| RenderError::delivery_failed(e.to_string()))?;

    debug!(location = %location.display(), bytes = total, "Artifact delivered");
    Ok(total)
}
