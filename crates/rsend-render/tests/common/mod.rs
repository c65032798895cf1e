//! Counting fake engines and a cache fixture shared by the integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rsend_media::{
    Dimensions, ImageEngine, ImageOp, MediaError, MediaResult, PostCompressor, VideoEngine,
    VideoOps,
};
use rsend_models::SizeSpec;
use rsend_render::{RenderConfig, RenderDispatcher, RenderOrchestrator};
use rsend_storage::LocalCacheStore;
use tempfile::TempDir;

/// Probed size reported by the fake image engine.
pub const SOURCE_DIMENSIONS: Dimensions = Dimensions {
    width: 1000,
    height: 500,
};

#[derive(Default)]
pub struct FakeImageEngine {
    pub transforms: AtomicUsize,
    pub probes: AtomicUsize,
    pub delay: Duration,
    pub fail: bool,
    pub last_ops: Mutex<Vec<ImageOp>>,
}

#[async_trait]
impl ImageEngine for FakeImageEngine {
    async fn probe_dimensions(&self, _input: &[u8]) -> MediaResult<Dimensions> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        Ok(SOURCE_DIMENSIONS)
    }

    async fn transform(
        &self,
        input: Vec<u8>,
        ops: &[ImageOp],
        format: &str,
        output: &Path,
    ) -> MediaResult<()> {
        *self.last_ops.lock().unwrap() = ops.to_vec();

        // Leave a partial file behind before failing or finishing.
        tokio::fs::write(output, b"partial").await?;
        self.transforms.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;

        if self.fail {
            return Err(MediaError::invalid_image("engine exploded"));
        }

        let mut rendered = format!("{}:", format).into_bytes();
        rendered.extend_from_slice(&input);
        tokio::fs::write(output, rendered).await?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum VideoCall {
    Transcode(VideoOps),
    Screenshot {
        timestamp: String,
        size: Option<SizeSpec>,
        input_ext: Option<String>,
    },
}

#[derive(Default)]
pub struct FakeVideoEngine {
    pub calls: Mutex<Vec<VideoCall>>,
    pub delay: Duration,
    /// Report success without writing a frame, like FFmpeg seeking past the end.
    pub silent: bool,
}

impl FakeVideoEngine {
    pub fn calls(&self) -> Vec<VideoCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl VideoEngine for FakeVideoEngine {
    async fn transcode(&self, input: &Path, ops: &VideoOps, output: &Path) -> MediaResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push(VideoCall::Transcode(ops.clone()));
        tokio::time::sleep(self.delay).await;
        tokio::fs::copy(input, output).await?;
        Ok(())
    }

    async fn screenshot(
        &self,
        input: &Path,
        timestamp: &str,
        size: Option<SizeSpec>,
        output: &Path,
    ) -> MediaResult<()> {
        self.calls.lock().unwrap().push(VideoCall::Screenshot {
            timestamp: timestamp.to_string(),
            size,
            input_ext: input
                .extension()
                .map(|e| e.to_string_lossy().into_owned()),
        });
        tokio::time::sleep(self.delay).await;
        if !self.silent {
            tokio::fs::write(output, b"frame").await?;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct CountingCompressor {
    pub calls: AtomicUsize,
}

#[async_trait]
impl PostCompressor for CountingCompressor {
    async fn compress(&self, _location: &Path, _format: &str) -> MediaResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Source directory, cache directory and an orchestrator over the fakes.
pub struct Harness {
    pub dir: TempDir,
    pub sources: PathBuf,
    pub store: Arc<LocalCacheStore>,
    pub image: Arc<FakeImageEngine>,
    pub video: Arc<FakeVideoEngine>,
    pub compressor: Arc<CountingCompressor>,
    pub orchestrator: RenderOrchestrator,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_engines(FakeImageEngine::default(), FakeVideoEngine::default()).await
    }

    pub async fn with_engines(image: FakeImageEngine, video: FakeVideoEngine) -> Self {
        let dir = TempDir::new().unwrap();
        let sources = dir.path().join("sources");
        tokio::fs::create_dir_all(&sources).await.unwrap();

        let config = RenderConfig {
            cache_root: dir.path().join("cache"),
            ..RenderConfig::default()
        };
        let store = Arc::new(LocalCacheStore::init(&config.cache_root).await.unwrap());
        let image = Arc::new(image);
        let video = Arc::new(video);
        let compressor = Arc::new(CountingCompressor::default());

        let dispatcher = RenderDispatcher::new(
            image.clone(),
            video.clone(),
            compressor.clone(),
            store.clone(),
        );
        let orchestrator = RenderOrchestrator::new(&config, store.clone(), dispatcher);

        Self {
            dir,
            sources,
            store,
            image,
            video,
            compressor,
            orchestrator,
        }
    }

    /// Write a source file and return its path and mtime in milliseconds.
    pub async fn source(&self, name: &str, bytes: &[u8]) -> (PathBuf, i64) {
        let path = self.sources.join(name);
        tokio::fs::write(&path, bytes).await.unwrap();
        let modified = tokio::fs::metadata(&path).await.unwrap().modified().unwrap();
        let mtime = chrono::DateTime::<chrono::Utc>::from(modified).timestamp_millis();
        (path, mtime)
    }

    pub fn cache_root(&self) -> PathBuf {
        self.dir.path().join("cache")
    }

    /// Every file name currently in the cache root, staging files included.
    pub fn cache_entries(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.cache_root())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    pub fn transforms(&self) -> usize {
        self.image.transforms.load(Ordering::SeqCst)
    }
}
