//! Render-if-absent orchestration.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rsend_media::{FfmpegVideoEngine, RasterCompressor, RasterEngine};
use rsend_models::{CacheKey, KeyDeriver, SourceIdentity, TransformOptions};
use rsend_storage::CacheStore;
use tokio::io::AsyncWrite;
use tokio::sync::watch;
use tracing::{debug, info, Instrument};

use crate::config::RenderConfig;
use crate::delivery;
use crate::dispatcher::RenderDispatcher;
use crate::error::{RenderError, RenderResult};
use crate::inflight::{Flight, InFlightRenders};
use crate::logging::RenderLogger;
use crate::metrics;
use crate::source::{Source, TransformRequest};

/// Where a request's artifact lives and whether this call produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub key: CacheKey,
    pub location: PathBuf,
    pub was_rendered: bool,
}

/// Composes key derivation, the cache store and the dispatcher.
///
/// At most one render runs per key at a time: concurrent callers for a key
/// that is being rendered wait for that render and share its outcome.
#[derive(Clone)]
pub struct RenderOrchestrator {
    deriver: KeyDeriver,
    store: Arc<dyn CacheStore>,
    dispatcher: RenderDispatcher,
    inflight: InFlightRenders,
    max_age: Duration,
}

impl RenderOrchestrator {
    pub fn new(config: &RenderConfig, store: Arc<dyn CacheStore>, dispatcher: RenderDispatcher) -> Self {
        Self {
            deriver: KeyDeriver::new(config.default_image_format.clone()),
            store,
            dispatcher,
            inflight: InFlightRenders::new(),
            max_age: config.max_age,
        }
    }

    /// Orchestrator with the raster engine, raster compressor and FFmpeg.
    pub fn with_default_engines(config: &RenderConfig, store: Arc<dyn CacheStore>) -> Self {
        let mut video = FfmpegVideoEngine::new();
        if let Some(timeout) = config.ffmpeg_timeout {
            video = video.with_timeout(timeout.as_secs().max(1));
        }

        let dispatcher = RenderDispatcher::new(
            Arc::new(RasterEngine::new()),
            Arc::new(video),
            Arc::new(RasterCompressor::new()),
            store.clone(),
        );
        Self::new(config, store, dispatcher)
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    /// Cache lifetime hint for delivery layers.
    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Renders currently in progress.
    pub fn in_flight(&self) -> &InFlightRenders {
        &self.inflight
    }

    /// Key for a source identity and options.
    pub fn derive_key(
        &self,
        identity: &SourceIdentity,
        options: &TransformOptions,
    ) -> RenderResult<CacheKey> {
        Ok(self.deriver.derive(identity, options)?)
    }

    /// Return the artifact for `request`, rendering it first if absent.
    pub async fn resolve(&self, request: TransformRequest) -> RenderResult<Resolution> {
        request.options.check()?;

        let identity = request.source.identity().await?;
        let key = self.derive_key(&identity, &request.options)?;
        let location = self.store.resolve_path(&key)?;

        let hit = |key: CacheKey, location: PathBuf| Resolution {
            key,
            location,
            was_rendered: false,
        };

        if self.store.exists(&location).await? {
            metrics::record_cache_hit();
            debug!(cache_key = %key, "Cache hit");
            return Ok(hit(key, location));
        }
        metrics::record_cache_miss();

        let TransformRequest { source, options } = request;

        loop {
            match self.inflight.join(&key) {
                Flight::Owner(guard) => {
                    // Another owner may have published between the probe and the join.
                    if self.store.exists(&location).await? {
                        guard.complete(Ok(()));
                        return Ok(hit(key, location));
                    }

                    let outcome = self
                        .render_owned(source, &options, &identity, &key, &location)
                        .await;
                    guard.complete(outcome.clone());
                    outcome?;

                    return Ok(Resolution {
                        key,
                        location,
                        was_rendered: true,
                    });
                }
                Flight::Waiter(waiter) => {
                    metrics::record_render_wait();
                    debug!(cache_key = %key, "Waiting for in-flight render");

                    match waiter.wait().await {
                        Some(Ok(())) => return Ok(hit(key, location)),
                        Some(Err(err)) => return Err(err),
                        None => {
                            // Owner was cancelled; take over unless it got published.
                            if self.store.exists(&location).await? {
                                return Ok(hit(key, location));
                            }
                        }
                    }
                }
            }
        }
    }

    /// `resolve`, aborted as soon as `cancel` turns true.
    ///
    /// Aborting drops the render: the source is closed, FFmpeg is killed and
    /// the staging file is removed.
    pub async fn resolve_cancellable(
        &self,
        request: TransformRequest,
        mut cancel: watch::Receiver<bool>,
    ) -> RenderResult<Resolution> {
        tokio::select! {
            biased;
            _ = cancelled(&mut cancel) => {
                info!("Render cancelled by caller");
                Err(RenderError::Cancelled)
            }
            result = self.resolve(request) => result,
        }
    }

    /// Stream the artifact at `location` into `sink`.
    pub async fn deliver<W>(&self, location: &Path, sink: &mut W) -> RenderResult<u64>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        delivery::deliver(self.store.as_ref(), location, sink).await
    }

    /// Resolve, then stream the artifact into `sink`.
    pub async fn render_and_deliver<W>(
        &self,
        request: TransformRequest,
        sink: &mut W,
    ) -> RenderResult<Resolution>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let resolution = self.resolve(request).await?;
        self.deliver(&resolution.location, sink).await?;
        Ok(resolution)
    }

    async fn render_owned(
        &self,
        source: Source,
        options: &TransformOptions,
        identity: &SourceIdentity,
        key: &CacheKey,
        location: &Path,
    ) -> RenderResult<()> {
        let format = self.deriver.output_format(identity, options);
        let params = self.dispatcher.plan(&identity.name, options, &format)?;
        let kind = params.plan.label();
        let logger = RenderLogger::new(key, kind);

        async {
            logger.log_start(&format!("{} -> {}", identity.name, params.format));
            let started = Instant::now();

            match self.dispatcher.execute(source, &params, location).await {
                Ok(()) => {
                    let elapsed = started.elapsed();
                    metrics::record_render(kind, elapsed.as_secs_f64());
                    logger.log_completion(&format!("{:.2?}", elapsed));
                    Ok(())
                }
                Err(err) => {
                    metrics::record_render_failure(kind);
                    logger.log_error(&err.to_string());
                    Err(err)
                }
            }
        }
        .instrument(logger.create_span())
        .await
    }
}

/// Resolves once the flag is true. Never resolves if the sender goes away.
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}
