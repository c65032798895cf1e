//! Render dispatch.
//!
//! Classifies the source, turns options into a concrete plan and runs the
//! matching pipeline. Output is written to a staging file in the cache root
//! and only renamed onto the artifact path once the pipeline succeeded, so a
//! failed or cancelled render never leaves a partial artifact behind.

use std::path::Path;
use std::sync::Arc;

use rsend_media::{ImageEngine, ImageOp, PostCompressor, VideoEngine, VideoOps};
use rsend_models::{
    classify, resolve_parameters, FramePlan, ImagePlan, RenderPlan, ResolvedParameters,
    TransformOptions, VideoPlan,
};
use rsend_storage::{CacheStore, StagedFile};
use tracing::debug;

use crate::error::{RenderError, RenderResult};
use crate::source::Source;

/// Runs transform pipelines against the configured engines.
#[derive(Clone)]
pub struct RenderDispatcher {
    image: Arc<dyn ImageEngine>,
    video: Arc<dyn VideoEngine>,
    compressor: Arc<dyn PostCompressor>,
    store: Arc<dyn CacheStore>,
}

impl RenderDispatcher {
    pub fn new(
        image: Arc<dyn ImageEngine>,
        video: Arc<dyn VideoEngine>,
        compressor: Arc<dyn PostCompressor>,
        store: Arc<dyn CacheStore>,
    ) -> Self {
        Self {
            image,
            video,
            compressor,
            store,
        }
    }

    /// Classify the source and resolve options into a plan. No I/O.
    pub fn plan(
        &self,
        source_name: &str,
        options: &TransformOptions,
        format: &str,
    ) -> RenderResult<ResolvedParameters> {
        let kind = classify(options.media_kind, source_name)?;
        Ok(resolve_parameters(kind, format, options)?)
    }

    /// Run the pipeline for `params` and publish the result at `location`.
    pub async fn execute(
        &self,
        source: Source,
        params: &ResolvedParameters,
        location: &Path,
    ) -> RenderResult<()> {
        let staged = self.store.stage(&params.format).await?;

        match &params.plan {
            RenderPlan::Image(plan) => self.run_image(source, plan, &params.format, &staged).await?,
            RenderPlan::Frame(plan) => self.run_frame(source, plan, &params.format, &staged).await?,
            RenderPlan::Video(plan) => self.run_video(source, plan, &staged).await?,
        }

        // FFmpeg exits 0 with nothing encoded when seeking past the end.
        let written = tokio::fs::metadata(staged.path())
            .await
            .map_err(|e| RenderError::render_failed(format!("stat render output: {}", e)))?
            .len();
        if written == 0 {
            return Err(RenderError::render_failed("engine produced no output"));
        }

        self.store.persist(staged, location).await?;
        Ok(())
    }

    async fn run_image(
        &self,
        source: Source,
        plan: &ImagePlan,
        format: &str,
        staged: &StagedFile,
    ) -> RenderResult<()> {
        let bytes = source.read_all().await?;
        let mut ops = Vec::new();

        if let Some(crop) = &plan.crop {
            let pixels = if crop.has_fractions() {
                let dims = self.image.probe_dimensions(&bytes).await?;
                debug!(width = dims.width, height = dims.height, "Probed source for crop");
                crop.resolve(dims.width, dims.height)
            } else {
                crop.resolve(0, 0)
            };
            ops.push(ImageOp::Crop(pixels));
        }
        if let Some((width, height)) = plan.resize {
            ops.push(ImageOp::Resize { width, height });
        }
        if plan.trim {
            ops.push(ImageOp::Trim);
        }
        if let Some(background) = plan.square {
            ops.push(ImageOp::Square(background));
        }

        self.image
            .transform(bytes, &ops, format, staged.path())
            .await?;

        if plan.minify {
            self.compressor.compress(staged.path(), format).await?;
        }
        Ok(())
    }

    async fn run_frame(
        &self,
        source: Source,
        plan: &FramePlan,
        format: &str,
        staged: &StagedFile,
    ) -> RenderResult<()> {
        let input = source.into_local(self.store.as_ref()).await?;

        self.video
            .screenshot(input.path(), &plan.seek, plan.size, staged.path())
            .await?;

        if plan.minify {
            self.compressor.compress(staged.path(), format).await?;
        }
        Ok(())
    }

    async fn run_video(
        &self,
        source: Source,
        plan: &VideoPlan,
        staged: &StagedFile,
    ) -> RenderResult<()> {
        let input = source.into_local(self.store.as_ref()).await?;
        let ops = VideoOps {
            size: plan.size,
            bitrate_kbps: plan.bitrate,
            fps: plan.framerate,
            aspect: plan.aspect_ratio.clone(),
        };

        self.video
            .transcode(input.path(), &ops, staged.path())
            .await?;
        Ok(())
    }
}
