//! Engine traits consumed by the render pipelines.
//!
//! Pipelines hand engines concrete, fully resolved parameters: pixel crops,
//! both resize axes, an output path. Engines never see raw options.

use std::path::Path;

use async_trait::async_trait;
use rsend_models::{PixelCrop, Rgba, SizeSpec};

use crate::error::MediaResult;

/// Pixel dimensions of a decoded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// One step of the image pipeline. Applied in list order.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageOp {
    Crop(PixelCrop),
    /// Fit within the box, preserving aspect ratio.
    Resize { width: u32, height: u32 },
    /// Remove a uniform border.
    Trim,
    /// Pad to a square canvas filled with the colour.
    Square(Rgba),
}

/// Video transcode settings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoOps {
    pub size: Option<SizeSpec>,
    pub bitrate_kbps: Option<u32>,
    pub fps: Option<f64>,
    pub aspect: Option<String>,
}

#[async_trait]
pub trait ImageEngine: Send + Sync {
    /// Read dimensions from an encoded image.
    async fn probe_dimensions(&self, input: &[u8]) -> MediaResult<Dimensions>;

    /// Decode `input`, apply `ops` and encode as `format` into `output`.
    async fn transform(
        &self,
        input: Vec<u8>,
        ops: &[ImageOp],
        format: &str,
        output: &Path,
    ) -> MediaResult<()>;
}

/// Lossless-class compression of a finished artifact, in place.
#[async_trait]
pub trait PostCompressor: Send + Sync {
    async fn compress(&self, location: &Path, format: &str) -> MediaResult<()>;
}

#[async_trait]
pub trait VideoEngine: Send + Sync {
    /// Full transcode; the container follows the output extension.
    async fn transcode(&self, input: &Path, ops: &VideoOps, output: &Path) -> MediaResult<()>;

    /// Grab a single frame at `timestamp` (`HH:MM:SS[.mmm]`).
    async fn screenshot(
        &self,
        input: &Path,
        timestamp: &str,
        size: Option<SizeSpec>,
        output: &Path,
    ) -> MediaResult<()>;
}
