//! Post-render compression.

use std::io::Cursor;
use std::path::Path;

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::{DynamicImage, ImageEncoder, ImageFormat};
use tracing::debug;

use crate::engine::PostCompressor;
use crate::error::MediaResult;
use crate::raster::image_format;

/// JPEG re-encode quality. High enough to be visually lossless.
const JPEG_QUALITY: u8 = 85;

/// Re-encodes PNG and JPEG artifacts and keeps the result only when smaller.
///
/// Other formats are left untouched.
#[derive(Debug, Clone, Default)]
pub struct RasterCompressor;

impl RasterCompressor {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PostCompressor for RasterCompressor {
    async fn compress(&self, location: &Path, format: &str) -> MediaResult<()> {
        let target = match image_format(format) {
            Ok(f @ (ImageFormat::Png | ImageFormat::Jpeg)) => f,
            _ => {
                debug!(format, "No compressor for format, skipping minify");
                return Ok(());
            }
        };

        let original = tokio::fs::read(location).await?;
        let before = original.len();

        let compressed =
            tokio::task::spawn_blocking(move || reencode(&original, target)).await??;

        if compressed.len() < before {
            tokio::fs::write(location, &compressed).await?;
        }

        debug!(
            location = %location.display(),
            before,
            after = compressed.len().min(before),
            "Minified artifact"
        );
        Ok(())
    }
}

fn reencode(bytes: &[u8], format: ImageFormat) -> MediaResult<Vec<u8>> {
    let img = image::load_from_memory_with_format(bytes, format)?;
    let mut out = Cursor::new(Vec::with_capacity(bytes.len()));

    match format {
        ImageFormat::Jpeg => {
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY).write_image(
                rgb.as_bytes(),
                rgb.width(),
                rgb.height(),
                rgb.color(),
            )?;
        }
        _ => {
            let img = match img {
                DynamicImage::ImageRgba8(_)
                | DynamicImage::ImageRgb8(_)
                | DynamicImage::ImageLuma8(_)
                | DynamicImage::ImageLumaA8(_) => img,
                other => DynamicImage::ImageRgba8(other.to_rgba8()),
            };
            PngEncoder::new_with_quality(&mut out, CompressionType::Best, PngFilter::Adaptive)
                .write_image(img.as_bytes(), img.width(), img.height(), img.color())?;
        }
    }

    Ok(out.into_inner())
}
