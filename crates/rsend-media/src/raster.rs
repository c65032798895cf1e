//! Image engine backed by the `image` crate.
//!
//! Decoding and pixel work run on the blocking pool.

use std::io::Cursor;
use std::path::Path;

use async_trait::async_trait;
use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, ImageFormat, RgbaImage};
use rsend_models::Rgba;
use tracing::debug;

use crate::engine::{Dimensions, ImageEngine, ImageOp};
use crate::error::{MediaError, MediaResult};

/// Map an output format token to an encoder.
pub(crate) fn image_format(format: &str) -> MediaResult<ImageFormat> {
    ImageFormat::from_extension(format.to_ascii_lowercase())
        .ok_or_else(|| MediaError::unsupported_format(format))
}

/// Raster engine for still images.
#[derive(Debug, Clone)]
pub struct RasterEngine {
    filter: FilterType,
}

impl Default for RasterEngine {
    fn default() -> Self {
        Self {
            filter: FilterType::Lanczos3,
        }
    }
}

impl RasterEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resampling filter used by resize.
    pub fn with_filter(mut self, filter: FilterType) -> Self {
        self.filter = filter;
        self
    }
}

#[async_trait]
impl ImageEngine for RasterEngine {
    async fn probe_dimensions(&self, input: &[u8]) -> MediaResult<Dimensions> {
        let (width, height) = image::io::Reader::new(Cursor::new(input))
            .with_guessed_format()?
            .into_dimensions()?;
        Ok(Dimensions { width, height })
    }

    async fn transform(
        &self,
        input: Vec<u8>,
        ops: &[ImageOp],
        format: &str,
        output: &Path,
    ) -> MediaResult<()> {
        let target = image_format(format)?;
        let ops = ops.to_vec();
        let filter = self.filter;

        let encoded = tokio::task::spawn_blocking(move || -> MediaResult<Vec<u8>> {
            let mut img = image::load_from_memory(&input)?;
            for op in &ops {
                img = apply_op(img, op, filter)?;
            }

            if target == ImageFormat::Jpeg {
                img = DynamicImage::ImageRgb8(img.to_rgb8());
            }

            debug!(width = img.width(), height = img.height(), "Encoding image");
            let mut buf = Cursor::new(Vec::new());
            img.write_to(&mut buf, target)?;
            Ok(buf.into_inner())
        })
        .await??;

        // Written from the async side so a dropped render stops before touching disk.
        tokio::fs::write(output, encoded).await?;
        Ok(())
    }
}

fn apply_op(img: DynamicImage, op: &ImageOp, filter: FilterType) -> MediaResult<DynamicImage> {
    let (width, height) = img.dimensions();

    match op {
        ImageOp::Crop(crop) => {
            let area = crop.clamp_to(width, height).ok_or_else(|| {
                MediaError::invalid_image(format!(
                    "crop {}x{}+{}+{} lies outside a {}x{} image",
                    crop.width, crop.height, crop.x, crop.y, width, height
                ))
            })?;
            Ok(img.crop_imm(area.x, area.y, area.width, area.height))
        }
        ImageOp::Resize {
            width: w,
            height: h,
        } => Ok(img.resize(*w, *h, filter)),
        ImageOp::Trim => Ok(trim_border(img)),
        ImageOp::Square(background) => Ok(pad_square(img, *background)),
    }
}

/// Crop away the border whose colour matches the top-left pixel.
///
/// A uniform image is returned unchanged.
fn trim_border(img: DynamicImage) -> DynamicImage {
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return img;
    }

    let border = *rgba.get_pixel(0, 0);
    let mut bounds: Option<(u32, u32, u32, u32)> = None;

    for (x, y, pixel) in rgba.enumerate_pixels() {
        if *pixel == border {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        });
    }

    match bounds {
        Some((x0, y0, x1, y1)) => img.crop_imm(x0, y0, x1 - x0 + 1, y1 - y0 + 1),
        None => img,
    }
}

/// Center the image on a square canvas.
fn pad_square(img: DynamicImage, background: Rgba) -> DynamicImage {
    let (width, height) = img.dimensions();
    if width == height {
        return img;
    }

    let side = width.max(height);
    let mut canvas = RgbaImage::from_pixel(side, side, image::Rgba(background.0));
    let x = i64::from((side - width) / 2);
    let y = i64::from((side - height) / 2);
    imageops::overlay(&mut canvas, &img.to_rgba8(), x, y);

    DynamicImage::ImageRgba8(canvas)
}
