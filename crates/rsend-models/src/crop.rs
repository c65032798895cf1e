//! Crop specification with absolute or fractional fields.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// A single crop field.
///
/// Values in `(0, 1)` are fractions of the source's extent on that axis and
/// are only turned into pixels once the source has been probed. Whole numbers
/// are absolute pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub enum CropValue {
    Pixels(u32),
    Fraction(f64),
}

impl CropValue {
    pub fn is_fraction(&self) -> bool {
        matches!(self, CropValue::Fraction(_))
    }

    /// Resolve against the source extent on this axis.
    pub fn resolve(&self, extent: u32) -> u32 {
        match *self {
            CropValue::Pixels(px) => px,
            CropValue::Fraction(f) => (f * extent as f64).round() as u32,
        }
    }
}

impl TryFrom<f64> for CropValue {
    type Error = ModelError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() || value < 0.0 {
            return Err(ModelError::invalid_option(format!(
                "crop value must be a non-negative number, got {}",
                value
            )));
        }

        if value > 0.0 && value < 1.0 {
            return Ok(CropValue::Fraction(value));
        }

        if value.fract() != 0.0 || value > u32::MAX as f64 {
            return Err(ModelError::invalid_option(format!(
                "absolute crop value must be a whole pixel count, got {}",
                value
            )));
        }

        Ok(CropValue::Pixels(value as u32))
    }
}

impl From<CropValue> for f64 {
    fn from(value: CropValue) -> Self {
        match value {
            CropValue::Pixels(px) => px as f64,
            CropValue::Fraction(f) => f,
        }
    }
}

impl fmt::Display for CropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CropValue::Pixels(px) => write!(f, "{}", px),
            CropValue::Fraction(v) => write!(f, "{}", v),
        }
    }
}

/// Crop rectangle as requested.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropSpec {
    pub width: CropValue,
    pub height: CropValue,
    pub x: CropValue,
    pub y: CropValue,
}

impl CropSpec {
    /// Build a crop spec from raw numbers.
    pub fn from_values(width: f64, height: f64, x: f64, y: f64) -> ModelResult<Self> {
        let spec = Self {
            width: CropValue::try_from(width)?,
            height: CropValue::try_from(height)?,
            x: CropValue::try_from(x)?,
            y: CropValue::try_from(y)?,
        };
        spec.check()?;
        Ok(spec)
    }

    /// Width and height must select at least one pixel.
    pub fn check(&self) -> ModelResult<()> {
        if self.width == CropValue::Pixels(0) || self.height == CropValue::Pixels(0) {
            return Err(ModelError::invalid_option(
                "crop width and height must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Whether any field needs the source dimensions to resolve.
    pub fn has_fractions(&self) -> bool {
        [self.width, self.height, self.x, self.y]
            .iter()
            .any(CropValue::is_fraction)
    }

    /// Resolve against the probed source dimensions.
    pub fn resolve(&self, source_width: u32, source_height: u32) -> PixelCrop {
        PixelCrop {
            width: self.width.resolve(source_width),
            height: self.height.resolve(source_height),
            x: self.x.resolve(source_width),
            y: self.y.resolve(source_height),
        }
    }

    /// Cache key segment, fractions rendered verbatim.
    pub fn key_segment(&self) -> String {
        format!(
            "cropped:{}x{}~{},{}",
            self.width, self.height, self.x, self.y
        )
    }
}

/// Crop rectangle in absolute pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelCrop {
    pub width: u32,
    pub height: u32,
    pub x: u32,
    pub y: u32,
}

impl PixelCrop {
    /// Intersect with the source bounds. `None` when nothing remains.
    pub fn clamp_to(self, source_width: u32, source_height: u32) -> Option<Self> {
        if self.x >= source_width || self.y >= source_height {
            return None;
        }
        let width = self.width.min(source_width - self.x);
        let height = self.height.min(source_height - self.y);
        if width == 0 || height == 0 {
            return None;
        }
        Some(Self {
            width,
            height,
            x: self.x,
            y: self.y,
        })
    }
}
