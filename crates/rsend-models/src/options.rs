//! Transform options.
//!
//! `TransformOptions` is the immutable, caller-supplied parameter set. It is
//! validated once and never mutated by the render path; derived values live
//! in [`crate::resolved`].

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::color::Rgba;
use crate::crop::CropSpec;
use crate::error::{ModelError, ModelResult};
use crate::media_kind::MediaKind;
use crate::resolved::SizeSpec;
use crate::timestamp::parse_timestamp;

/// Output formats are plain extension tokens ("jpg", "mp4").
pub fn check_format_token(format: &str) -> ModelResult<()> {
    if format.is_empty() || !format.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ModelError::invalid_option(format!(
            "format must be an alphanumeric token, got '{}'",
            format
        )));
    }
    Ok(())
}

/// Requested transform of a single source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TransformOptions {
    /// Overrides extension-based classification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_kind: Option<MediaKind>,

    /// Output format token ("jpg", "mp4", "avi"...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    #[validate(range(min = 1))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,

    #[validate(range(min = 1))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,

    /// Free-form size string (`320x240`, `320x?`, `?x240`).
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "dimensions")]
    pub size: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crop: Option<CropSpec>,

    #[serde(default)]
    pub trim: bool,

    /// Pad the image to a square canvas.
    #[serde(default)]
    pub square: bool,

    /// Fill colour for `square` padding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,

    #[serde(default)]
    pub minify: bool,

    /// Video bitrate in kbit/s.
    #[validate(range(min = 1))]
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "bitRate")]
    pub bitrate: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none", alias = "frameRate")]
    pub framerate: Option<f64>,

    /// Display aspect ratio ("16:9", "1.7777").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect_ratio: Option<String>,

    /// Frame position for extraction (`17`, `00:00:17`).
    #[serde(default, skip_serializing_if = "Option::is_none", alias = "timeStamp")]
    pub timestamp: Option<String>,
}

impl TransformOptions {
    /// Validate every present option.
    pub fn check(&self) -> ModelResult<()> {
        self.validate()?;

        if let Some(format) = &self.format {
            check_format_token(format)?;
        }

        if let Some(size) = &self.size {
            SizeSpec::parse(size)?;
        }

        if let Some(crop) = &self.crop {
            crop.check()?;
        }

        if let Some(background) = &self.background {
            background.parse::<Rgba>()?;
        }

        if let Some(fps) = self.framerate {
            if !fps.is_finite() || fps <= 0.0 {
                return Err(ModelError::invalid_option(format!(
                    "framerate must be greater than zero, got {}",
                    fps
                )));
            }
        }

        if let Some(ratio) = &self.aspect_ratio {
            check_aspect_ratio(ratio)?;
        }

        if let Some(ts) = &self.timestamp {
            parse_timestamp(ts)
                .map_err(|e| ModelError::invalid_option(format!("timestamp: {}", e)))?;
        }

        Ok(())
    }

    /// Output format in canonical (lowercase) form.
    pub fn normalized_format(&self) -> Option<String> {
        self.format.as_ref().map(|f| f.to_ascii_lowercase())
    }

    /// Size from `size` if given, else from width/height.
    pub fn size_spec(&self) -> ModelResult<Option<SizeSpec>> {
        match &self.size {
            Some(size) => SizeSpec::parse(size).map(Some),
            None => Ok(SizeSpec::from_geometry(self.width, self.height)),
        }
    }

    /// Parsed background colour, white when unset.
    pub fn background_color(&self) -> ModelResult<Rgba> {
        match &self.background {
            Some(bg) => bg.parse(),
            None => Ok(Rgba::default()),
        }
    }
}

/// Accepts `W:H` or a single positive decimal ratio.
fn check_aspect_ratio(ratio: &str) -> ModelResult<()> {
    let invalid = || {
        ModelError::invalid_option(format!(
            "aspect ratio must look like '16:9' or '1.7777', got '{}'",
            ratio
        ))
    };

    let positive = |s: &str| {
        !s.is_empty()
            && s.chars().all(|c| c.is_ascii_digit() || c == '.')
            && s.parse::<f64>().map(|v| v > 0.0).unwrap_or(false)
    };

    let ok = match ratio.split_once(':') {
        Some((w, h)) => positive(w) && positive(h),
        None => positive(ratio),
    };

    if ok {
        Ok(())
    } else {
        Err(invalid())
    }
}
