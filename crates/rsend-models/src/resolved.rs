//! Normalization of options into concrete render plans.
//!
//! [`resolve_parameters`] is a pure step: given the media kind, the resolved
//! output format and the caller's options, it decides which pipeline runs and
//! with which parameters. Pipelines only ever see a finished plan.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::color::Rgba;
use crate::crop::CropSpec;
use crate::error::{ModelError, ModelResult};
use crate::media_kind::{is_image_format, MediaKind};
use crate::options::TransformOptions;
use crate::timestamp::{format_seconds, parse_timestamp};

/// Seek position used when a video is converted to an image without a timestamp.
pub const FIRST_FRAME_TIMESTAMP: &str = "0";

/// Output size with one or both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SizeSpec {
    Width(u32),
    Height(u32),
    Both(u32, u32),
}

impl SizeSpec {
    pub fn from_geometry(width: Option<u32>, height: Option<u32>) -> Option<Self> {
        match (width, height) {
            (Some(w), Some(h)) => Some(SizeSpec::Both(w, h)),
            (Some(w), None) => Some(SizeSpec::Width(w)),
            (None, Some(h)) => Some(SizeSpec::Height(h)),
            (None, None) => None,
        }
    }

    /// Parse `WxH`, `Wx?` or `?xH`.
    pub fn parse(s: &str) -> ModelResult<Self> {
        let invalid = || {
            ModelError::invalid_option(format!(
                "size must look like '320x240', '320x?' or '?x240', got '{}'",
                s
            ))
        };

        let (w, h) = s.trim().split_once(['x', 'X']).ok_or_else(invalid)?;
        let axis = |v: &str| -> ModelResult<Option<u32>> {
            if v == "?" {
                return Ok(None);
            }
            match v.parse::<u32>() {
                Ok(n) if n > 0 => Ok(Some(n)),
                _ => Err(invalid()),
            }
        };

        Self::from_geometry(axis(w)?, axis(h)?).ok_or_else(invalid)
    }

    pub fn width(&self) -> Option<u32> {
        match *self {
            SizeSpec::Width(w) | SizeSpec::Both(w, _) => Some(w),
            SizeSpec::Height(_) => None,
        }
    }

    pub fn height(&self) -> Option<u32> {
        match *self {
            SizeSpec::Height(h) | SizeSpec::Both(_, h) => Some(h),
            SizeSpec::Width(_) => None,
        }
    }
}

impl fmt::Display for SizeSpec {
    /// The size string handed to the video engine.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SizeSpec::Width(w) => write!(f, "{}x?", w),
            SizeSpec::Height(h) => write!(f, "?x{}", h),
            SizeSpec::Both(w, h) => write!(f, "{}x{}", w, h),
        }
    }
}

/// Image pipeline parameters. Steps run in field order.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePlan {
    /// May still hold fractions; resolved after probing the source.
    pub crop: Option<CropSpec>,
    /// Only set when both width and height were requested.
    pub resize: Option<(u32, u32)>,
    pub trim: bool,
    /// Square canvas fill, when `square` was requested.
    pub square: Option<Rgba>,
    pub minify: bool,
}

/// Single frame extraction from a video.
#[derive(Debug, Clone, PartialEq)]
pub struct FramePlan {
    /// Normalized `HH:MM:SS[.mmm]` seek position.
    pub seek: String,
    pub size: Option<SizeSpec>,
    pub minify: bool,
}

/// Full video transcode.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoPlan {
    pub size: Option<SizeSpec>,
    /// kbit/s
    pub bitrate: Option<u32>,
    pub framerate: Option<f64>,
    pub aspect_ratio: Option<String>,
}

/// Which pipeline runs, with its parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderPlan {
    Image(ImagePlan),
    Frame(FramePlan),
    Video(VideoPlan),
}

impl RenderPlan {
    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            RenderPlan::Image(_) => "image",
            RenderPlan::Frame(_) => "frame",
            RenderPlan::Video(_) => "video",
        }
    }
}

/// Everything a pipeline needs besides the source bytes.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedParameters {
    pub kind: MediaKind,
    pub format: String,
    pub plan: RenderPlan,
}

/// Build the render plan for a classified source.
pub fn resolve_parameters(
    kind: MediaKind,
    format: &str,
    options: &TransformOptions,
) -> ModelResult<ResolvedParameters> {
    let format = format.to_ascii_lowercase();
    let output_is_image = is_image_format(&format);

    let plan = match kind {
        MediaKind::Image => {
            if !output_is_image {
                return Err(ModelError::unsupported_media_type(format!(
                    "an image source cannot be rendered as '{}'",
                    format
                )));
            }
            let resize = match (options.width, options.height) {
                (Some(w), Some(h)) => Some((w, h)),
                _ => None,
            };
            let square = if options.square {
                Some(options.background_color()?)
            } else {
                None
            };
            RenderPlan::Image(ImagePlan {
                crop: options.crop,
                resize,
                trim: options.trim,
                square,
                minify: options.minify,
            })
        }
        MediaKind::Video if output_is_image => {
            let ts = options
                .timestamp
                .as_deref()
                .unwrap_or(FIRST_FRAME_TIMESTAMP);
            let secs = parse_timestamp(ts)
                .map_err(|e| ModelError::invalid_option(format!("timestamp: {}", e)))?;
            RenderPlan::Frame(FramePlan {
                seek: format_seconds(secs),
                size: options.size_spec()?,
                minify: options.minify,
            })
        }
        MediaKind::Video => RenderPlan::Video(VideoPlan {
            size: options.size_spec()?,
            bitrate: options.bitrate,
            framerate: options.framerate,
            aspect_ratio: options.aspect_ratio.clone(),
        }),
    };

    Ok(ResolvedParameters { kind, format, plan })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_spec_parse_and_display() {
        assert_eq!(SizeSpec::parse("320x240").unwrap(), SizeSpec::Both(320, 240));
        assert_eq!(SizeSpec::parse("320x?").unwrap(), SizeSpec::Width(320));
        assert_eq!(SizeSpec::parse("?x240").unwrap(), SizeSpec::Height(240));
        assert!(SizeSpec::parse("?x?").is_err());
        assert!(SizeSpec::parse("0x10").is_err());
        assert!(SizeSpec::parse("320").is_err());

        assert_eq!(SizeSpec::Width(320).to_string(), "320x?");
        assert_eq!(SizeSpec::Height(240).to_string(), "?x240");
        assert_eq!(SizeSpec::Both(320, 240).to_string(), "320x240");
    }

    #[test]
    fn test_image_plan_resize_needs_both_axes() {
        let opts = TransformOptions {
            width: Some(100),
            ..Default::default()
        };
        let resolved = resolve_parameters(MediaKind::Image, "jpg", &opts).unwrap();
        match resolved.plan {
            RenderPlan::Image(plan) => assert_eq!(plan.resize, None),
            other => panic!("unexpected plan {:?}", other),
        }

        let opts = TransformOptions {
            width: Some(100),
            height: Some(80),
            trim: true,
            ..Default::default()
        };
        let resolved = resolve_parameters(MediaKind::Image, "PNG", &opts).unwrap();
        assert_eq!(resolved.format, "png");
        match resolved.plan {
            RenderPlan::Image(plan) => {
                assert_eq!(plan.resize, Some((100, 80)));
                assert!(plan.trim);
                assert_eq!(plan.square, None);
            }
            other => panic!("unexpected plan {:?}", other),
        }
    }

    #[test]
    fn test_image_to_video_format_rejected() {
        let err = resolve_parameters(MediaKind::Image, "mp4", &TransformOptions::default())
            .unwrap_err();
        assert!(matches!(err, ModelError::UnsupportedMediaType(_)));
    }

    #[test]
    fn test_square_uses_background() {
        let opts = TransformOptions {
            square: true,
            background: Some("#000".to_string()),
            ..Default::default()
        };
        match resolve_parameters(MediaKind::Image, "png", &opts).unwrap().plan {
            RenderPlan::Image(plan) => assert_eq!(plan.square, Some(Rgba::BLACK)),
            other => panic!("unexpected plan {:?}", other),
        }
    }

    #[test]
    fn test_video_to_image_with_timestamp_is_frame() {
        let opts = TransformOptions {
            timestamp: Some("17".to_string()),
            size: Some("320x240".to_string()),
            ..Default::default()
        };
        let resolved = resolve_parameters(MediaKind::Video, "jpg", &opts).unwrap();
        assert_eq!(
            resolved.plan,
            RenderPlan::Frame(FramePlan {
                seek: "00:00:17".to_string(),
                size: Some(SizeSpec::Both(320, 240)),
                minify: false,
            })
        );
    }

    #[test]
    fn test_video_to_image_without_timestamp_uses_first_frame() {
        let resolved =
            resolve_parameters(MediaKind::Video, "png", &TransformOptions::default()).unwrap();
        match resolved.plan {
            RenderPlan::Frame(plan) => assert_eq!(plan.seek, "00:00:00"),
            other => panic!("unexpected plan {:?}", other),
        }
    }

    #[test]
    fn test_video_transcode_plan() {
        let opts = TransformOptions {
            height: Some(360),
            bitrate: Some(500),
            framerate: Some(24.0),
            aspect_ratio: Some("16:9".to_string()),
            ..Default::default()
        };
        let resolved = resolve_parameters(MediaKind::Video, "avi", &opts).unwrap();
        assert_eq!(resolved.plan.label(), "video");
        assert_eq!(
            resolved.plan,
            RenderPlan::Video(VideoPlan {
                size: Some(SizeSpec::Height(360)),
                bitrate: Some(500),
                framerate: Some(24.0),
                aspect_ratio: Some("16:9".to_string()),
            })
        );
    }
}
