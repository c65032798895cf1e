//! Media kind classification.
//!
//! A single extension table decides whether a source is rendered through the
//! image pipeline or the video pipeline.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Kind of media a source is treated as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

/// Extension -> media kind table. Lookups are case-insensitive.
const EXTENSION_TABLE: &[(&str, MediaKind)] = &[
    ("jpg", MediaKind::Image),
    ("jpeg", MediaKind::Image),
    ("tif", MediaKind::Image),
    ("tiff", MediaKind::Image),
    ("png", MediaKind::Image),
    ("gif", MediaKind::Image),
    ("bmp", MediaKind::Image),
    ("webp", MediaKind::Image),
    ("raw", MediaKind::Image),
    ("mp4", MediaKind::Video),
    ("m4v", MediaKind::Video),
    ("mov", MediaKind::Video),
    ("avi", MediaKind::Video),
    ("mkv", MediaKind::Video),
    ("webm", MediaKind::Video),
];

impl MediaKind {
    /// Look up an extension (without the leading dot).
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.trim_start_matches('.');
        EXTENSION_TABLE
            .iter()
            .find(|(known, _)| known.eq_ignore_ascii_case(ext))
            .map(|(_, kind)| *kind)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "image" => Ok(MediaKind::Image),
            "video" => Ok(MediaKind::Video),
            other => Err(ModelError::invalid_option(format!(
                "unknown media kind '{}', expected 'image' or 'video'",
                other
            ))),
        }
    }
}

/// Whether an output format token names an image format.
pub fn is_image_format(format: &str) -> bool {
    MediaKind::from_extension(format) == Some(MediaKind::Image)
}

/// Classify a source.
///
/// An explicit hint always wins. Otherwise the extension of `file_name` is
/// looked up; a name without an extension is treated as an image, while an
/// extension present in neither set is rejected.
pub fn classify(hint: Option<MediaKind>, file_name: &str) -> ModelResult<MediaKind> {
    if let Some(kind) = hint {
        return Ok(kind);
    }

    match Path::new(file_name).extension().and_then(|e| e.to_str()) {
        None => Ok(MediaKind::Image),
        Some(ext) => MediaKind::from_extension(ext).ok_or_else(|| {
            ModelError::unsupported_media_type(format!(".{} file type is not supported", ext))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_lookup_is_case_insensitive() {
        assert_eq!(MediaKind::from_extension("JPG"), Some(MediaKind::Image));
        assert_eq!(MediaKind::from_extension(".png"), Some(MediaKind::Image));
        assert_eq!(MediaKind::from_extension("Mp4"), Some(MediaKind::Video));
        assert_eq!(MediaKind::from_extension("txt"), None);
    }

    #[test]
    fn test_classify_hint_wins() {
        assert_eq!(
            classify(Some(MediaKind::Video), "clip.jpg").unwrap(),
            MediaKind::Video
        );
    }

    #[test]
    fn test_classify_by_extension() {
        assert_eq!(classify(None, "photos/a.JPEG").unwrap(), MediaKind::Image);
        assert_eq!(classify(None, "v.mov").unwrap(), MediaKind::Video);
    }

    #[test]
    fn test_classify_without_extension_defaults_to_image() {
        assert_eq!(classify(None, "upload").unwrap(), MediaKind::Image);
    }

    #[test]
    fn test_classify_unknown_extension() {
        let err = classify(None, "notes.txt").unwrap_err();
        assert!(matches!(err, ModelError::UnsupportedMediaType(_)));
    }

    #[test]
    fn test_media_kind_from_str() {
        assert_eq!("Image".parse::<MediaKind>().unwrap(), MediaKind::Image);
        assert!("audio".parse::<MediaKind>().is_err());
    }

    #[test]
    fn test_is_image_format() {
        assert!(is_image_format("jpg"));
        assert!(!is_image_format("avi"));
    }
}
