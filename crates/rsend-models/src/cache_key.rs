//! Cache key derivation.
//!
//! A key is the artifact's file name under the cache root and is the only
//! persisted contract of the cache, so its layout must stay stable:
//!
//! ```text
//! <base>[-<mtime_ms>][-<geometry>][-size:<s>][-trimmed][-minified]
//!       [-cropped:<w>x<h>~<x>,<y>][-aspect:<r>][-bitrate:<n>]
//!       [-framerate:<n>][-timestamp:<t>][-square[:<bg>]].<format>
//! ```
//!
//! Absent options contribute nothing, so adding a new option at the end never
//! changes keys of requests that don't use it.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::media_kind::{classify, MediaKind};
use crate::options::TransformOptions;
use crate::resolved::SizeSpec;

/// Output format used for image sources when none is requested.
pub const DEFAULT_IMAGE_FORMAT: &str = "jpg";

/// Identity of a render source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceIdentity {
    /// File path or declared stream name; only the file name part is used.
    pub name: String,
    /// Modification time in milliseconds since the epoch. Streams have none.
    pub mtime_ms: Option<i64>,
}

impl SourceIdentity {
    pub fn new(name: impl Into<String>, mtime_ms: Option<i64>) -> Self {
        Self {
            name: name.into(),
            mtime_ms,
        }
    }

    /// File name without directory and extension.
    pub fn base_name(&self) -> Option<&str> {
        Path::new(&self.name)
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
    }

    /// Extension without the dot.
    pub fn extension(&self) -> Option<&str> {
        Path::new(&self.name).extension().and_then(|e| e.to_str())
    }
}

/// Canonical name of one rendered artifact.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Wrap an already-derived key.
    pub fn from_string(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Output format (text after the last dot).
    pub fn format(&self) -> Option<&str> {
        self.0.rsplit_once('.').map(|(_, ext)| ext)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Derives cache keys. Pure: no I/O, deterministic.
#[derive(Debug, Clone)]
pub struct KeyDeriver {
    default_image_format: String,
}

impl Default for KeyDeriver {
    fn default() -> Self {
        Self::new(DEFAULT_IMAGE_FORMAT)
    }
}

impl KeyDeriver {
    pub fn new(default_image_format: impl Into<String>) -> Self {
        Self {
            default_image_format: default_image_format.into().to_ascii_lowercase(),
        }
    }

    pub fn default_image_format(&self) -> &str {
        &self.default_image_format
    }

    /// Output format for a request.
    ///
    /// Explicit format, else the configured default for images, else the
    /// source's own extension for videos.
    pub fn output_format(&self, source: &SourceIdentity, options: &TransformOptions) -> String {
        if let Some(format) = options.normalized_format() {
            return format;
        }

        match classify(options.media_kind, &source.name) {
            Ok(MediaKind::Video) => source
                .extension()
                .map(str::to_ascii_lowercase)
                .unwrap_or_else(|| self.default_image_format.clone()),
            _ => self.default_image_format.clone(),
        }
    }

    /// Derive the key for a source + options pair.
    pub fn derive(
        &self,
        source: &SourceIdentity,
        options: &TransformOptions,
    ) -> ModelResult<CacheKey> {
        let base = source.base_name().ok_or_else(|| {
            ModelError::invalid_option("a source path or stream name is required")
        })?;

        let mut key = String::from(base);
        let mut push = |segment: &str| {
            key.push('-');
            key.push_str(segment);
        };

        if let Some(mtime) = source.mtime_ms {
            push(&mtime.to_string());
        }

        match (options.width, options.height) {
            (Some(w), Some(h)) => push(&format!("{}x{}", w, h)),
            (Some(w), None) => push(&format!("{}x", w)),
            (None, Some(h)) => push(&format!("x{}", h)),
            (None, None) => {}
        }

        if let Some(size) = &options.size {
            let canonical = SizeSpec::parse(size)
                .map(|s| s.to_string())
                .unwrap_or_else(|_| size.clone());
            push(&format!("size:{}", canonical));
        }

        if options.trim {
            push("trimmed");
        }

        if options.minify {
            push("minified");
        }

        if let Some(crop) = &options.crop {
            push(&crop.key_segment());
        }

        if let Some(ratio) = &options.aspect_ratio {
            push(&format!("aspect:{}", ratio));
        }

        if let Some(bitrate) = options.bitrate {
            push(&format!("bitrate:{}", bitrate));
        }

        if let Some(fps) = options.framerate {
            push(&format!("framerate:{}", fps));
        }

        if let Some(ts) = &options.timestamp {
            push(&format!("timestamp:{}", ts));
        }

        if options.square {
            match &options.background {
                Some(bg) => push(&format!("square:{}", bg.to_ascii_lowercase())),
                None => push("square"),
            }
        }

        key.push('.');
        key.push_str(&self.output_format(source, options));

        Ok(CacheKey(key))
    }
}
