//! Shared data models for RenderSend.
//!
//! This crate provides Serde-serializable, I/O-free types for:
//! - Transform options (geometry, crop, trim, bitrate, framerate, timestamp...)
//! - Media kind classification by file extension
//! - Cache key derivation from source identity + options
//! - Normalization of options into concrete render plans

pub mod cache_key;
pub mod color;
pub mod crop;
pub mod error;
pub mod media_kind;
pub mod options;
pub mod resolved;
pub mod timestamp;

// Re-export common types
pub use cache_key::{CacheKey, KeyDeriver, SourceIdentity, DEFAULT_IMAGE_FORMAT};
pub use color::Rgba;
pub use crop::{CropSpec, CropValue, PixelCrop};
pub use error::{ModelError, ModelResult};
pub use media_kind::{classify, is_image_format, MediaKind};
pub use options::{check_format_token, TransformOptions};
pub use resolved::{
    resolve_parameters, FramePlan, ImagePlan, RenderPlan, ResolvedParameters, SizeSpec, VideoPlan,
    FIRST_FRAME_TIMESTAMP,
};
