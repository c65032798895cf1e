//! Render error types.

use rsend_media::MediaError;
use rsend_models::ModelError;
use rsend_storage::StorageError;
use thiserror::Error;

pub type RenderResult<T> = Result<T, RenderError>;

/// Everything that can go wrong between a request and a delivered artifact.
///
/// Payloads are plain strings so one render's failure can be handed to every
/// caller that was waiting on it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("Invalid option: {0}")]
    InvalidOption(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Render failed: {cause}")]
    RenderFailed { cause: String },

    #[error("Delivery failed: {0}")]
    DeliveryFailed(String),

    #[error("Render cancelled")]
    Cancelled,

    #[error("Cache store error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl RenderError {
    pub fn invalid_option(msg: impl Into<String>) -> Self {
        Self::InvalidOption(msg.into())
    }

    pub fn source_unavailable(msg: impl Into<String>) -> Self {
        Self::SourceUnavailable(msg.into())
    }

    pub fn render_failed(cause: impl Into<String>) -> Self {
        Self::RenderFailed {
            cause: cause.into(),
        }
    }

    pub fn delivery_failed(msg: impl Into<String>) -> Self {
        Self::DeliveryFailed(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Whether the request itself was at fault rather than the system.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            RenderError::InvalidOption(_)
                | RenderError::UnsupportedMediaType(_)
                | RenderError::InvalidPath(_)
        )
    }
}

impl From<ModelError> for RenderError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::InvalidOption(msg) => Self::InvalidOption(msg),
            ModelError::UnsupportedMediaType(msg) => Self::UnsupportedMediaType(msg),
        }
    }
}

impl From<StorageError> for RenderError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidPath(msg) => Self::InvalidPath(msg),
            // A failed publish is part of the render.
            StorageError::PersistFailed { .. } => Self::render_failed(err.to_string()),
            other => Self::Storage(other.to_string()),
        }
    }
}

impl From<MediaError> for RenderError {
    fn from(err: MediaError) -> Self {
        match err {
            MediaError::FfmpegFailed {
                message,
                stderr: Some(stderr),
                ..
            } => Self::render_failed(format!("{}: {}", message, stderr)),
            other => Self::render_failed(other.to_string()),
        }
    }
}
