//! Structured render logging utilities.
//!
//! Provides consistent, structured logging for renders with tracing spans
//! and contextual information.

use rsend_models::CacheKey;
use tracing::{error, info, warn, Span};

/// Render logger carrying the cache key and pipeline of one render.
#[derive(Debug, Clone)]
pub struct RenderLogger {
    cache_key: String,
    operation: String,
}

impl RenderLogger {
    /// Create a new logger for a key and operation (`image`, `frame`, `video`).
    pub fn new(key: &CacheKey, operation: &str) -> Self {
        Self {
            cache_key: key.to_string(),
            operation: operation.to_string(),
        }
    }

    /// Log the start of a render.
    pub fn log_start(&self, message: &str) {
        info!(
            cache_key = %self.cache_key,
            operation = %self.operation,
            "Render started: {}", message
        );
    }

    /// Log a progress update during a render.
    pub fn log_progress(&self, message: &str) {
        info!(
            cache_key = %self.cache_key,
            operation = %self.operation,
            "Render progress: {}", message
        );
    }

    /// Log a warning during a render.
    pub fn log_warning(&self, message: &str) {
        warn!(
            cache_key = %self.cache_key,
            operation = %self.operation,
            "Render warning: {}", message
        );
    }

    /// Log a render failure.
    pub fn log_error(&self, message: &str) {
        error!(
            cache_key = %self.cache_key,
            operation = %self.operation,
            "Render error: {}", message
        );
    }

    /// Log the completion of a render.
    pub fn log_completion(&self, message: &str) {
        info!(
            cache_key = %self.cache_key,
            operation = %self.operation,
            "Render completed: {}", message
        );
    }

    pub fn cache_key(&self) -> &str {
        &self.cache_key
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Create a tracing span for this render.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "render",
            cache_key = %self.cache_key,
            operation = %self.operation
        )
    }
}
