//! Render configuration.

use std::path::PathBuf;
use std::time::Duration;

use rsend_models::{check_format_token, DEFAULT_IMAGE_FORMAT};

use crate::error::{RenderError, RenderResult};

const DAY_SECS: u64 = 24 * 60 * 60;

/// Process-wide render defaults.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Directory artifacts are written to
    pub cache_root: PathBuf,
    /// Cache lifetime hint handed to delivery
    pub max_age: Duration,
    /// Output format for images when the request names none
    pub default_image_format: String,
    /// Kill FFmpeg runs that take longer than this
    pub ffmpeg_timeout: Option<Duration>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            cache_root: PathBuf::from("/tmp"),
            max_age: Duration::from_secs(30 * DAY_SECS),
            default_image_format: DEFAULT_IMAGE_FORMAT.to_string(),
            ffmpeg_timeout: None,
        }
    }
}

impl RenderConfig {
    /// Create config from environment variables.
    pub fn from_env() -> RenderResult<Self> {
        let defaults = Self::default();

        let max_age = match std::env::var("RSEND_MAX_AGE") {
            Ok(value) => parse_duration(&value)?,
            Err(_) => defaults.max_age,
        };

        let ffmpeg_timeout = match std::env::var("RSEND_FFMPEG_TIMEOUT") {
            Ok(value) => Some(Duration::from_secs(value.trim().parse().map_err(|_| {
                RenderError::config_error(format!(
                    "RSEND_FFMPEG_TIMEOUT must be a number of seconds, got '{}'",
                    value
                ))
            })?)),
            Err(_) => None,
        };

        let config = Self {
            cache_root: std::env::var("RSEND_CACHE_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_root),
            max_age,
            default_image_format: std::env::var("RSEND_DEFAULT_FORMAT")
                .map(|f| f.to_ascii_lowercase())
                .unwrap_or(defaults.default_image_format),
            ffmpeg_timeout,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would only fail later, on every request.
    pub fn validate(&self) -> RenderResult<()> {
        check_format_token(&self.default_image_format).map_err(|e| {
            RenderError::config_error(format!("RSEND_DEFAULT_FORMAT: {}", e))
        })
    }
}

/// Parse a human duration such as `30 days`, `12h` or `500ms`.
///
/// A bare number is taken as milliseconds.
pub fn parse_duration(value: &str) -> RenderResult<Duration> {
    let invalid = || RenderError::config_error(format!("invalid duration '{}'", value));

    let trimmed = value.trim();
    let split = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(trimmed.len());
    let (number, unit) = trimmed.split_at(split);

    let amount: f64 = number.parse().map_err(|_| invalid())?;
    if !amount.is_finite() || amount < 0.0 {
        return Err(invalid());
    }

    let unit_secs = match unit.trim().to_ascii_lowercase().as_str() {
        "" | "ms" | "msec" | "msecs" | "millisecond" | "milliseconds" => 0.001,
        "s" | "sec" | "secs" | "second" | "seconds" => 1.0,
        "m" | "min" | "mins" | "minute" | "minutes" => 60.0,
        "h" | "hr" | "hrs" | "hour" | "hours" => 3600.0,
        "d" | "day" | "days" => DAY_SECS as f64,
        "w" | "week" | "weeks" => (7 * DAY_SECS) as f64,
        "y" | "yr" | "yrs" | "year" | "years" => 365.25 * DAY_SECS as f64,
        _ => return Err(invalid()),
    };

    Duration::try_from_secs_f64(amount * unit_secs).map_err(|_| invalid())
}
