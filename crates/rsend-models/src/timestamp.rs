//! Frame timestamp parsing.
//!
//! Frame extraction accepts the same forms FFmpeg's `-ss` does for plain
//! durations: `SS`, `MM:SS` and `HH:MM:SS`, each with an optional fraction.

use thiserror::Error;

/// Maximum reasonable video position (24 hours in seconds).
pub const MAX_TIMESTAMP_SECS: f64 = 86400.0;

/// Timestamp parsing error.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TimestampError {
    #[error("Timestamp cannot be empty")]
    Empty,

    #[error("Timestamp cannot be negative")]
    Negative,

    #[error("Invalid {0} value: {1}")]
    InvalidValue(&'static str, String),

    #[error("Invalid timestamp format '{0}'. Use SS, MM:SS or HH:MM:SS (optionally with .mmm)")]
    InvalidFormat(String),

    #[error("Timestamp exceeds maximum allowed position ({} hours)", .0 / 3600.0)]
    ExceedsMax(f64),
}

/// Parse a timestamp string to total seconds.
///
/// # Examples
/// ```
/// use rsend_models::timestamp::parse_timestamp;
/// assert_eq!(parse_timestamp("00:00:17").unwrap(), 17.0);
/// assert_eq!(parse_timestamp("05:30").unwrap(), 330.0);
/// assert_eq!(parse_timestamp("17").unwrap(), 17.0);
/// ```
pub fn parse_timestamp(ts: &str) -> Result<f64, TimestampError> {
    let ts = ts.trim();
    if ts.is_empty() {
        return Err(TimestampError::Empty);
    }

    const COMPONENTS: [&str; 3] = ["hours", "minutes", "seconds"];

    let parts: Vec<&str> = ts.split(':').collect();
    if parts.len() > 3 {
        return Err(TimestampError::InvalidFormat(ts.to_string()));
    }

    // Align the parts with the trailing components: "SS", "MM:SS", "HH:MM:SS".
    let names = &COMPONENTS[3 - parts.len()..];
    let mut total = 0.0;
    for (part, name) in parts.iter().zip(names) {
        let value: f64 = part
            .parse()
            .map_err(|_| TimestampError::InvalidValue(name, part.to_string()))?;
        if !value.is_finite() {
            return Err(TimestampError::InvalidValue(name, part.to_string()));
        }
        if value < 0.0 {
            return Err(TimestampError::Negative);
        }
        total = total * 60.0 + value;
    }

    if total > MAX_TIMESTAMP_SECS {
        return Err(TimestampError::ExceedsMax(MAX_TIMESTAMP_SECS));
    }

    Ok(total)
}

/// Format seconds into HH:MM:SS or HH:MM:SS.mmm.
pub fn format_seconds(total_secs: f64) -> String {
    let hours = (total_secs / 3600.0).floor() as u32;
    let mins = ((total_secs % 3600.0) / 60.0).floor() as u32;
    let secs = total_secs % 60.0;

    if (secs - secs.floor()).abs() > 0.0001 {
        format!("{:02}:{:02}:{:06.3}", hours, mins, secs)
    } else {
        format!("{:02}:{:02}:{:02}", hours, mins, secs.floor() as u32)
    }
}
