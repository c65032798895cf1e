//! Render metrics.
//!
//! Recording is a no-op until a recorder is installed (the API server
//! installs the Prometheus one).

use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const CACHE_HITS_TOTAL: &str = "rsend_cache_hits_total";
    pub const CACHE_MISSES_TOTAL: &str = "rsend_cache_misses_total";
    pub const RENDERS_TOTAL: &str = "rsend_renders_total";
    pub const RENDER_FAILURES_TOTAL: &str = "rsend_render_failures_total";
    pub const RENDER_WAITS_TOTAL: &str = "rsend_render_waits_total";
    pub const RENDER_DURATION_SECONDS: &str = "rsend_render_duration_seconds";
}

pub fn record_cache_hit() {
    counter!(names::CACHE_HITS_TOTAL).increment(1);
}

pub fn record_cache_miss() {
    counter!(names::CACHE_MISSES_TOTAL).increment(1);
}

/// A caller joined a render already in progress for its key.
pub fn record_render_wait() {
    counter!(names::RENDER_WAITS_TOTAL).increment(1);
}

/// Record a finished render.
pub fn record_render(kind: &str, duration_secs: f64) {
    let labels = [("kind", kind.to_string())];
    counter!(names::RENDERS_TOTAL, &labels).increment(1);
    histogram!(names::RENDER_DURATION_SECONDS, &labels).record(duration_secs);
}

pub fn record_render_failure(kind: &str) {
    let labels = [("kind", kind.to_string())];
    counter!(names::RENDER_FAILURES_TOTAL, &labels).increment(1);
}
