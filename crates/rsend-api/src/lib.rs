//! Axum HTTP front end for the render cache.
//!
//! This crate provides:
//! - `GET /render`: resolve a source path plus transform options, rendering
//!   the derivative on a miss, and stream it with cache headers
//! - `GET /health` liveness probe
//! - `GET /metrics` Prometheus exposition

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
