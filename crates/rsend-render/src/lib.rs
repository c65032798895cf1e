//! Derivative-media render core.
//!
//! This crate provides:
//! - Render sources (`File` or `Stream`) and transform requests
//! - Dispatch of requests to the image, frame-extraction or video pipeline
//! - Render-if-absent orchestration with at most one render per cache key
//! - Delivery of cached artifacts to any async byte sink
//! - Render configuration, structured logging and metrics

pub mod config;
pub mod delivery;
pub mod dispatcher;
pub mod error;
pub mod inflight;
pub mod logging;
pub mod metrics;
pub mod orchestrator;
pub mod source;

pub use config::{parse_duration, RenderConfig};
pub use delivery::deliver;
pub use dispatcher::RenderDispatcher;
pub use error::{RenderError, RenderResult};
pub use inflight::{Flight, FlightGuard, FlightWaiter, InFlightRenders, RenderOutcome};
pub use logging::RenderLogger;
pub use orchestrator::{RenderOrchestrator, Resolution};
pub use source::{LocalInput, Source, TransformRequest};
