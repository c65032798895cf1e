//! Media engines for RenderSend.
//!
//! This crate provides:
//! - Engine traits the render pipelines call into (`ImageEngine`,
//!   `PostCompressor`, `VideoEngine`)
//! - A raster engine and compressor built on the `image` crate
//! - An FFmpeg-backed video engine with a type-safe command builder
//! - Progress parsing from `-progress pipe:2`

pub mod command;
pub mod engine;
pub mod error;
pub mod minify;
pub mod progress;
pub mod raster;
pub mod video;

pub use command::{check_ffmpeg, FfmpegCommand, FfmpegRunner};
pub use engine::{Dimensions, ImageEngine, ImageOp, PostCompressor, VideoEngine, VideoOps};
pub use error::{MediaError, MediaResult};
pub use minify::RasterCompressor;
pub use progress::FfmpegProgress;
pub use raster::RasterEngine;
pub use video::FfmpegVideoEngine;
