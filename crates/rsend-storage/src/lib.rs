//! Artifact cache store.
//!
//! This crate provides:
//! - The `CacheStore` abstraction over persisted artifacts
//! - `LocalCacheStore`, a directory-backed implementation
//! - Staging files that are atomically renamed into place on success and
//!   removed on drop otherwise

pub mod error;
pub mod local;
pub mod staging;
pub mod store;

pub use error::{StorageError, StorageResult};
pub use local::LocalCacheStore;
pub use staging::StagedFile;
pub use store::{ArtifactReader, CacheStore};
