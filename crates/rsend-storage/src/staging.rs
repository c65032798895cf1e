//! Temporary files that become artifacts.

use std::io;
use std::path::Path;

use tempfile::TempPath;

/// File name prefix of in-progress writes inside the cache root.
pub const STAGING_PREFIX: &str = ".rsend-";

/// A temporary file inside the cache root.
///
/// The file is removed when dropped unless it was persisted first, so an
/// aborted or failed render never leaves anything behind.
#[derive(Debug)]
pub struct StagedFile {
    temp: TempPath,
}

impl StagedFile {
    /// Create an empty staging file in `dir` ending in `.<extension>`.
    ///
    /// The extension matters: encoders pick the output container from it.
    pub fn create_in(dir: &Path, extension: &str) -> io::Result<Self> {
        let suffix = format!(".{}", extension);
        let temp = tempfile::Builder::new()
            .prefix(STAGING_PREFIX)
            .suffix(&suffix)
            .tempfile_in(dir)?
            .into_temp_path();
        Ok(Self { temp })
    }

    pub fn path(&self) -> &Path {
        &self.temp
    }

    /// Stop tracking the file after it has been moved elsewhere.
    pub(crate) fn disarm(self) {
        // The path no longer exists, so keeping it only skips the delete.
        let _ = self.temp.keep();
    }
}
