//! Temporary file management utilities.
//!
//! Thin helpers over the tempfile crate. Files are removed when the returned
//! handle is dropped, including on error paths.

use crate::config::CoreConfig;
use crate::error::CoreResult;
use std::path::{Path, PathBuf};
use tempfile::{Builder as TempFileBuilder, NamedTempFile};

/// Directory for temporary files: the configured one or the system default.
#[must_use]
pub fn temp_base_dir(config: &CoreConfig) -> PathBuf {
    config
        .temp_dir
        .clone()
        .unwrap_or_else(std::env::temp_dir)
}

/// Creates a temporary file with prefix and extension. Auto-deleted when dropped.
pub fn create_temp_file(dir: &Path, prefix: &str, extension: &str) -> CoreResult<NamedTempFile> {
    std::fs::create_dir_all(dir)?;
    let temp_file = TempFileBuilder::new()
        .prefix(&format!("{prefix}_"))
        .suffix(&format!(".{extension}"))
        .tempfile_in(dir)?;

    Ok(temp_file)
}
