//! Output path planning.
//!
//! A single source is written to `<output_dir>/<output_name>.<ext>`. When a
//! batch holds several sources and `keep_names` is set, each output takes the
//! source's file stem instead, so outputs do not overwrite each other.

use std::path::{Path, PathBuf};

use crate::config::CoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::job::OutputFormat;

/// Computes the target path for `source`.
///
/// # Errors
///
/// * `CoreError::PathError` - the output directory does not exist
/// * `CoreError::InvalidInput` - the resulting file name is empty
pub fn plan_output_path(
    config: &CoreConfig,
    source: &Path,
    format: OutputFormat,
    batch_len: usize,
) -> CoreResult<PathBuf> {
    if !config.output_dir.is_dir() {
        return Err(CoreError::PathError(format!(
            "Output directory {} does not exist",
            config.output_dir.display()
        )));
    }

    let name = if batch_len > 1 && config.keep_names {
        source
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    } else {
        config.output_name.trim().to_string()
    };
    let name = strip_extension(&name, format);
    if name.is_empty() {
        return Err(CoreError::InvalidInput("Output name must not be empty".to_string()));
    }

    Ok(config
        .output_dir
        .join(format!("{name}.{}", format.extension())))
}

/// Drops a trailing `.<ext>` the user already typed.
fn strip_extension(name: &str, format: OutputFormat) -> String {
    let suffix = format!(".{}", format.extension());
    if name.len() > suffix.len() && name.to_ascii_lowercase().ends_with(&suffix) {
        name[..name.len() - suffix.len()].to_string()
    } else {
        name.to_string()
    }
}
