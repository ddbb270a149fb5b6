//! File discovery module for finding video files to convert.
//!
//! Scans the top level of a directory for files with a known video
//! extension (case-insensitive). Subdirectories are not searched.

use crate::error::{CoreError, CoreResult};

use std::path::{Path, PathBuf};

/// Extensions accepted as conversion sources.
pub const VIDEO_EXTENSIONS: [&str; 9] = ["mp4", "mkv", "mov", "webm", "avi", "m4v", "mpg", "mpeg", "gif"];

/// Whether the path has one of the [`VIDEO_EXTENSIONS`].
#[must_use]
pub fn is_video_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| VIDEO_EXTENSIONS.iter().any(|known| known.eq_ignore_ascii_case(ext)))
}

/// Finds video files in the specified directory, sorted by file name.
///
/// # Returns
///
/// * `Ok(Vec<PathBuf>)` - Paths of the discovered files
/// * `Err(CoreError::Io)` - If the directory cannot be read
/// * `Err(CoreError::NoFilesFound)` - If no video files are present
///
/// # Examples
///
/// ```rust,no_run
/// use reelq_core::find_processable_files;
/// use std::path::Path;
///
/// match find_processable_files(Path::new("/path/to/videos")) {
///     Ok(files) => println!("Found {} video files", files.len()),
///     Err(e) => println!("Error finding video files: {}", e),
/// }
/// ```
pub fn find_processable_files(input_dir: &Path) -> CoreResult<Vec<PathBuf>> {
    let read_dir = std::fs::read_dir(input_dir)?;
    let mut files: Vec<PathBuf> = read_dir
        .filter_map(|entry| {
            let path = entry.ok()?.path();
            (path.is_file() && is_video_file(&path)).then_some(path)
        })
        .collect();

    if files.is_empty() {
        return Err(CoreError::NoFilesFound);
    }
    files.sort_by_key(|path| crate::job::file_name_lower(path));
    Ok(files)
}
