//! Configuration structures and constants for the reelq-core library.
//!
//! `CoreConfig` is created once per session by the front end and shared
//! read-only by the command builder, job runner and batch queue.

mod builder;

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{CoreError, CoreResult};
use crate::job::OutputFormat;

pub use builder::CoreConfigBuilder;

// Default constants

/// Program name looked up on the execution path.
pub const DEFAULT_FFMPEG_PROGRAM: &str = "ffmpeg";

/// Frame rate used for animated-image export when no target is given.
pub const DEFAULT_GIF_FPS: f64 = 10.0;

/// Maximum width of animated-image exports; height follows the aspect ratio.
pub const DEFAULT_GIF_WIDTH: u32 = 640;

/// How long a cancelled process gets to quit before it is killed.
pub const DEFAULT_CANCEL_TIMEOUT: Duration = Duration::from_secs(3);

/// Diagnostic lines kept for the error message of a failed job.
pub const DEFAULT_ERROR_TAIL_LINES: usize = 20;

/// Capacity of the runner-to-queue event channel.
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 64;

/// Output file name used for single-file runs.
pub const DEFAULT_OUTPUT_NAME: &str = "output";

/// Width of scrubber thumbnails.
pub const DEFAULT_PREVIEW_WIDTH: u32 = 360;

/// Number of thumbnails kept in memory.
pub const DEFAULT_PREVIEW_CACHE_CAPACITY: usize = 20;

/// Trim ends closer than this to the media end (or to the start) become open-ended.
pub const TRIM_SNAP_TOLERANCE_SECS: f64 = 0.01;

const H264_FAMILY_VIDEO: [&str; 6] = [
    "libx264",
    "libopenh264",
    "h264_v4l2m2m",
    "h264_vaapi",
    "h264_nvenc",
    "mpeg4",
];
const H264_FAMILY_AUDIO: [&str; 2] = ["aac", "libfdk_aac"];
const WEBM_VIDEO: [&str; 4] = ["libvpx-vp9", "libvpx", "vp9", "vp8"];
const WEBM_AUDIO: [&str; 4] = ["libopus", "libvorbis", "opus", "vorbis"];
const GIF_VIDEO: [&str; 1] = ["gif"];

/// Ordered encoder preferences per output container.
///
/// The command builder walks each list and picks the first name present in
/// the session's capability set. An empty or exhausted list omits the codec
/// flag so ffmpeg chooses its own default.
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderPriority {
    video: HashMap<OutputFormat, Vec<String>>,
    audio: HashMap<OutputFormat, Vec<String>>,
}

impl Default for EncoderPriority {
    fn default() -> Self {
        let mut priority = Self {
            video: HashMap::new(),
            audio: HashMap::new(),
        };
        for format in [OutputFormat::Mp4, OutputFormat::Mkv, OutputFormat::Mov] {
            priority.set_video(format, H264_FAMILY_VIDEO);
            priority.set_audio(format, H264_FAMILY_AUDIO);
        }
        priority.set_video(OutputFormat::Webm, WEBM_VIDEO);
        priority.set_audio(OutputFormat::Webm, WEBM_AUDIO);
        priority.set_video(OutputFormat::Gif, GIF_VIDEO);
        priority
    }
}

impl EncoderPriority {
    /// Replaces the video encoder candidates for a container.
    pub fn set_video<I, S>(&mut self, format: OutputFormat, candidates: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.video
            .insert(format, candidates.into_iter().map(Into::into).collect());
    }

    /// Replaces the audio encoder candidates for a container.
    pub fn set_audio<I, S>(&mut self, format: OutputFormat, candidates: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.audio
            .insert(format, candidates.into_iter().map(Into::into).collect());
    }

    #[must_use]
    pub fn video(&self, format: OutputFormat) -> &[String] {
        self.video.get(&format).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn audio(&self, format: OutputFormat) -> &[String] {
        self.audio.get(&format).map_or(&[], Vec::as_slice)
    }
}

/// Main configuration structure for the reelq-core library.
///
/// All fields have sensible defaults; use [`CoreConfigBuilder`] to override
/// them fluently.
///
/// # Examples
///
/// ```rust
/// use reelq_core::config::CoreConfigBuilder;
/// use std::path::PathBuf;
/// use std::time::Duration;
///
/// let config = CoreConfigBuilder::new()
///     .output_dir(PathBuf::from("/tmp/out"))
///     .keep_names(true)
///     .cancel_timeout(Duration::from_secs(5))
///     .build()
///     .unwrap();
/// assert_eq!(config.gif_width, 640);
/// ```
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// ffmpeg program name or path
    pub ffmpeg_program: PathBuf,

    /// Encoder fallback order per container
    pub encoder_priority: EncoderPriority,

    /// Frame rate for gif export when the job has no fps target
    pub gif_fps: f64,

    /// Width constraint for gif export
    pub gif_width: u32,

    /// Grace period between the quit request and a forced kill
    pub cancel_timeout: Duration,

    /// Number of diagnostic lines kept for failure messages
    pub error_tail_lines: usize,

    /// Bounded capacity of the runner event channel
    pub event_channel_capacity: usize,

    /// Directory receiving converted files
    pub output_dir: PathBuf,

    /// Output file name (without extension) for single-file runs
    pub output_name: String,

    /// Use each source's file stem when converting more than one file
    pub keep_names: bool,

    /// Thumbnail width for the scrubber
    pub preview_width: u32,

    /// Thumbnails kept in the preview cache
    pub preview_cache_capacity: usize,

    /// Optional directory for temporary files (defaults to the system temp dir)
    pub temp_dir: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            ffmpeg_program: PathBuf::from(DEFAULT_FFMPEG_PROGRAM),
            encoder_priority: EncoderPriority::default(),
            gif_fps: DEFAULT_GIF_FPS,
            gif_width: DEFAULT_GIF_WIDTH,
            cancel_timeout: DEFAULT_CANCEL_TIMEOUT,
            error_tail_lines: DEFAULT_ERROR_TAIL_LINES,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            output_dir: PathBuf::from("."),
            output_name: DEFAULT_OUTPUT_NAME.to_string(),
            keep_names: true,
            preview_width: DEFAULT_PREVIEW_WIDTH,
            preview_cache_capacity: DEFAULT_PREVIEW_CACHE_CAPACITY,
            temp_dir: None,
        }
    }
}

impl CoreConfig {
    /// Checks values that would otherwise fail deep inside a run.
    pub fn validate(&self) -> CoreResult<()> {
        if self.ffmpeg_program.as_os_str().is_empty() {
            return Err(CoreError::InvalidInput(
                "ffmpeg program must not be empty".to_string(),
            ));
        }
        if !(self.gif_fps.is_finite() && self.gif_fps > 0.0) {
            return Err(CoreError::InvalidInput(format!(
                "gif frame rate must be positive, got {}",
                self.gif_fps
            )));
        }
        if self.gif_width == 0 || self.preview_width == 0 {
            return Err(CoreError::InvalidInput(
                "gif and preview widths must be positive".to_string(),
            ));
        }
        if self.event_channel_capacity == 0 {
            return Err(CoreError::InvalidInput(
                "event channel capacity must be at least 1".to_string(),
            ));
        }
        if self.preview_cache_capacity == 0 {
            return Err(CoreError::InvalidInput(
                "preview cache capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = CoreConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.ffmpeg_program, PathBuf::from("ffmpeg"));
        assert_eq!(config.cancel_timeout, Duration::from_secs(3));
        assert!(config.keep_names);
    }

    #[test]
    fn test_default_priority_lists() {
        let priority = EncoderPriority::default();
        assert_eq!(priority.video(OutputFormat::Mp4)[0], "libx264");
        assert_eq!(priority.video(OutputFormat::Mov), priority.video(OutputFormat::Mkv));
        assert_eq!(priority.audio(OutputFormat::Webm)[0], "libopus");
        assert_eq!(priority.video(OutputFormat::Gif), ["gif".to_string()]);
        assert!(priority.audio(OutputFormat::Gif).is_empty());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = CoreConfig {
            gif_fps: 0.0,
            ..CoreConfig::default()
        };
        assert!(config.validate().is_err());

        let config = CoreConfig {
            event_channel_capacity: 0,
            ..CoreConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
