// ============================================================================
// reelq-core/src/config/builder.rs
// ============================================================================
//
// CONFIGURATION BUILDER: Builder Pattern for CoreConfig
//
// Fluent construction of CoreConfig. Every field starts at the defaults from
// config/mod.rs; `build` validates the result.

// ---- Standard library imports ----
use std::path::PathBuf;
use std::time::Duration;

// ---- Internal crate imports ----
use super::{CoreConfig, EncoderPriority};
use crate::error::CoreResult;
use crate::job::OutputFormat;

/// Builder for creating CoreConfig instances.
///
/// # Examples
///
/// ```rust
/// use reelq_core::config::CoreConfigBuilder;
/// use reelq_core::OutputFormat;
///
/// let config = CoreConfigBuilder::new()
///     .ffmpeg_program("/opt/ffmpeg/bin/ffmpeg")
///     .video_encoders(OutputFormat::Mp4, ["h264_nvenc", "libx264"])
///     .gif_fps(12.0)
///     .build()
///     .unwrap();
/// assert_eq!(config.encoder_priority.video(OutputFormat::Mp4)[0], "h264_nvenc");
/// ```
#[derive(Debug, Clone, Default)]
pub struct CoreConfigBuilder {
    config: CoreConfig,
}

impl CoreConfigBuilder {
    /// Creates a new CoreConfigBuilder with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the ffmpeg program name or path.
    pub fn ffmpeg_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.config.ffmpeg_program = program.into();
        self
    }

    /// Replaces the whole encoder priority table.
    pub fn encoder_priority(mut self, priority: EncoderPriority) -> Self {
        self.config.encoder_priority = priority;
        self
    }

    /// Overrides the video encoder candidates for one container.
    pub fn video_encoders<I, S>(mut self, format: OutputFormat, candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.encoder_priority.set_video(format, candidates);
        self
    }

    /// Overrides the audio encoder candidates for one container.
    pub fn audio_encoders<I, S>(mut self, format: OutputFormat, candidates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.encoder_priority.set_audio(format, candidates);
        self
    }

    /// Sets the gif frame rate used when a job has no fps target.
    pub fn gif_fps(mut self, fps: f64) -> Self {
        self.config.gif_fps = fps;
        self
    }

    /// Sets the gif width constraint.
    pub fn gif_width(mut self, width: u32) -> Self {
        self.config.gif_width = width;
        self
    }

    /// Sets the grace period before a cancelled process is killed.
    pub fn cancel_timeout(mut self, timeout: Duration) -> Self {
        self.config.cancel_timeout = timeout;
        self
    }

    /// Sets how many diagnostic lines a failure message keeps.
    pub fn error_tail_lines(mut self, lines: usize) -> Self {
        self.config.error_tail_lines = lines;
        self
    }

    /// Sets the bounded capacity of the runner event channel.
    pub fn event_channel_capacity(mut self, capacity: usize) -> Self {
        self.config.event_channel_capacity = capacity;
        self
    }

    /// Sets the output directory.
    pub fn output_dir(mut self, output_dir: PathBuf) -> Self {
        self.config.output_dir = output_dir;
        self
    }

    /// Sets the output name for single-file runs.
    pub fn output_name(mut self, name: &str) -> Self {
        self.config.output_name = name.to_string();
        self
    }

    /// Keep source file stems when converting several files.
    pub fn keep_names(mut self, keep: bool) -> Self {
        self.config.keep_names = keep;
        self
    }

    /// Sets the thumbnail width.
    pub fn preview_width(mut self, width: u32) -> Self {
        self.config.preview_width = width;
        self
    }

    /// Sets the thumbnail cache capacity.
    pub fn preview_cache_capacity(mut self, capacity: usize) -> Self {
        self.config.preview_cache_capacity = capacity;
        self
    }

    /// Sets the directory for temporary files.
    pub fn temp_dir(mut self, temp_dir: PathBuf) -> Self {
        self.config.temp_dir = Some(temp_dir);
        self
    }

    /// Validates and returns the configuration.
    pub fn build(self) -> CoreResult<CoreConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
