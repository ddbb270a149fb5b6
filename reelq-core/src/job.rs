//! Job data model: identifiers, operation parameters and status.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{CoreError, CoreResult};

/// Stable identifier of a queued job. Never reused within a queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Output containers the command builder knows how to target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Mp4,
    Mkv,
    Mov,
    Webm,
    Gif,
}

impl OutputFormat {
    pub const ALL: [OutputFormat; 5] = [
        OutputFormat::Mp4,
        OutputFormat::Mkv,
        OutputFormat::Mov,
        OutputFormat::Webm,
        OutputFormat::Gif,
    ];

    /// File extension, without the dot.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Mp4 => "mp4",
            OutputFormat::Mkv => "mkv",
            OutputFormat::Mov => "mov",
            OutputFormat::Webm => "webm",
            OutputFormat::Gif => "gif",
        }
    }

    /// Containers that accept the source streams unchanged with `-c copy`.
    #[must_use]
    pub fn supports_stream_copy(self) -> bool {
        matches!(self, OutputFormat::Mp4 | OutputFormat::Mkv | OutputFormat::Mov)
    }

    /// Containers that benefit from moving the index to the front.
    #[must_use]
    pub fn wants_faststart(self) -> bool {
        matches!(self, OutputFormat::Mp4 | OutputFormat::Mov)
    }

    #[must_use]
    pub fn is_animated_image(self) -> bool {
        self == OutputFormat::Gif
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().trim_start_matches('.');
        OutputFormat::ALL
            .into_iter()
            .find(|format| format.extension().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| CoreError::InvalidInput(format!("Unsupported output format '{s}'")))
    }
}

/// Trim selection in seconds. `end == None` keeps everything after `start`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrimRange {
    pub start: f64,
    pub end: Option<f64>,
}

impl TrimRange {
    #[must_use]
    pub fn new(start: f64, end: Option<f64>) -> Self {
        Self { start, end }
    }

    /// Checks the range before anything is launched.
    pub fn validate(&self) -> CoreResult<()> {
        if !self.start.is_finite() || self.start < 0.0 {
            return Err(CoreError::InvalidInput(format!(
                "Trim start must be a non-negative number, got {}",
                self.start
            )));
        }
        if let Some(end) = self.end {
            if !end.is_finite() || end <= self.start {
                return Err(CoreError::InvalidRange {
                    start: self.start,
                    end,
                });
            }
        }
        Ok(())
    }

    /// Length of the kept section, when the end is known.
    #[must_use]
    pub fn length(&self) -> Option<f64> {
        self.end.map(|end| end - self.start)
    }
}

/// Operation parameters for one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobParams {
    pub format: OutputFormat,
    pub fps: Option<f64>,
    pub trim: Option<TrimRange>,
}

impl JobParams {
    /// Plain container change.
    #[must_use]
    pub fn convert(format: OutputFormat) -> Self {
        Self {
            format,
            fps: None,
            trim: None,
        }
    }

    #[must_use]
    pub fn with_fps(mut self, fps: f64) -> Self {
        self.fps = Some(fps);
        self
    }

    #[must_use]
    pub fn with_trim(mut self, trim: TrimRange) -> Self {
        self.trim = Some(trim);
        self
    }

    /// Whether ffmpeg has to decode the source (anything beyond a remux).
    #[must_use]
    pub fn needs_decode(&self) -> bool {
        self.fps.is_some() || self.trim.is_some() || self.format.is_animated_image()
    }
}

/// Lifecycle status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl JobStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Succeeded | JobStatus::Failed | JobStatus::Cancelled
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

/// One queued conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub source: PathBuf,
    pub target: PathBuf,
    pub params: JobParams,
    pub status: JobStatus,
    pub progress: f64,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Local>>,
    pub finished_at: Option<DateTime<Local>>,
}

impl Job {
    pub(crate) fn new(id: JobId, source: PathBuf, target: PathBuf, params: JobParams) -> Self {
        Self {
            id,
            source,
            target,
            params,
            status: JobStatus::Pending,
            progress: 0.0,
            error: None,
            started_at: None,
            finished_at: None,
        }
    }

    /// Lower-cased file name, the key for name sorting.
    #[must_use]
    pub fn sort_name(&self) -> String {
        file_name_lower(&self.source)
    }

    pub(crate) fn mark_running(&mut self) {
        self.status = JobStatus::Running;
        self.progress = 0.0;
        self.error = None;
        self.started_at = Some(Local::now());
        self.finished_at = None;
    }

    /// Raises progress; lower values are ignored so the fraction never goes back.
    pub(crate) fn advance(&mut self, fraction: f64) -> bool {
        // 1.0 is reserved for the Succeeded transition
        let fraction = fraction.clamp(0.0, MAX_RUNNING_PROGRESS);
        if self.status == JobStatus::Running && fraction > self.progress {
            self.progress = fraction;
            true
        } else {
            false
        }
    }

    pub(crate) fn finish(&mut self, status: JobStatus, error: Option<String>) {
        self.status = status;
        if status == JobStatus::Succeeded {
            self.progress = 1.0;
        }
        self.error = error;
        self.finished_at = Some(Local::now());
    }
}

/// Highest fraction reported while a job is still Running.
pub const MAX_RUNNING_PROGRESS: f64 = 0.999;

pub(crate) fn file_name_lower(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}
