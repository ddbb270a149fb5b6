//! Error types for the reelq-core library.
//!
//! Errors fall into two groups. Session-level errors (`ToolNotFound`) stop the
//! application before any job is queued. Per-job errors (`InvalidRange`,
//! `DecoderUnavailable`, `ProcessLaunchFailed`, `ProcessExitedNonZero`,
//! `ProcessTimeoutOnCancel`) are recorded on the job and never halt the batch.

use crate::job::JobId;

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Errors produced by the core library.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("External tool '{0}' was not found on the execution path")]
    ToolNotFound(String),

    #[error("Invalid trim range: end ({end:.3}s) must be after start ({start:.3}s)")]
    InvalidRange { start: f64, end: f64 },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("The installed ffmpeg cannot decode '{0}'. Install a full build or disable trim/FPS change")]
    DecoderUnavailable(String),

    #[error("Failed to launch '{0}': {1}")]
    ProcessLaunchFailed(String, #[source] io::Error),

    #[error("ffmpeg exited with {}: {tail}", describe_exit_code(.code))]
    ProcessExitedNonZero { code: Option<i32>, tail: String },

    #[error("Process did not stop within {0:?} after cancellation; it was killed")]
    ProcessTimeoutOnCancel(Duration),

    #[error("Queue is busy: {0}")]
    QueueBusy(String),

    #[error("Job {0} not found")]
    JobNotFound(JobId),

    #[error("Path error: {0}")]
    PathError(String),

    #[error("No processable files found")]
    NoFilesFound,

    #[error("Media probe failed: {0}")]
    MediaProbe(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

/// Result alias used throughout the crate.
pub type CoreResult<T> = Result<T, CoreError>;

fn describe_exit_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "no status (terminated by signal)".to_string(),
    }
}

/// Maps a spawn failure to `ToolNotFound` or `ProcessLaunchFailed`.
pub fn command_start_error(program: &str, err: io::Error) -> CoreError {
    if err.kind() == io::ErrorKind::NotFound {
        CoreError::ToolNotFound(program.to_string())
    } else {
        CoreError::ProcessLaunchFailed(program.to_string(), err)
    }
}

/// Builds the error for a process that finished unsuccessfully.
pub fn command_failed_error(code: Option<i32>, tail: impl Into<String>) -> CoreError {
    CoreError::ProcessExitedNonZero {
        code,
        tail: tail.into(),
    }
}
