//! Core library for batch video conversion driven by an external ffmpeg.
//!
//! This crate builds ffmpeg command lines from job parameters, runs one
//! ffmpeg process at a time, turns its diagnostic output into progress
//! fractions and keeps an ordered, cancellable batch queue. It also extracts
//! scrubber thumbnails.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use reelq_core::{
//!     BatchQueue, CoreConfig, FfprobeProber, JobParams, OutputFormat, Session, SidecarSpawner,
//!     SortOrder,
//! };
//! use std::sync::Arc;
//!
//! let spawner = Arc::new(SidecarSpawner);
//! let session = Session::open(CoreConfig::default(), spawner.as_ref()).unwrap();
//! let queue = BatchQueue::new(session, spawner, Arc::new(FfprobeProber));
//!
//! queue
//!     .add("clips/B.mov", "out/B.mp4", JobParams::convert(OutputFormat::Mp4))
//!     .unwrap();
//! queue
//!     .add("clips/A.mp4", "out/A.mp4", JobParams::convert(OutputFormat::Mp4).with_fps(30.0))
//!     .unwrap();
//! queue.sort(SortOrder::NameAsc).unwrap();
//! queue.start().unwrap();
//! queue.wait_idle();
//! println!("{:?}", queue.summary());
//! ```

pub mod capabilities;
pub mod command;
pub mod config;
pub mod discovery;
pub mod error;
pub mod external;
pub mod job;
pub mod output;
pub mod preview;
pub mod progress;
pub mod queue;
pub mod runner;
pub mod session;
pub mod temp_files;
pub mod utils;

// Re-exports for public API
pub use capabilities::EncoderCapabilities;
pub use command::{build_command, expected_output_duration, resolve_trim};
pub use config::{CoreConfig, CoreConfigBuilder, EncoderPriority};
pub use discovery::{VIDEO_EXTENSIONS, find_processable_files, is_video_file};
pub use error::{CoreError, CoreResult};
pub use external::{
    FfprobeProber, MediaInfo, MediaProber, NoopProber, ProcessSpawner, SidecarSpawner,
    ToolInvocation, ToolProcess,
};
pub use job::{Job, JobId, JobParams, JobStatus, OutputFormat, TrimRange};
pub use output::plan_output_path;
pub use preview::{PreviewCache, PreviewExtractor, build_preview_args};
pub use progress::{DiagnosticLines, ProgressParser};
pub use queue::{BatchQueue, BatchSummary, QueueEvent, QueueHandle, QueueObserver, QueueState, SortOrder};
pub use runner::{JobEvent, JobOutcome, JobRunner, RunningJob};
pub use session::Session;
pub use utils::{format_bytes, format_clock, format_duration, parse_ffmpeg_time, parse_time_input};
