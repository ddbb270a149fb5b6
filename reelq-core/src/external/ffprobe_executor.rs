//! FFprobe integration for media inspection
//!
//! The command builder needs two facts about a source before it launches
//! ffmpeg: the container duration (to resolve trim ends) and the video codec
//! (to confirm a decoder exists). Both come from one ffprobe run.

use crate::error::{CoreError, CoreResult};
use ffprobe::{FfProbeError, ffprobe};
use std::path::Path;

/// Facts about a source file. Fields are `None` when ffprobe could not tell.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MediaInfo {
    /// Duration of the media in seconds
    pub duration: Option<f64>,
    /// Codec name of the first video stream
    pub video_codec: Option<String>,
}

/// Looks up media facts for a source file.
pub trait MediaProber: Send + Sync {
    fn probe(&self, path: &Path) -> CoreResult<MediaInfo>;
}

/// `MediaProber` backed by the ffprobe crate.
#[derive(Debug, Clone, Default)]
pub struct FfprobeProber;

impl MediaProber for FfprobeProber {
    fn probe(&self, path: &Path) -> CoreResult<MediaInfo> {
        log::debug!("Running ffprobe (via crate) on: {}", path.display());
        let metadata = ffprobe(path).map_err(|err| map_ffprobe_error(err, path))?;

        let duration = metadata
            .format
            .duration
            .as_deref()
            .and_then(|d| d.parse::<f64>().ok())
            .filter(|d| d.is_finite() && *d > 0.0);

        let video_codec = metadata
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"))
            .and_then(|s| s.codec_name.clone());

        Ok(MediaInfo {
            duration,
            video_codec,
        })
    }
}

/// Prober that knows nothing. Used when inspection is switched off.
#[derive(Debug, Clone, Default)]
pub struct NoopProber;

impl MediaProber for NoopProber {
    fn probe(&self, _path: &Path) -> CoreResult<MediaInfo> {
        Ok(MediaInfo::default())
    }
}

fn map_ffprobe_error(err: FfProbeError, path: &Path) -> CoreError {
    let detail = match err {
        FfProbeError::Io(io_err) => format!("could not run ffprobe: {io_err}"),
        FfProbeError::Status(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            format!("ffprobe failed: {}", stderr.trim())
        }
        FfProbeError::Deserialize(err) => format!("unreadable ffprobe output: {err}"),
        other => format!("{other:?}"),
    };
    CoreError::MediaProbe(format!("{}: {detail}", path.display()))
}
