// ============================================================================
// reelq-core/src/command.rs
// ============================================================================
//
// COMMAND BUILDER: ffmpeg Argument Lists from Job Parameters
//
// Produces the ordered argument vector for one job. Global flags come first,
// then input options and the input, then filters and codecs, then output
// options, and the output path last.
//
// KEY COMPONENTS:
// - build_command: full argument list for a job
// - resolve_trim: trim range checked against the probed media duration
// - expected_output_duration: length of the output, for progress
//
// Nothing here launches a process; every rejection happens before the runner
// is involved.

use std::path::Path;

use crate::capabilities::EncoderCapabilities;
use crate::config::{CoreConfig, TRIM_SNAP_TOLERANCE_SECS};
use crate::error::{CoreError, CoreResult};
use crate::external::MediaInfo;
use crate::job::{JobParams, TrimRange};

/// Builds the ffmpeg arguments (without the program) for one job.
///
/// # Errors
///
/// * `CoreError::InvalidRange` - trim end not after start, or start past the media end
/// * `CoreError::InvalidInput` - frame-rate target not a positive number
/// * `CoreError::DecoderUnavailable` - the source codec cannot be decoded
pub fn build_command(
    params: &JobParams,
    source: &Path,
    target: &Path,
    caps: &EncoderCapabilities,
    config: &CoreConfig,
    media: Option<&MediaInfo>,
) -> CoreResult<Vec<String>> {
    let trim = params
        .trim
        .map(|trim| resolve_trim(&trim, media.and_then(|m| m.duration)))
        .transpose()?;
    if let Some(fps) = params.fps {
        validate_fps(fps)?;
    }
    if params.needs_decode() {
        check_decoder(caps, media)?;
    }

    let mut args: Vec<String> = vec!["-y".into()];

    if let Some(trim) = &trim {
        args.push("-ss".into());
        args.push(format_seconds(trim.start));
    }
    args.push("-i".into());
    args.push(source.to_string_lossy().into_owned());
    if let Some(length) = trim.as_ref().and_then(TrimRange::length) {
        args.push("-t".into());
        args.push(format_seconds(length));
    }

    let format = params.format;
    let priority = &config.encoder_priority;

    if format.is_animated_image() {
        let fps = params.fps.unwrap_or(config.gif_fps);
        args.push("-vf".into());
        args.push(format!(
            "fps={},scale={}:-1:flags=lanczos",
            format_number(fps),
            config.gif_width
        ));
        if let Some(encoder) = caps.pick_encoder(priority.video(format)) {
            args.push("-c:v".into());
            args.push(encoder.to_string());
        }
        args.push("-an".into());
    } else if format.supports_stream_copy() && params.fps.is_none() && trim.is_none() {
        args.push("-c".into());
        args.push("copy".into());
    } else {
        if let Some(fps) = params.fps {
            args.push("-filter:v".into());
            args.push(format!("fps={}", format_number(fps)));
        }
        match caps.pick_encoder(priority.video(format)) {
            Some(encoder) => {
                args.push("-c:v".into());
                args.push(encoder.to_string());
            }
            None => log::debug!("No preferred video encoder available for {format}; using ffmpeg default"),
        }
        match caps.pick_encoder(priority.audio(format)) {
            Some(encoder) => {
                args.push("-c:a".into());
                args.push(encoder.to_string());
            }
            None => log::debug!("No preferred audio encoder available for {format}; using ffmpeg default"),
        }
    }

    if format.wants_faststart() {
        args.push("-movflags".into());
        args.push("+faststart".into());
    }

    args.push(target.to_string_lossy().into_owned());
    Ok(args)
}

/// Checks a trim range against the media duration, when known.
///
/// An end within the snap tolerance of the media end, or of the start, is
/// treated as open-ended.
pub fn resolve_trim(trim: &TrimRange, duration: Option<f64>) -> CoreResult<TrimRange> {
    trim.validate()?;
    let mut resolved = *trim;

    if let Some(duration) = duration {
        if trim.start >= duration {
            return Err(CoreError::InvalidRange {
                start: trim.start,
                end: duration,
            });
        }
        if let Some(end) = trim.end {
            if end >= duration - TRIM_SNAP_TOLERANCE_SECS {
                resolved.end = None;
            }
        }
    }
    if let Some(end) = resolved.end {
        if (end - resolved.start).abs() <= TRIM_SNAP_TOLERANCE_SECS {
            resolved.end = None;
        }
    }
    Ok(resolved)
}

/// Duration of the produced output in seconds, when it differs from the input.
#[must_use]
pub fn expected_output_duration(params: &JobParams, media: Option<&MediaInfo>) -> Option<f64> {
    let trim = params.trim?;
    let duration = media.and_then(|m| m.duration);
    let resolved = resolve_trim(&trim, duration).ok()?;
    match resolved.end {
        Some(end) => Some(end - resolved.start),
        None => duration.map(|d| d - resolved.start),
    }
}

fn validate_fps(fps: f64) -> CoreResult<()> {
    if fps.is_finite() && fps > 0.0 {
        Ok(())
    } else {
        Err(CoreError::InvalidInput(format!(
            "Frame rate must be a positive number, got {fps}"
        )))
    }
}

fn check_decoder(caps: &EncoderCapabilities, media: Option<&MediaInfo>) -> CoreResult<()> {
    // An empty decoder listing means the probe told us nothing.
    if !caps.knows_decoders() {
        return Ok(());
    }
    match media.and_then(|m| m.video_codec.as_deref()) {
        Some(codec) if !caps.has_decoder(codec) => {
            Err(CoreError::DecoderUnavailable(codec.to_string()))
        }
        _ => Ok(()),
    }
}

fn format_seconds(seconds: f64) -> String {
    format!("{seconds:.3}")
}

fn format_number(value: f64) -> String {
    format!("{value}")
}

/// Whether the job remuxes without touching the streams.
#[must_use]
pub fn is_stream_copy(params: &JobParams) -> bool {
    params.format.supports_stream_copy() && !params.needs_decode()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::OutputFormat;
    use std::path::PathBuf;

    fn caps() -> EncoderCapabilities {
        EncoderCapabilities::new(["libx264", "aac", "libvpx-vp9", "libopus", "gif"], ["h264", "vp9"])
    }

    fn paths() -> (PathBuf, PathBuf) {
        (PathBuf::from("/in/A.mp4"), PathBuf::from("/out/A.mp4"))
    }

    #[test]
    fn test_remux_uses_stream_copy() {
        let (src, _) = paths();
        let args = build_command(
            &JobParams::convert(OutputFormat::Mkv),
            &src,
            Path::new("/out/A.mkv"),
            &caps(),
            &CoreConfig::default(),
            None,
        )
        .unwrap();
        assert_eq!(args, vec!["-y", "-i", "/in/A.mp4", "-c", "copy", "/out/A.mkv"]);
        assert!(is_stream_copy(&JobParams::convert(OutputFormat::Mp4)));
        assert!(!is_stream_copy(&JobParams::convert(OutputFormat::Webm)));
    }

    #[test]
    fn test_fps_change_reencodes() {
        let (src, dst) = paths();
        let params = JobParams::convert(OutputFormat::Mp4).with_fps(30.0);
        let args = build_command(&params, &src, &dst, &caps(), &CoreConfig::default(), None).unwrap();
        assert_eq!(
            args,
            vec![
                "-y", "-i", "/in/A.mp4", "-filter:v", "fps=30", "-c:v", "libx264", "-c:a", "aac",
                "-movflags", "+faststart", "/out/A.mp4"
            ]
        );
    }

    #[test]
    fn test_trim_emits_seek_and_length() {
        let (src, dst) = paths();
        let params = JobParams::convert(OutputFormat::Mp4).with_trim(TrimRange::new(1.5, Some(4.0)));
        let args = build_command(&params, &src, &dst, &caps(), &CoreConfig::default(), None).unwrap();
        assert_eq!(&args[..7], &["-y", "-ss", "1.500", "-i", "/in/A.mp4", "-t", "2.500"]);
        assert!(!args.contains(&"copy".to_string()));
    }

    #[test]
    fn test_gif_chain() {
        let (src, _) = paths();
        let dst = PathBuf::from("/out/A.gif");
        let args = build_command(
            &JobParams::convert(OutputFormat::Gif),
            &src,
            &dst,
            &caps(),
            &CoreConfig::default(),
            None,
        )
        .unwrap();
        assert_eq!(
            args,
            vec!["-y", "-i", "/in/A.mp4", "-vf", "fps=10,scale=640:-1:flags=lanczos", "-c:v", "gif", "-an", "/out/A.gif"]
        );
    }

    #[test]
    fn test_invalid_fps_rejected() {
        let (src, dst) = paths();
        for fps in [0.0, -5.0, f64::NAN] {
            let params = JobParams::convert(OutputFormat::Mp4).with_fps(fps);
            let result = build_command(&params, &src, &dst, &caps(), &CoreConfig::default(), None);
            assert!(matches!(result, Err(CoreError::InvalidInput(_))));
        }
    }

    #[test]
    fn test_resolve_trim_snaps_near_media_end() {
        let trim = TrimRange::new(2.0, Some(9.995));
        assert_eq!(resolve_trim(&trim, Some(10.0)).unwrap().end, None);

        let trim = TrimRange::new(2.0, Some(8.0));
        assert_eq!(resolve_trim(&trim, Some(10.0)).unwrap().end, Some(8.0));

        let trim = TrimRange::new(2.0, Some(2.005));
        assert_eq!(resolve_trim(&trim, None).unwrap().end, None);
    }

    #[test]
    fn test_resolve_trim_start_past_end_of_media() {
        let trim = TrimRange::new(12.0, None);
        assert!(matches!(
            resolve_trim(&trim, Some(10.0)),
            Err(CoreError::InvalidRange { .. })
        ));
    }

    #[test]
    fn test_expected_output_duration() {
        let media = MediaInfo {
            duration: Some(60.0),
            video_codec: Some("h264".into()),
        };
        let closed = JobParams::convert(OutputFormat::Mp4).with_trim(TrimRange::new(10.0, Some(25.0)));
        assert_eq!(expected_output_duration(&closed, Some(&media)), Some(15.0));

        let open = JobParams::convert(OutputFormat::Mp4).with_trim(TrimRange::new(10.0, None));
        assert_eq!(expected_output_duration(&open, Some(&media)), Some(50.0));
        assert_eq!(expected_output_duration(&open, None), None);

        assert_eq!(
            expected_output_duration(&JobParams::convert(OutputFormat::Mp4), Some(&media)),
            None
        );
    }

    #[test]
    fn test_decoder_check_only_when_decoding() {
        let (src, dst) = paths();
        let media = MediaInfo {
            duration: Some(10.0),
            video_codec: Some("prores".into()),
        };
        let remux = build_command(
            &JobParams::convert(OutputFormat::Mp4),
            &src,
            &dst,
            &caps(),
            &CoreConfig::default(),
            Some(&media),
        );
        assert!(remux.is_ok());

        let params = JobParams::convert(OutputFormat::Mp4).with_fps(24.0);
        let result = build_command(&params, &src, &dst, &caps(), &CoreConfig::default(), Some(&media));
        assert!(matches!(result, Err(CoreError::DecoderUnavailable(ref c)) if c == "prores"));
    }
}
