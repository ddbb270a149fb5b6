// reelq-core/tests/command_builder_tests.rs

use reelq_core::config::CoreConfigBuilder;
use reelq_core::{
    CoreConfig, CoreError, EncoderCapabilities, JobParams, MediaInfo, OutputFormat, TrimRange, build_command,
};
use std::path::Path;

fn full_caps() -> EncoderCapabilities {
    EncoderCapabilities::new(
        ["libx264", "h264_nvenc", "mpeg4", "aac", "libvpx-vp9", "libvpx", "libopus", "libvorbis", "gif"],
        ["h264", "hevc", "vp9", "gif"],
    )
}

fn build(params: &JobParams, caps: &EncoderCapabilities, config: &CoreConfig) -> Result<Vec<String>, CoreError> {
    let target = format!("/out/clip.{}", params.format.extension());
    build_command(params, Path::new("/in/clip.mov"), Path::new(&target), caps, config, None)
}

fn value_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

#[test]
fn test_input_precedes_filters_precedes_output() {
    let params = JobParams::convert(OutputFormat::Mp4)
        .with_fps(25.0)
        .with_trim(TrimRange::new(3.0, Some(9.0)));
    let args = build(&params, &full_caps(), &CoreConfig::default()).unwrap();

    let ss = args.iter().position(|a| a == "-ss").unwrap();
    let input = args.iter().position(|a| a == "-i").unwrap();
    let filter = args.iter().position(|a| a == "-filter:v").unwrap();
    let codec = args.iter().position(|a| a == "-c:v").unwrap();
    assert_eq!(args[0], "-y");
    assert!(ss < input);
    assert!(input < filter);
    assert!(filter < codec);
    assert_eq!(args.last().unwrap(), "/out/clip.mp4");
    assert_eq!(value_after(&args, "-t"), Some("6.000"));
}

#[test]
fn test_inverted_trim_is_invalid_range() {
    for end in [1.0, 5.0] {
        let params = JobParams::convert(OutputFormat::Mkv).with_trim(TrimRange::new(5.0, Some(end)));
        match build(&params, &full_caps(), &CoreConfig::default()) {
            Err(CoreError::InvalidRange { start, end: e }) => {
                assert_eq!(start, 5.0);
                assert_eq!(e, end);
            }
            other => panic!("expected InvalidRange, got {other:?}"),
        }
    }
}

#[test]
fn test_open_ended_trim_only_seeks() {
    let params = JobParams::convert(OutputFormat::Webm).with_trim(TrimRange::new(2.0, None));
    let args = build(&params, &full_caps(), &CoreConfig::default()).unwrap();
    assert_eq!(value_after(&args, "-ss"), Some("2.000"));
    assert!(!args.contains(&"-t".to_string()));
}

#[test]
fn test_encoder_fallback_when_preferred_missing() {
    let caps = EncoderCapabilities::new(["h264_nvenc", "mpeg4", "libfdk_aac", "vp8", "vorbis"], Vec::<&str>::new());
    let config = CoreConfig::default();

    let mp4 = build(&JobParams::convert(OutputFormat::Mp4).with_fps(30.0), &caps, &config).unwrap();
    assert_eq!(value_after(&mp4, "-c:v"), Some("h264_nvenc"));
    assert_eq!(value_after(&mp4, "-c:a"), Some("libfdk_aac"));

    let webm = build(&JobParams::convert(OutputFormat::Webm), &caps, &config).unwrap();
    assert_eq!(value_after(&webm, "-c:v"), Some("vp8"));
    assert_eq!(value_after(&webm, "-c:a"), Some("vorbis"));
}

#[test]
fn test_exhausted_priority_omits_codec_flags() {
    let caps = EncoderCapabilities::new(Vec::<&str>::new(), Vec::<&str>::new());
    let args = build(&JobParams::convert(OutputFormat::Webm), &caps, &CoreConfig::default()).unwrap();
    assert!(!args.contains(&"-c:v".to_string()));
    assert!(!args.contains(&"-c:a".to_string()));
}

#[test]
fn test_configured_priority_wins() {
    let config = CoreConfigBuilder::new()
        .video_encoders(OutputFormat::Mkv, ["h264_nvenc", "libx264"])
        .build()
        .unwrap();
    let args = build(&JobParams::convert(OutputFormat::Mkv).with_fps(60.0), &full_caps(), &config).unwrap();
    assert_eq!(value_after(&args, "-c:v"), Some("h264_nvenc"));
    assert!(!args.contains(&"-movflags".to_string()));
}

#[test]
fn test_gif_uses_configured_defaults_and_fps_target() {
    let config = CoreConfigBuilder::new().gif_width(480).gif_fps(12.0).build().unwrap();
    let args = build(&JobParams::convert(OutputFormat::Gif), &full_caps(), &config).unwrap();
    assert_eq!(value_after(&args, "-vf"), Some("fps=12,scale=480:-1:flags=lanczos"));
    assert!(args.contains(&"-an".to_string()));

    let args = build(&JobParams::convert(OutputFormat::Gif).with_fps(15.5), &full_caps(), &config).unwrap();
    assert_eq!(value_after(&args, "-vf"), Some("fps=15.5,scale=480:-1:flags=lanczos"));
}

#[test]
fn test_faststart_only_for_mp4_and_mov() {
    let config = CoreConfig::default();
    for format in OutputFormat::ALL {
        let args = build(&JobParams::convert(format), &full_caps(), &config).unwrap();
        let has_faststart = value_after(&args, "-movflags") == Some("+faststart");
        assert_eq!(has_faststart, matches!(format, OutputFormat::Mp4 | OutputFormat::Mov), "{format}");
    }
}

#[test]
fn test_trim_resolved_against_media_duration() {
    let media = MediaInfo {
        duration: Some(30.0),
        video_codec: Some("h264".into()),
    };
    let params = JobParams::convert(OutputFormat::Mp4).with_trim(TrimRange::new(10.0, Some(29.995)));
    let args = build_command(
        &params,
        Path::new("/in/clip.mov"),
        Path::new("/out/clip.mp4"),
        &full_caps(),
        &CoreConfig::default(),
        Some(&media),
    )
    .unwrap();
    assert!(!args.contains(&"-t".to_string()), "end snapped to the media end");

    let past_end = JobParams::convert(OutputFormat::Mp4).with_trim(TrimRange::new(31.0, None));
    let result = build_command(
        &past_end,
        Path::new("/in/clip.mov"),
        Path::new("/out/clip.mp4"),
        &full_caps(),
        &CoreConfig::default(),
        Some(&media),
    );
    assert!(matches!(result, Err(CoreError::InvalidRange { .. })));
}
