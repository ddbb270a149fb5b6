// reelq-cli/src/config.rs
//
// Maps parsed arguments onto reelq-core's CoreConfig and JobParams.

use crate::cli::{ConvertArgs, PreviewArgs};
use crate::error::CliResult;

use reelq_core::config::CoreConfigBuilder;
use reelq_core::{CoreConfig, JobParams, TrimRange};
use std::path::Path;

/// Configuration for `reelq convert`.
pub fn convert_config(ffmpeg: &Path, args: &ConvertArgs) -> CliResult<CoreConfig> {
    let mut builder = CoreConfigBuilder::new()
        .ffmpeg_program(ffmpeg)
        .output_dir(args.output_dir.clone())
        .keep_names(!args.no_keep_names);

    if let Some(name) = &args.name {
        builder = builder.output_name(name);
    }
    if let Some(fps) = args.gif_fps {
        builder = builder.gif_fps(fps);
    }
    if let Some(width) = args.gif_width {
        builder = builder.gif_width(width);
    }
    builder.build()
}

/// Configuration for `reelq preview`.
pub fn preview_config(ffmpeg: &Path, args: &PreviewArgs) -> CliResult<CoreConfig> {
    let mut builder = CoreConfigBuilder::new().ffmpeg_program(ffmpeg);
    if let Some(width) = args.width {
        builder = builder.preview_width(width);
    }
    builder.build()
}

/// Configuration for commands that only need the tool.
pub fn tool_config(ffmpeg: &Path) -> CliResult<CoreConfig> {
    CoreConfigBuilder::new().ffmpeg_program(ffmpeg).build()
}

/// Job parameters shared by every file of a convert run.
///
/// A trim end without a start trims from the beginning. The range is checked
/// here so a bad range is reported once instead of failing every job.
pub fn job_params(args: &ConvertArgs) -> CliResult<JobParams> {
    let mut params = JobParams::convert(args.format);
    if let Some(fps) = args.fps {
        params = params.with_fps(fps);
    }
    if args.trim_start.is_some() || args.trim_end.is_some() {
        let trim = TrimRange::new(args.trim_start.unwrap_or(0.0), args.trim_end);
        trim.validate()?;
        params = params.with_trim(trim);
    }
    Ok(params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use reelq_core::{CoreError, OutputFormat};

    fn convert_args(extra: &[&str]) -> ConvertArgs {
        let mut argv = vec!["reelq", "convert", "a.mp4"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Commands::Convert(args) => args,
            other => panic!("Expected convert command, got {other:?}"),
        }
    }

    #[test]
    fn test_convert_config_maps_naming_and_gif() {
        let args = convert_args(&["-o", "/out", "--name", "clip", "--no-keep-names", "--gif-width", "320"]);
        let config = convert_config(Path::new("/opt/ffmpeg"), &args).unwrap();
        assert_eq!(config.ffmpeg_program, Path::new("/opt/ffmpeg"));
        assert_eq!(config.output_dir, Path::new("/out"));
        assert_eq!(config.output_name, "clip");
        assert!(!config.keep_names);
        assert_eq!(config.gif_width, 320);
    }

    #[test]
    fn test_invalid_gif_fps_rejected() {
        let args = convert_args(&["--gif-fps", "0"]);
        assert!(matches!(
            convert_config(Path::new("ffmpeg"), &args),
            Err(CoreError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_job_params() {
        let params = job_params(&convert_args(&["--format", "webm", "--fps", "24"])).unwrap();
        assert_eq!(params.format, OutputFormat::Webm);
        assert_eq!(params.fps, Some(24.0));
        assert!(params.trim.is_none());

        let params = job_params(&convert_args(&["--trim-end", "10"])).unwrap();
        assert_eq!(params.trim, Some(TrimRange::new(0.0, Some(10.0))));

        let inverted = job_params(&convert_args(&["--trim-start", "10", "--trim-end", "4"]));
        assert!(matches!(inverted, Err(CoreError::InvalidRange { .. })));
    }
}
