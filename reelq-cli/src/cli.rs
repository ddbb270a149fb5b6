// reelq-cli/src/cli.rs
//
// Defines the command-line argument structures using clap.

use clap::{Parser, Subcommand};
use reelq_core::config::DEFAULT_FFMPEG_PROGRAM;
use reelq_core::{OutputFormat, SortOrder};
use std::path::PathBuf;

// --- CLI Argument Definition ---

#[derive(Parser, Debug)]
#[command(
    author,
    version, // Reads from Cargo.toml via "cargo" feature in clap
    about = "reelq: batch front end for ffmpeg",
    long_about = "Queues format conversions, frame-rate changes, trims and gif exports, \
                  runs them one at a time through ffmpeg, and extracts preview frames."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable detailed logging output (including ffmpeg diagnostics)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Optional: Directory for run log files
    #[arg(long, global = true, value_name = "LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// ffmpeg program name or path.
    /// Can also be set via the REELQ_FFMPEG environment variable.
    #[arg(
        long,
        global = true,
        value_name = "PATH",
        env = "REELQ_FFMPEG",
        default_value = DEFAULT_FFMPEG_PROGRAM
    )]
    pub ffmpeg: PathBuf,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Converts one or more video files (or directories of them)
    Convert(ConvertArgs),
    /// Lists the encoders and decoders of the installed ffmpeg
    Encoders(EncodersArgs),
    /// Extracts a single preview frame as PNG
    Preview(PreviewArgs),
}

#[derive(Parser, Debug)]
pub struct ConvertArgs {
    /// Input files or directories (directories are scanned one level deep)
    #[arg(required = true, num_args = 1.., value_name = "INPUT")]
    pub inputs: Vec<PathBuf>,

    /// Directory where converted files will be saved
    #[arg(short = 'o', long = "output-dir", value_name = "OUTPUT_DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Output name (without extension) used when converting a single file
    #[arg(short, long, value_name = "NAME")]
    pub name: Option<String>,

    /// Use --name for every output instead of each source's file name
    #[arg(long, default_value_t = false)]
    pub no_keep_names: bool,

    /// Output container: mp4, mkv, mov, webm or gif
    #[arg(short, long, value_name = "FORMAT", default_value = "mp4", value_parser = parse_format)]
    pub format: OutputFormat,

    /// Optional: Target frame rate (forces a re-encode)
    #[arg(long, value_name = "FPS")]
    pub fps: Option<f64>,

    /// Optional: Trim start (HH:MM:SS, MM:SS or seconds)
    #[arg(long, value_name = "TIME", value_parser = parse_time_arg)]
    pub trim_start: Option<f64>,

    /// Optional: Trim end (HH:MM:SS, MM:SS or seconds)
    #[arg(long, value_name = "TIME", value_parser = parse_time_arg)]
    pub trim_end: Option<f64>,

    /// Optional: Queue order (name-asc, name-desc, date-newest, date-oldest,
    /// size-largest, size-smallest)
    #[arg(long, value_name = "ORDER", value_parser = parse_sort)]
    pub sort: Option<SortOrder>,

    /// Optional: Frame rate for gif output without --fps
    #[arg(long, value_name = "FPS")]
    pub gif_fps: Option<f64>,

    /// Optional: Width of gif output in pixels
    #[arg(long, value_name = "PIXELS")]
    pub gif_width: Option<u32>,

    /// Print the planned ffmpeg commands without running them
    #[arg(long)]
    pub dry_run: bool,

    /// Emit queue events as JSON lines on stdout
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct EncodersArgs {
    /// Print the capability sets as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
pub struct PreviewArgs {
    /// Source video file
    #[arg(required = true, value_name = "INPUT")]
    pub input: PathBuf,

    /// Position of the frame (HH:MM:SS, MM:SS or seconds)
    #[arg(long, value_name = "TIME", default_value = "0", value_parser = parse_time_arg)]
    pub at: f64,

    /// PNG file to write
    #[arg(short, long, value_name = "FILE", default_value = "preview.png")]
    pub output: PathBuf,

    /// Optional: Thumbnail width in pixels
    #[arg(long, value_name = "PIXELS")]
    pub width: Option<u32>,
}

fn parse_format(value: &str) -> Result<OutputFormat, String> {
    value.parse().map_err(|e: reelq_core::CoreError| e.to_string())
}

fn parse_sort(value: &str) -> Result<SortOrder, String> {
    value.parse().map_err(|e: reelq_core::CoreError| e.to_string())
}

fn parse_time_arg(value: &str) -> Result<f64, String> {
    reelq_core::parse_time_input(value)
        .ok_or_else(|| format!("'{value}' is not a time (use HH:MM:SS, MM:SS or seconds)"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_convert_basic_args() {
        let cli = Cli::parse_from(["reelq", "convert", "clips", "-o", "out"]);
        assert!(!cli.verbose);
        assert_eq!(cli.ffmpeg, PathBuf::from(DEFAULT_FFMPEG_PROGRAM));

        match cli.command {
            Commands::Convert(args) => {
                assert_eq!(args.inputs, vec![PathBuf::from("clips")]);
                assert_eq!(args.output_dir, PathBuf::from("out"));
                assert_eq!(args.format, OutputFormat::Mp4);
                assert!(args.name.is_none());
                assert!(!args.no_keep_names);
                assert!(args.fps.is_none());
                assert!(args.sort.is_none());
                assert!(!args.dry_run);
            }
            other => panic!("Expected convert command, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_convert_with_trim_and_sort() {
        let cli = Cli::parse_from([
            "reelq",
            "--verbose",
            "convert",
            "A.mp4",
            "B.mov",
            "--format",
            "gif",
            "--fps",
            "15",
            "--trim-start",
            "0:05",
            "--trim-end",
            "00:00:12.5",
            "--sort",
            "size-largest",
        ]);
        assert!(cli.verbose);

        match cli.command {
            Commands::Convert(args) => {
                assert_eq!(args.inputs.len(), 2);
                assert_eq!(args.format, OutputFormat::Gif);
                assert_eq!(args.fps, Some(15.0));
                assert_eq!(args.trim_start, Some(5.0));
                assert_eq!(args.trim_end, Some(12.5));
                assert_eq!(args.sort, Some(SortOrder::SizeLargest));
            }
            other => panic!("Expected convert command, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_unknown_format_and_time() {
        assert!(Cli::try_parse_from(["reelq", "convert", "a.mp4", "--format", "avi"]).is_err());
        assert!(Cli::try_parse_from(["reelq", "convert", "a.mp4", "--trim-start", "soon"]).is_err());
        assert!(Cli::try_parse_from(["reelq", "convert"]).is_err());
    }

    #[test]
    fn test_parse_preview() {
        let cli = Cli::parse_from(["reelq", "preview", "a.mp4", "--at", "1:30", "-o", "f.png"]);
        match cli.command {
            Commands::Preview(args) => {
                assert_eq!(args.at, 90.0);
                assert_eq!(args.output, PathBuf::from("f.png"));
                assert!(args.width.is_none());
            }
            other => panic!("Expected preview command, got {other:?}"),
        }
    }
}
