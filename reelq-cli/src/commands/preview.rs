//! Implementation of the 'preview' subcommand.
//!
//! Extracts the frame at the requested position as a PNG file.

use crate::cli::PreviewArgs;
use crate::config::preview_config;
use crate::error::{CliErrorContext, CliResult};
use crate::terminal;

use reelq_core::{FfprobeProber, PreviewExtractor, Session, SidecarSpawner, format_clock};

use std::fs;
use std::path::Path;
use std::sync::Arc;

pub fn run_preview(ffmpeg: &Path, args: PreviewArgs) -> CliResult<()> {
    if !args.input.is_file() {
        return Err(crate::cli_error!(
            "Invalid input path '{}': not a file",
            args.input.display()
        ));
    }

    let spawner = Arc::new(SidecarSpawner);
    let session = Session::open(preview_config(ffmpeg, &args)?, spawner.as_ref())?;
    let extractor = PreviewExtractor::new(session, spawner, Arc::new(FfprobeProber));

    let frame = extractor.frame_at(&args.input, args.at)?;
    fs::write(&args.output, frame.as_slice())
        .cli_with_context(|| format!("Failed to write '{}'", args.output.display()))?;

    terminal::print_success(&format!(
        "Frame at {} written to {}",
        format_clock(Some(args.at)),
        args.output.display()
    ));
    Ok(())
}
