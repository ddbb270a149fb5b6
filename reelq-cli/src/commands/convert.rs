//! Implementation of the 'convert' subcommand.
//!
//! Discovers input files, plans output paths, fills a batch queue and either
//! prints the planned ffmpeg commands (`--dry-run`) or runs the batch while an
//! observer reports progress.

use crate::cli::ConvertArgs;
use crate::config::{convert_config, job_params};
use crate::error::{CliErrorContext, CliResult};
use crate::progress::{JsonEventWriter, TerminalObserver, job_label};
use crate::terminal;

use reelq_core::{
    BatchQueue, BatchSummary, CoreError, FfprobeProber, Job, MediaProber, QueueObserver, Session,
    SidecarSpawner, build_command, find_processable_files, format_duration, is_video_file,
    plan_output_path,
};

use log::{debug, info, warn};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Expands the positional inputs into a list of video files.
///
/// Directories contribute their top-level video files; files must have a
/// video extension. Duplicates are dropped with a warning.
pub fn discover_inputs(inputs: &[PathBuf]) -> CliResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut seen = HashSet::new();

    for input in inputs {
        let path = input.canonicalize().map_err(|e| {
            CoreError::PathError(format!("Invalid input path '{}': {e}", input.display()))
        })?;

        let found = if path.is_dir() {
            match find_processable_files(&path) {
                Ok(found) => found,
                Err(CoreError::NoFilesFound) => {
                    warn!("No video files in {}", path.display());
                    Vec::new()
                }
                Err(e) => return Err(e),
            }
        } else if is_video_file(&path) {
            vec![path]
        } else {
            return Err(crate::cli_error!(
                "Input file '{}' is not a supported video file",
                input.display()
            ));
        };

        for file in found {
            if seen.insert(file.clone()) {
                files.push(file);
            } else {
                warn!("Skipping duplicate input {}", file.display());
            }
        }
    }

    if files.is_empty() {
        return Err(CoreError::NoFilesFound);
    }
    Ok(files)
}

/// Runs the convert command and reports results.
pub fn run_convert(ffmpeg: &Path, args: ConvertArgs) -> CliResult<()> {
    let total_start_time = Instant::now();

    let params = job_params(&args)?;
    let files = discover_inputs(&args.inputs)?;
    fs::create_dir_all(&args.output_dir).cli_with_context(|| {
        format!("Failed to create output directory '{}'", args.output_dir.display())
    })?;

    let config = convert_config(ffmpeg, &args)?;
    let spawner = Arc::new(SidecarSpawner);
    let session = Session::open(config, spawner.as_ref())?;
    let prober: Arc<dyn MediaProber> = Arc::new(FfprobeProber);
    let queue = BatchQueue::new(Arc::clone(&session), spawner, Arc::clone(&prober));

    if !args.dry_run {
        queue.subscribe(make_observer(args.json, files.len()));
    }
    for file in &files {
        let target = plan_output_path(session.config(), file, params.format, files.len())?;
        queue.add(file.clone(), target, params.clone())?;
    }
    if let Some(order) = args.sort {
        queue.sort(order)?;
        debug!("Queue sorted by {order}");
    }

    if !args.json {
        terminal::print_section("Batch");
        terminal::print_status("Files", &files.len().to_string(), true);
        terminal::print_status("Format", params.format.extension(), false);
        terminal::print_status("Output", &args.output_dir.display().to_string(), false);
        if let Some(fps) = params.fps {
            terminal::print_status("Frame rate", &format!("{fps}"), false);
        }
        if let Some(trim) = params.trim {
            let end = trim.end.map_or_else(|| "end".to_string(), format_duration);
            terminal::print_status("Trim", &format!("{} - {end}", format_duration(trim.start)), false);
        }
    }

    if args.dry_run {
        return print_plan(&session, prober.as_ref(), &queue.snapshot(), args.json);
    }

    if !args.json {
        terminal::print_section("Converting");
    }
    queue.start()?;
    queue.wait_idle();

    let summary = queue.summary();
    if !args.json {
        print_summary(&summary, total_start_time);
    }
    info!("");

    if summary.failed > 0 {
        return Err(crate::cli_error!(
            "{} of {} job(s) failed",
            summary.failed,
            files.len()
        ));
    }
    Ok(())
}

fn make_observer(json: bool, total: usize) -> Arc<dyn QueueObserver> {
    if json {
        Arc::new(JsonEventWriter::new(log::log_enabled!(
            target: "ffmpeg_log",
            log::Level::Debug
        )))
    } else {
        Arc::new(TerminalObserver::new(total))
    }
}

/// Prints the command each job would run, without running anything.
fn print_plan(
    session: &Session,
    prober: &dyn MediaProber,
    jobs: &[Job],
    json: bool,
) -> CliResult<()> {
    if !json {
        terminal::print_section("Plan");
    }

    for job in jobs {
        let media = if job.params.needs_decode() {
            prober
                .probe(&job.source)
                .inspect_err(|e| debug!("{e}"))
                .ok()
        } else {
            None
        };
        let planned = build_command(
            &job.params,
            &job.source,
            &job.target,
            session.capabilities(),
            session.config(),
            media.as_ref(),
        )
        .map(|args| session.invocation(args));

        if json {
            let value = match &planned {
                Ok(invocation) => serde_json::json!({
                    "source": job.source,
                    "target": job.target,
                    "program": invocation.program,
                    "args": invocation.args,
                }),
                Err(e) => serde_json::json!({
                    "source": job.source,
                    "target": job.target,
                    "error": e.to_string(),
                }),
            };
            println!("{value}");
        } else {
            match planned {
                Ok(invocation) => {
                    terminal::print_processing(&job_label(job));
                    info!("    {invocation}");
                }
                Err(e) => terminal::print_failure(&format!("{}: {e}", job_label(job))),
            }
        }
    }
    Ok(())
}

fn print_summary(summary: &BatchSummary, started: Instant) {
    terminal::print_section("Summary");
    terminal::print_status("Succeeded", &summary.succeeded.to_string(), summary.succeeded > 0);
    terminal::print_status("Failed", &summary.failed.to_string(), summary.failed > 0);
    if summary.cancelled > 0 {
        terminal::print_status("Cancelled", &summary.cancelled.to_string(), false);
    }
    if summary.pending > 0 {
        terminal::print_status("Not started", &summary.pending.to_string(), false);
    }
    terminal::print_status(
        "Total time",
        &format_duration(started.elapsed().as_secs_f64()),
        true,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    #[test]
    fn test_discover_mixes_files_and_directories() {
        let dir = tempdir().unwrap();
        let clips = dir.path().join("clips");
        fs::create_dir(&clips).unwrap();
        File::create(clips.join("b.mov")).unwrap();
        File::create(clips.join("a.mp4")).unwrap();
        File::create(clips.join("notes.txt")).unwrap();
        let single = dir.path().join("c.webm");
        File::create(&single).unwrap();

        let files = discover_inputs(&[clips.clone(), single.clone(), clips.join("a.mp4")]).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.mp4", "b.mov", "c.webm"]);
    }

    #[test]
    fn test_discover_rejects_non_video_file() {
        let dir = tempdir().unwrap();
        let text = dir.path().join("notes.txt");
        File::create(&text).unwrap();
        let err = discover_inputs(&[text]).unwrap_err();
        assert!(err.to_string().contains("not a supported video file"));
    }

    #[test]
    fn test_discover_missing_and_empty() {
        let err = discover_inputs(&[PathBuf::from("surely/missing/clip.mp4")]).unwrap_err();
        assert!(err.to_string().contains("Invalid input path"));

        let dir = tempdir().unwrap();
        assert!(matches!(
            discover_inputs(&[dir.path().to_path_buf()]),
            Err(CoreError::NoFilesFound)
        ));
    }
}
