// ============================================================================
// reelq-cli/src/logging.rs
// ============================================================================
//
// LOGGING SETUP: fern dispatch for the console and the run log file
//
// All terminal output goes through the `log` macros. The console chain shows
// the CLI's own messages at Info (Debug with --verbose); core library records
// only surface as warnings unless --verbose is given, and raw ffmpeg lines
// (target `ffmpeg_log`) only with --verbose. The optional run log file keeps
// everything at Debug, timestamped and without colour codes.

use crate::error::{CliErrorContext, CliResult};
use crate::terminal::should_use_color;

use log::{Level, LevelFilter};
use owo_colors::OwoColorize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Returns the current local timestamp formatted as "YYYYMMDD_HHMMSS".
pub fn get_timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Path of a new run log inside `log_dir`.
pub fn run_log_path(log_dir: &Path) -> PathBuf {
    log_dir.join(format!("reelq_run_{}.log", get_timestamp()))
}

/// Installs the global logger.
///
/// With `console_to_stderr` the console chain writes to stderr so stdout stays
/// free for machine-readable output. Returns the run log path, if any.
pub fn init_logging(
    verbose: bool,
    log_dir: Option<&Path>,
    console_to_stderr: bool,
) -> CliResult<Option<PathBuf>> {
    let console_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let core_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    let ffmpeg_level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Off
    };

    let console_target: fern::Output = if console_to_stderr {
        io::stderr().into()
    } else {
        io::stdout().into()
    };
    let color = should_use_color();
    let console = fern::Dispatch::new()
        .level(console_level)
        .level_for("reelq_core", core_level)
        .level_for("ffmpeg_log", ffmpeg_level)
        .format(move |out, message, record| match record.level() {
            Level::Info => out.finish(format_args!("{message}")),
            level if color => {
                let label = match level {
                    Level::Error => format!("{}", "ERROR".red().bold()),
                    Level::Warn => format!("{}", "WARN ".yellow()),
                    Level::Debug => format!("{}", "DEBUG".blue()),
                    _ => format!("{}", "TRACE".magenta()),
                };
                out.finish(format_args!("{label} {message}"))
            }
            level => out.finish(format_args!("{level:<5} {message}")),
        })
        .chain(console_target);

    let mut dispatch = fern::Dispatch::new().level(LevelFilter::Debug).chain(console);

    let log_path = match log_dir {
        Some(dir) => {
            fs::create_dir_all(dir).cli_with_context(|| {
                format!("Failed to create log directory '{}'", dir.display())
            })?;
            let path = run_log_path(dir);
            let file = fern::log_file(&path)
                .cli_with_context(|| format!("Failed to create log file '{}'", path.display()))?;
            let file_chain = fern::Dispatch::new()
                .level(LevelFilter::Debug)
                .format(|out, message, record| {
                    let plain = strip_ansi_escapes::strip_str(message.to_string());
                    out.finish(format_args!(
                        "{} {:<5} [{}] {}",
                        chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                        record.level(),
                        record.target(),
                        plain
                    ))
                })
                .chain(file);
            dispatch = dispatch.chain(file_chain);
            Some(path)
        }
        None => None,
    };

    dispatch
        .apply()
        .map_err(|e| crate::cli_error!("Failed to initialize logging: {e}"))?;
    Ok(log_path)
}
