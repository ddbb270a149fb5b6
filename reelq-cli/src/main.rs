// reelq-cli/src/main.rs
//
// Entry point for the `reelq` binary: parses arguments, installs logging,
// dispatches to the selected command and maps failures to exit code 1.

use clap::Parser;
use reelq_cli::cli::{Cli, Commands};
use reelq_cli::logging::init_logging;
use reelq_cli::{run_convert, run_encoders, run_preview, terminal};
use std::process;

fn main() {
    let cli = Cli::parse();

    // Machine-readable output owns stdout; logs move to stderr.
    let json_output = match &cli.command {
        Commands::Convert(args) => args.json,
        Commands::Encoders(args) => args.json,
        Commands::Preview(_) => false,
    };

    match init_logging(cli.verbose, cli.log_dir.as_deref(), json_output) {
        Ok(Some(log_path)) => log::debug!("Run log: {}", log_path.display()),
        Ok(None) => {}
        Err(e) => {
            terminal::print_fatal(&e.to_string());
            process::exit(1);
        }
    }
    log::debug!("Run started: {}", chrono::Local::now());

    let result = match cli.command {
        Commands::Convert(args) => run_convert(&cli.ffmpeg, args),
        Commands::Encoders(args) => run_encoders(&cli.ffmpeg, args, cli.verbose),
        Commands::Preview(args) => run_preview(&cli.ffmpeg, args),
    };

    if let Err(e) = result {
        log::debug!("Run failed: {e}");
        terminal::print_fatal(&e.to_string());
        process::exit(1);
    }
    log::debug!("Run finished: {}", chrono::Local::now());
}
