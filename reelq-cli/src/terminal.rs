//! Terminal UI components and styling for reelq.
//!
//! Output is hierarchical: sections, processing steps, and aligned key-value
//! status lines. Everything is emitted through the `log` macros so the run log
//! file receives the same text as the console. Per-job progress bars draw on
//! stderr and are hidden when stderr is not a terminal.

use console::Term;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::info;
use owo_colors::OwoColorize;
use std::io::IsTerminal;
use std::time::Duration;
use unicode_width::UnicodeWidthStr;

/// Width of the label column in status lines.
const LABEL_WIDTH: usize = 15;

/// Represents the visual hierarchy levels in the CLI output
#[derive(Debug, Clone, Copy)]
pub enum OutputLevel {
    /// Level 1: Main sections (===== SECTION =====)
    Section,
    /// Level 2: Processing steps (» Converting clip.mp4)
    Subsection,
    /// Level 3: Key-value status information
    Status,
}

impl OutputLevel {
    fn indent(self) -> &'static str {
        match self {
            OutputLevel::Section => "",
            OutputLevel::Subsection => "  ",
            OutputLevel::Status => "    ",
        }
    }
}

/// Whether to colour output (respects NO_COLOR and non-terminal stdout).
pub fn should_use_color() -> bool {
    std::env::var_os("NO_COLOR").is_none()
        && supports_color::on(supports_color::Stream::Stdout).is_some()
}

/// Print a section header for major phases
pub fn print_section(title: &str) {
    info!("");
    if should_use_color() {
        info!("===== {} =====", title.to_uppercase().cyan());
    } else {
        info!("===== {} =====", title.to_uppercase());
    }
    info!("");
}

/// Print a processing step
pub fn print_processing(message: &str) {
    let indent = OutputLevel::Subsection.indent();
    if should_use_color() {
        info!("{indent}» {}", message.bold());
    } else {
        info!("{indent}» {message}");
    }
}

/// Print a status line (key-value pair)
pub fn print_status(label: &str, value: &str, highlight: bool) {
    let padding = LABEL_WIDTH.saturating_sub(label.width()).max(1);
    let indent = OutputLevel::Status.indent();
    let spaces = " ".repeat(padding);

    if should_use_color() && highlight {
        info!("{indent}{label}:{spaces} {}", value.bold());
    } else {
        info!("{indent}{label}:{spaces} {value}");
    }
}

/// Print a success message
pub fn print_success(message: &str) {
    let indent = OutputLevel::Subsection.indent();
    if should_use_color() {
        info!("{indent}✓ {}", message.green());
    } else {
        info!("{indent}✓ {message}");
    }
}

/// Print a per-item failure without aborting
pub fn print_failure(message: &str) {
    let indent = OutputLevel::Subsection.indent();
    if should_use_color() {
        info!("{indent}✗ {}", message.red());
    } else {
        info!("{indent}✗ {message}");
    }
}

/// Print a warning message
pub fn print_warning(message: &str) {
    let indent = OutputLevel::Subsection.indent();
    if should_use_color() {
        info!("{indent}⚠ {}", message.yellow());
    } else {
        info!("{indent}⚠ {message}");
    }
}

/// Print a fatal error to stderr. Used before and after logging is set up.
pub fn print_fatal(message: &str) {
    if std::env::var_os("NO_COLOR").is_none()
        && supports_color::on(supports_color::Stream::Stderr).is_some()
    {
        eprintln!("{} {message}", "Error:".red().bold());
    } else {
        eprintln!("Error: {message}");
    }
}

/// Progress bar for one job, scaled to thousandths of the job.
pub fn job_progress_bar(label: &str) -> ProgressBar {
    let pb = ProgressBar::new(1000);

    let term_width = Term::stderr().size().1 as usize;
    let template = if term_width >= 100 {
        "    ⧖ {msg:30!} {percent:>3}% [{bar:30}] ({elapsed_precise} / {eta_precise})"
    } else if term_width >= 60 {
        "    ⧖ {msg:20!} {percent:>3}% [{bar:20}]"
    } else {
        "    ⧖ {percent:>3}% [{bar:10}]"
    };
    let style = ProgressStyle::default_bar()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##.");

    pb.set_style(style);
    pb.set_message(label.to_string());

    if !std::io::stderr().is_terminal() {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    }

    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Fraction in [0, 1] as a bar position.
pub fn bar_position(fraction: f64) -> u64 {
    (fraction.clamp(0.0, 1.0) * 1000.0).round() as u64
}
