// ============================================================================
// reelq-cli/src/progress.rs
// ============================================================================
//
// PROGRESS REPORTING: Queue observers for the terminal and for JSON output
//
// Both observers receive QueueEvents on the dispatcher thread and must return
// quickly; neither calls back into the queue.
//
// KEY COMPONENTS:
// - TerminalObserver: one indicatif bar per running job plus result lines
// - JsonEventWriter: one JSON object per event on stdout

// ---- External crate imports ----
use indicatif::ProgressBar;
use reelq_core::{Job, JobId, JobStatus, QueueEvent, QueueObserver, format_bytes};

// ---- Standard library imports ----
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;

// ---- Internal crate imports ----
use crate::terminal;

/// Size of a written output file, when it can be read.
pub fn output_size(path: &Path) -> Option<String> {
    fs::metadata(path).ok().map(|meta| format_bytes(meta.len()))
}

/// Display name of a job's source.
pub fn job_label(job: &Job) -> String {
    job.source
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| job.source.display().to_string())
}

// ============================================================================
// TERMINAL OBSERVER
// ============================================================================

struct ActiveBar {
    id: JobId,
    bar: ProgressBar,
}

/// Draws progress for the running job and reports each finished job.
pub struct TerminalObserver {
    total: usize,
    active: Mutex<Option<ActiveBar>>,
    started: Mutex<usize>,
}

impl TerminalObserver {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            active: Mutex::new(None),
            started: Mutex::new(0),
        }
    }

    fn job_started(&self, job: &Job) {
        let position = {
            let mut started = self.started.lock().unwrap_or_else(|p| p.into_inner());
            *started += 1;
            *started
        };
        let label = job_label(job);
        terminal::print_processing(&format!("[{position}/{}] {label}", self.total));

        let bar = terminal::job_progress_bar(&label);
        let mut active = self.active.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(previous) = active.replace(ActiveBar { id: job.id, bar }) {
            previous.bar.finish_and_clear();
        }
    }

    fn job_progress(&self, id: JobId, fraction: f64) {
        let active = self.active.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(current) = active.as_ref().filter(|a| a.id == id) {
            current.bar.set_position(terminal::bar_position(fraction));
        }
    }

    fn job_finished(&self, job: &Job) {
        {
            let mut active = self.active.lock().unwrap_or_else(|p| p.into_inner());
            if active.as_ref().is_some_and(|a| a.id == job.id) {
                if let Some(done) = active.take() {
                    done.bar.finish_and_clear();
                }
            }
        }

        match job.status {
            JobStatus::Succeeded => {
                let mut message = format!("{} -> {}", job_label(job), job.target.display());
                if let Some(size) = output_size(&job.target) {
                    message.push_str(&format!(" ({size})"));
                }
                terminal::print_success(&message);
            }
            JobStatus::Failed => {
                let reason = job.error.as_deref().unwrap_or("unknown error");
                terminal::print_failure(&format!("{}: {reason}", job_label(job)));
            }
            JobStatus::Cancelled => {
                terminal::print_warning(&format!("{} cancelled", job_label(job)));
            }
            JobStatus::Pending | JobStatus::Running => {}
        }
    }
}

impl QueueObserver for TerminalObserver {
    fn on_event(&self, event: &QueueEvent) {
        match event {
            QueueEvent::JobUpdated { job } if job.status == JobStatus::Running => {
                self.job_started(job);
            }
            QueueEvent::JobUpdated { job } if job.status.is_terminal() => {
                self.job_finished(job);
            }
            QueueEvent::JobProgress { id, fraction } => self.job_progress(*id, *fraction),
            _ => {}
        }
    }
}

// ============================================================================
// JSON EVENT WRITER
// ============================================================================

/// Writes every event as a single JSON line on stdout.
///
/// Raw ffmpeg lines (`job_output`) are only written when `include_output` is set.
pub struct JsonEventWriter {
    include_output: bool,
}

impl JsonEventWriter {
    pub fn new(include_output: bool) -> Self {
        Self { include_output }
    }
}

/// Serializes one event, or `None` when it is filtered out.
pub fn event_line(event: &QueueEvent, include_output: bool) -> Option<String> {
    if !include_output && matches!(event, QueueEvent::JobOutput { .. }) {
        return None;
    }
    match serde_json::to_string(event) {
        Ok(line) => Some(line),
        Err(e) => {
            log::warn!("Could not serialize queue event: {e}");
            None
        }
    }
}

impl QueueObserver for JsonEventWriter {
    fn on_event(&self, event: &QueueEvent) {
        let Some(line) = event_line(event, self.include_output) else {
            return;
        };
        let mut handle = io::stdout().lock();
        if writeln!(handle, "{line}").and_then(|()| handle.flush()).is_err() {
            log::debug!("stdout closed; dropping queue event");
        }
    }
}
