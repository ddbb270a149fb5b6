// ============================================================================
// reelq-core/src/runner.rs
// ============================================================================
//
// JOB RUNNER: One ffmpeg Process per Job
//
// Starts the external process, returns immediately and reads the diagnostic
// stream on a dedicated thread. Parsed progress, raw lines and the final
// outcome travel to the owner over a bounded channel, in order.
//
// KEY COMPONENTS:
// - JobRunner: spawns processes and their reader threads
// - RunningJob: handle to a started job (join, cancel)
// - CancelHandle: cloneable graceful-stop-then-kill control
// - JobEvent / JobOutcome: what the reader thread reports
//
// The owner must keep draining the channel until `Finished` arrives; the
// reader blocks while the channel is full.

// ---- Standard library imports ----
use std::collections::VecDeque;
use std::io::{BufReader, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::SyncSender;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

// ---- Internal crate imports ----
use crate::config::CoreConfig;
use crate::error::{CoreError, CoreResult, command_failed_error};
use crate::external::{ExitState, ProcessSpawner, ToolInvocation, ToolProcess};
use crate::job::JobId;
use crate::progress::{DiagnosticLines, ProgressParser};

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

type SharedProcess = Arc<Mutex<dyn ToolProcess>>;

// ============================================================================
// EVENTS
// ============================================================================

/// Final result of one process run.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Succeeded,
    /// Carries the display string of the error.
    Failed(String),
    /// `forced` is set when the process ignored the stop request and was killed.
    Cancelled { forced: bool },
}

/// Messages from a reader thread to the job's owner.
#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    Progress { id: JobId, fraction: f64 },
    Line { id: JobId, line: String },
    Finished { id: JobId, outcome: JobOutcome },
}

// ============================================================================
// RUNNER
// ============================================================================

pub struct JobRunner<S: ProcessSpawner> {
    spawner: Arc<S>,
    cancel_timeout: Duration,
    tail_lines: usize,
}

impl<S: ProcessSpawner> JobRunner<S> {
    pub fn new(spawner: Arc<S>, config: &CoreConfig) -> Self {
        Self {
            spawner,
            cancel_timeout: config.cancel_timeout,
            tail_lines: config.error_tail_lines,
        }
    }

    /// Launches the invocation and starts streaming its diagnostics.
    ///
    /// `expected_duration` overrides the duration ffmpeg prints, for outputs
    /// shorter than the input.
    ///
    /// # Errors
    ///
    /// * `CoreError::ToolNotFound` - the program vanished since the session opened
    /// * `CoreError::ProcessLaunchFailed` - the process could not be started
    pub fn start(
        &self,
        id: JobId,
        invocation: &ToolInvocation,
        expected_duration: Option<f64>,
        events: SyncSender<JobEvent>,
    ) -> CoreResult<RunningJob> {
        log::debug!("Job {id}: {invocation}");
        let mut process = self.spawner.spawn(invocation)?;
        let output = process.take_diagnostics();
        let process: SharedProcess = Arc::new(Mutex::new(process));

        let handle = CancelHandle {
            id,
            process: Arc::clone(&process),
            cancel_requested: Arc::new(AtomicBool::new(false)),
            forced: Arc::new(AtomicBool::new(false)),
            timeout: self.cancel_timeout,
        };

        let context = ReaderContext {
            id,
            output,
            process: Arc::clone(&process),
            cancel_requested: Arc::clone(&handle.cancel_requested),
            forced: Arc::clone(&handle.forced),
            parser: ProgressParser::with_expected_duration(expected_duration),
            tail_lines: self.tail_lines,
            events,
        };

        let reader = thread::Builder::new()
            .name(format!("reelq-job-{}", id.0))
            .spawn(move || read_diagnostics(context))
            .map_err(|e| {
                if let Err(kill_err) = lock_process(&process).kill() {
                    log::error!("Failed to kill job {id} after reader setup failed: {kill_err}");
                }
                CoreError::OperationFailed(format!("Could not start reader thread: {e}"))
            })?;

        Ok(RunningJob {
            handle,
            reader: Some(reader),
        })
    }
}

// ============================================================================
// RUNNING JOB AND CANCELLATION
// ============================================================================

/// A started job.
pub struct RunningJob {
    handle: CancelHandle,
    reader: Option<JoinHandle<()>>,
}

impl RunningJob {
    #[must_use]
    pub fn id(&self) -> JobId {
        self.handle.id
    }

    /// Cloneable control usable from other threads.
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        self.handle.clone()
    }

    /// See [`CancelHandle::cancel`].
    pub fn cancel(&self) -> CoreResult<()> {
        self.handle.cancel()
    }

    /// Whether the reader thread is done (the `Finished` event was sent).
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.reader.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Waits for the reader thread.
    pub fn join(mut self) {
        if let Some(reader) = self.reader.take() {
            if reader.join().is_err() {
                log::error!("Reader thread of job {} panicked", self.handle.id);
            }
        }
    }
}

/// Stops a running process: graceful request, bounded wait, then kill.
#[derive(Clone)]
pub struct CancelHandle {
    id: JobId,
    process: SharedProcess,
    cancel_requested: Arc<AtomicBool>,
    forced: Arc<AtomicBool>,
    timeout: Duration,
}

impl CancelHandle {
    #[must_use]
    pub fn job_id(&self) -> JobId {
        self.id
    }

    /// Cancels the job and returns once the process is gone.
    ///
    /// The job's outcome is `Cancelled` whatever the process exit code.
    ///
    /// # Errors
    ///
    /// * `CoreError::ProcessTimeoutOnCancel` - the process ignored the stop
    ///   request and was killed (it is still guaranteed to be gone)
    pub fn cancel(&self) -> CoreResult<()> {
        if self.cancel_requested.swap(true, Ordering::SeqCst) {
            // Someone else is already cancelling; just wait for the exit.
            wait_for_exit(&self.process, None)?;
            return Ok(());
        }

        log::info!("Cancelling job {}", self.id);
        if let Err(e) = lock_process(&self.process).request_stop() {
            log::debug!("Stop request for job {} failed: {e}", self.id);
        }

        if wait_for_exit(&self.process, Some(self.timeout))?.is_some() {
            return Ok(());
        }

        log::warn!(
            "Job {} did not stop within {:?}; killing the process",
            self.id,
            self.timeout
        );
        self.forced.store(true, Ordering::SeqCst);
        if let Err(e) = lock_process(&self.process).kill() {
            log::error!("Failed to kill job {}: {e}", self.id);
        }
        wait_for_exit(&self.process, None)?;
        Err(CoreError::ProcessTimeoutOnCancel(self.timeout))
    }
}

fn lock_process(process: &Mutex<dyn ToolProcess>) -> MutexGuard<'_, dyn ToolProcess> {
    process.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Polls until the process exits or the deadline passes (`Ok(None)`).
fn wait_for_exit(
    process: &Mutex<dyn ToolProcess>,
    deadline: Option<Duration>,
) -> CoreResult<Option<ExitState>> {
    let started = Instant::now();
    loop {
        let state = lock_process(process).try_wait()?;
        if state.is_some() {
            return Ok(state);
        }
        if deadline.is_some_and(|limit| started.elapsed() >= limit) {
            return Ok(None);
        }
        thread::sleep(EXIT_POLL_INTERVAL);
    }
}

// ============================================================================
// READER THREAD
// ============================================================================

struct ReaderContext {
    id: JobId,
    output: Option<Box<dyn Read + Send>>,
    process: SharedProcess,
    cancel_requested: Arc<AtomicBool>,
    forced: Arc<AtomicBool>,
    parser: ProgressParser,
    tail_lines: usize,
    events: SyncSender<JobEvent>,
}

fn read_diagnostics(mut ctx: ReaderContext) {
    let id = ctx.id;
    let mut tail: VecDeque<String> = VecDeque::with_capacity(ctx.tail_lines);

    if let Some(output) = ctx.output.take() {
        for line in DiagnosticLines::new(BufReader::new(output)) {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    log::warn!("Job {id}: diagnostic stream error: {e}");
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            log::debug!(target: "ffmpeg_log", "{line}");

            if let Some(fraction) = ctx.parser.feed(&line) {
                let _ = ctx.events.send(JobEvent::Progress { id, fraction });
            }
            if ctx.tail_lines > 0 {
                if tail.len() == ctx.tail_lines {
                    tail.pop_front();
                }
                tail.push_back(line.clone());
            }
            let _ = ctx.events.send(JobEvent::Line { id, line });
        }
    }

    let exit = wait_for_exit(&ctx.process, None);
    let outcome = if ctx.cancel_requested.load(Ordering::SeqCst) {
        JobOutcome::Cancelled {
            forced: ctx.forced.load(Ordering::SeqCst),
        }
    } else {
        match exit {
            Ok(Some(state)) if state.success() => {
                ctx.parser.finish(true);
                JobOutcome::Succeeded
            }
            Ok(Some(state)) => {
                let tail: Vec<String> = tail.into_iter().collect();
                JobOutcome::Failed(command_failed_error(state.code, tail.join("\n")).to_string())
            }
            Ok(None) => JobOutcome::Failed("process state unknown".to_string()),
            Err(e) => JobOutcome::Failed(e.to_string()),
        }
    };

    log::debug!("Job {id}: reader finished with {outcome:?}");
    let _ = ctx.events.send(JobEvent::Finished { id, outcome });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::mocks::{MockScript, MockSpawner};
    use std::sync::mpsc::{Receiver, sync_channel};

    fn runner(spawner: &Arc<MockSpawner>, timeout: Duration, tail: usize) -> JobRunner<MockSpawner> {
        let config = CoreConfig {
            cancel_timeout: timeout,
            error_tail_lines: tail,
            ..CoreConfig::default()
        };
        JobRunner::new(Arc::clone(spawner), &config)
    }

    fn invocation(source: &str) -> ToolInvocation {
        ToolInvocation::new("ffmpeg", vec!["-i".into(), source.into(), "out.mp4".into()])
    }

    fn drain(rx: &Receiver<JobEvent>) -> Vec<JobEvent> {
        let mut events = Vec::new();
        for event in rx.iter() {
            let done = matches!(event, JobEvent::Finished { .. });
            events.push(event);
            if done {
                break;
            }
        }
        events
    }

    fn outcome(events: &[JobEvent]) -> JobOutcome {
        match events.last() {
            Some(JobEvent::Finished { outcome, .. }) => outcome.clone(),
            other => panic!("expected Finished, got {other:?}"),
        }
    }

    #[test]
    fn test_successful_run_reports_progress_then_success() {
        let spawner = Arc::new(MockSpawner::new());
        spawner.add_expectation(
            "A.mp4",
            MockScript::success([
                "  Duration: 00:01:40.00, start: 0.000000, bitrate: 900 kb/s",
                "frame=  10 fps=0.0 time=00:00:25.00 bitrate=N/A\r",
                "frame=  20 fps=0.0 time=00:00:50.00 bitrate=N/A\r",
            ]),
        );
        let (tx, rx) = sync_channel(4);
        let job = runner(&spawner, Duration::from_secs(1), 20)
            .start(JobId(1), &invocation("A.mp4"), None, tx)
            .unwrap();

        let events = drain(&rx);
        job.join();

        let fractions: Vec<f64> = events
            .iter()
            .filter_map(|e| match e {
                JobEvent::Progress { fraction, .. } => Some(*fraction),
                _ => None,
            })
            .collect();
        assert_eq!(fractions, vec![0.25, 0.5]);
        assert_eq!(outcome(&events), JobOutcome::Succeeded);
    }

    #[test]
    fn test_failure_keeps_last_lines() {
        let spawner = Arc::new(MockSpawner::new());
        spawner.add_expectation(
            "bad.mov",
            MockScript::failure(1, ["line one", "line two", "Invalid data found when processing input"]),
        );
        let (tx, rx) = sync_channel(8);
        let job = runner(&spawner, Duration::from_secs(1), 2)
            .start(JobId(2), &invocation("bad.mov"), None, tx)
            .unwrap();
        let events = drain(&rx);
        job.join();

        match outcome(&events) {
            JobOutcome::Failed(message) => {
                assert!(message.contains("status 1"));
                assert!(message.contains("Invalid data found"));
                assert!(message.contains("line two"));
                assert!(!message.contains("line one"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn test_cancel_stops_hanging_process() {
        let spawner = Arc::new(MockSpawner::new());
        spawner.add_expectation("long.mkv", MockScript::hanging(["Duration: 00:10:00.00, start: 0"]));
        let (tx, rx) = sync_channel(8);
        let job = runner(&spawner, Duration::from_secs(2), 20)
            .start(JobId(3), &invocation("long.mkv"), None, tx)
            .unwrap();

        assert!(job.cancel().is_ok());
        assert_eq!(spawner.live_processes(), 0);
        assert_eq!(spawner.stop_requests(), 1);

        let events = drain(&rx);
        job.join();
        assert_eq!(outcome(&events), JobOutcome::Cancelled { forced: false });
    }

    #[test]
    fn test_cancel_kills_process_ignoring_quit() {
        let spawner = Arc::new(MockSpawner::new());
        spawner.add_expectation("stuck.mp4", MockScript::hanging(Vec::<String>::new()).ignoring_quit());
        let (tx, rx) = sync_channel(8);
        let job = runner(&spawner, Duration::from_millis(50), 20)
            .start(JobId(4), &invocation("stuck.mp4"), None, tx)
            .unwrap();

        let result = job.cancel();
        assert!(matches!(result, Err(CoreError::ProcessTimeoutOnCancel(_))));
        assert_eq!(spawner.live_processes(), 0);

        let events = drain(&rx);
        job.join();
        assert_eq!(outcome(&events), JobOutcome::Cancelled { forced: true });
    }

    #[test]
    fn test_launch_failure_is_reported() {
        let spawner = Arc::new(MockSpawner::new());
        spawner.add_expectation("x.mp4", MockScript::launch_failure("permission denied"));
        let (tx, _rx) = sync_channel(1);
        let result = runner(&spawner, Duration::from_secs(1), 20).start(JobId(5), &invocation("x.mp4"), None, tx);
        assert!(matches!(result, Err(CoreError::ProcessLaunchFailed(..))));
    }

    #[test]
    fn test_expected_duration_drives_progress() {
        let spawner = Arc::new(MockSpawner::new());
        spawner.add_expectation(
            "trim.mp4",
            MockScript::success(["Duration: 00:01:40.00, start: 0", "time=00:00:05.00"]),
        );
        let (tx, rx) = sync_channel(8);
        let job = runner(&spawner, Duration::from_secs(1), 20)
            .start(JobId(6), &invocation("trim.mp4"), Some(10.0), tx)
            .unwrap();
        let events = drain(&rx);
        job.join();
        assert!(events.contains(&JobEvent::Progress {
            id: JobId(6),
            fraction: 0.5
        }));
    }
}
