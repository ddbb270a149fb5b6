// ============================================================================
// reelq-core/src/queue.rs
// ============================================================================
//
// BATCH QUEUE: Ordered Jobs with Sequential Dispatch
//
// Holds the ordered job list and dispatches Pending jobs one at a time on a
// dedicated thread. The job list, queue state and current cancel handle live
// behind a single mutex; every status change is applied under it and then
// published to observers outside of it.
//
// KEY COMPONENTS:
// - BatchQueue: add/remove/reorder/sort, start, cancel_batch, wait_idle
// - QueueHandle: cloneable non-blocking view (snapshot, request_cancel)
// - QueueObserver / QueueEvent: push notifications for a display layer
// - SortOrder: name, date and size orderings
//
// STATE MACHINE:
//   Idle -> Dispatching -> WaitingOnJob -> Dispatching -> ... -> Idle
// The queue returns to Idle when no Pending job remains or after a batch
// cancel. At most one job is Running at any time.

// ---- External crate imports ----
use serde::Serialize;

// ---- Standard library imports ----
use std::cmp::Reverse;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::mpsc::sync_channel;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, RwLock};
use std::thread::{self, JoinHandle};
use std::time::{SystemTime, UNIX_EPOCH};

// ---- Internal crate imports ----
use crate::command::{build_command, expected_output_duration};
use crate::error::{CoreError, CoreResult};
use crate::external::{MediaProber, ProcessSpawner, ToolInvocation};
use crate::job::{Job, JobId, JobParams, JobStatus};
use crate::runner::{CancelHandle, JobEvent, JobOutcome, JobRunner};
use crate::session::Session;

// ============================================================================
// PUBLIC TYPES
// ============================================================================

/// Dispatch state of the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueState {
    Idle,
    Dispatching,
    WaitingOnJob,
}

/// Orderings offered by `BatchQueue::sort`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    NameAsc,
    NameDesc,
    DateNewest,
    DateOldest,
    SizeLargest,
    SizeSmallest,
}

impl SortOrder {
    pub const ALL: [SortOrder; 6] = [
        SortOrder::NameAsc,
        SortOrder::NameDesc,
        SortOrder::DateNewest,
        SortOrder::DateOldest,
        SortOrder::SizeLargest,
        SortOrder::SizeSmallest,
    ];

    /// Identifier accepted by `FromStr`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::NameAsc => "name-asc",
            SortOrder::NameDesc => "name-desc",
            SortOrder::DateNewest => "date-newest",
            SortOrder::DateOldest => "date-oldest",
            SortOrder::SizeLargest => "size-largest",
            SortOrder::SizeSmallest => "size-smallest",
        }
    }

    /// Human readable label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            SortOrder::NameAsc => "Name (A-Z)",
            SortOrder::NameDesc => "Name (Z-A)",
            SortOrder::DateNewest => "Date (Newest)",
            SortOrder::DateOldest => "Date (Oldest)",
            SortOrder::SizeLargest => "Size (Largest)",
            SortOrder::SizeSmallest => "Size (Smallest)",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SortOrder {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortOrder::ALL
            .into_iter()
            .find(|order| order.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CoreError::InvalidInput(format!("Unknown sort order '{s}'")))
    }
}

/// Job counts by final status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failed: usize,
    pub cancelled: usize,
    pub pending: usize,
}

impl BatchSummary {
    fn from_jobs(jobs: &[Job]) -> Self {
        let mut summary = Self::default();
        for job in jobs {
            match job.status {
                JobStatus::Succeeded => summary.succeeded += 1,
                JobStatus::Failed => summary.failed += 1,
                JobStatus::Cancelled => summary.cancelled += 1,
                JobStatus::Pending => summary.pending += 1,
                JobStatus::Running => {}
            }
        }
        summary
    }
}

/// Notifications published by the queue.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum QueueEvent {
    StateChanged { state: QueueState },
    JobAdded { job: Job },
    JobRemoved { id: JobId },
    /// A job changed status (started, finished, requeued).
    JobUpdated { job: Job },
    JobProgress { id: JobId, fraction: f64 },
    JobOutput { id: JobId, line: String },
    BatchFinished { summary: BatchSummary },
}

/// Receives queue events. Called on the thread that caused the change.
///
/// Observers must not block on the queue (`cancel_batch`, `wait_idle`);
/// use [`QueueHandle::request_cancel`] instead.
pub trait QueueObserver: Send + Sync {
    fn on_event(&self, event: &QueueEvent);
}

impl<F> QueueObserver for F
where
    F: Fn(&QueueEvent) + Send + Sync,
{
    fn on_event(&self, event: &QueueEvent) {
        self(event);
    }
}

// ============================================================================
// SHARED STATE
// ============================================================================

struct Inner {
    jobs: Vec<Job>,
    state: QueueState,
    next_id: u64,
    cancel_requested: bool,
    current: Option<CancelHandle>,
}

impl Inner {
    fn job_mut(&mut self, id: JobId) -> Option<&mut Job> {
        self.jobs.iter_mut().find(|job| job.id == id)
    }

    fn index_of(&self, id: JobId) -> CoreResult<usize> {
        self.jobs
            .iter()
            .position(|job| job.id == id)
            .ok_or(CoreError::JobNotFound(id))
    }
}

struct Shared {
    inner: Mutex<Inner>,
    changed: Condvar,
    observers: RwLock<Vec<Arc<dyn QueueObserver>>>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn publish(&self, events: &[QueueEvent]) {
        self.changed.notify_all();
        let observers = self
            .observers
            .read()
            .map(|observers| observers.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone());
        for observer in &observers {
            for event in events {
                observer.on_event(event);
            }
        }
    }

    fn wait_until_idle(&self) {
        let mut inner = self.lock();
        while inner.state != QueueState::Idle {
            inner = self
                .changed
                .wait(inner)
                .unwrap_or_else(|poisoned| poisoned.into_inner());
        }
    }

    /// Flags the batch for cancellation; returns the running job's handle.
    fn flag_cancel(&self) -> Option<Option<CancelHandle>> {
        let mut inner = self.lock();
        if inner.state == QueueState::Idle {
            return None;
        }
        inner.cancel_requested = true;
        Some(inner.current.clone())
    }

    /// Applies a final status to a job and leaves the WaitingOnJob state.
    fn finish_job(&self, id: JobId, status: JobStatus, error: Option<String>) {
        let mut events = Vec::new();
        {
            let mut inner = self.lock();
            if inner.current.as_ref().is_some_and(|h| h.job_id() == id) {
                inner.current = None;
            }
            if let Some(job) = inner.job_mut(id) {
                job.finish(status, error);
                events.push(QueueEvent::JobUpdated { job: job.clone() });
            }
            if inner.state == QueueState::WaitingOnJob {
                inner.state = QueueState::Dispatching;
                events.push(QueueEvent::StateChanged {
                    state: QueueState::Dispatching,
                });
            }
        }
        match status {
            JobStatus::Succeeded => log::info!("Job {id} succeeded"),
            JobStatus::Cancelled => log::info!("Job {id} cancelled"),
            _ => log::error!("Job {id} {status}"),
        }
        self.publish(&events);
    }
}

/// Cloneable, non-blocking access to a queue, safe to use from observers.
#[derive(Clone)]
pub struct QueueHandle {
    shared: Arc<Shared>,
}

impl QueueHandle {
    pub fn snapshot(&self) -> Vec<Job> {
        self.shared.lock().jobs.clone()
    }

    pub fn state(&self) -> QueueState {
        self.shared.lock().state
    }

    /// Asks the batch to stop without waiting for it.
    ///
    /// A running job is cancelled on a helper thread; Pending jobs stay Pending.
    pub fn request_cancel(&self) {
        let Some(current) = self.shared.flag_cancel() else {
            return;
        };
        if let Some(handle) = current {
            let spawned = thread::Builder::new()
                .name("reelq-cancel".to_string())
                .spawn(move || {
                    if let Err(e) = handle.cancel() {
                        log::warn!("{e}");
                    }
                });
            if let Err(e) = spawned {
                log::error!("Could not start cancellation thread: {e}");
            }
        }
    }
}

// ============================================================================
// BATCH QUEUE
// ============================================================================

struct DispatchContext<S: ProcessSpawner> {
    session: Arc<Session>,
    runner: JobRunner<S>,
    prober: Arc<dyn MediaProber>,
}

/// Ordered job list with a single dispatcher thread.
pub struct BatchQueue<S: ProcessSpawner> {
    shared: Arc<Shared>,
    context: Arc<DispatchContext<S>>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl<S: ProcessSpawner> BatchQueue<S> {
    pub fn new(session: Arc<Session>, spawner: Arc<S>, prober: Arc<dyn MediaProber>) -> Self {
        let runner = JobRunner::new(spawner, session.config());
        Self {
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    jobs: Vec::new(),
                    state: QueueState::Idle,
                    next_id: 1,
                    cancel_requested: false,
                    current: None,
                }),
                changed: Condvar::new(),
                observers: RwLock::new(Vec::new()),
            }),
            context: Arc::new(DispatchContext {
                session,
                runner,
                prober,
            }),
            dispatcher: Mutex::new(None),
        }
    }

    pub fn subscribe(&self, observer: Arc<dyn QueueObserver>) {
        match self.shared.observers.write() {
            Ok(mut observers) => observers.push(observer),
            Err(poisoned) => poisoned.into_inner().push(observer),
        }
    }

    #[must_use]
    pub fn handle(&self) -> QueueHandle {
        QueueHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Appends a Pending job.
    ///
    /// # Errors
    ///
    /// * `CoreError::InvalidInput` - the source is already queued
    pub fn add(
        &self,
        source: impl Into<PathBuf>,
        target: impl Into<PathBuf>,
        params: JobParams,
    ) -> CoreResult<JobId> {
        let source = source.into();
        let job = {
            let mut inner = self.shared.lock();
            if inner.jobs.iter().any(|job| job.source == source) {
                return Err(CoreError::InvalidInput(format!(
                    "{} is already in the queue",
                    source.display()
                )));
            }
            let id = JobId(inner.next_id);
            inner.next_id += 1;
            let job = Job::new(id, source, target.into(), params);
            inner.jobs.push(job.clone());
            job
        };
        log::debug!("Queued job {}: {}", job.id, job.source.display());
        let id = job.id;
        self.shared.publish(&[QueueEvent::JobAdded { job }]);
        Ok(id)
    }

    /// Removes a job that is not running.
    pub fn remove(&self, id: JobId) -> CoreResult<Job> {
        let removed = {
            let mut inner = self.shared.lock();
            let index = inner.index_of(id)?;
            if inner.jobs[index].status == JobStatus::Running {
                return Err(CoreError::QueueBusy(format!("job {id} is running")));
            }
            inner.jobs.remove(index)
        };
        self.shared.publish(&[QueueEvent::JobRemoved { id }]);
        Ok(removed)
    }

    /// Moves a job that is not running to `index` (clamped to the list end).
    pub fn move_to(&self, id: JobId, index: usize) -> CoreResult<()> {
        let mut inner = self.shared.lock();
        let from = inner.index_of(id)?;
        if inner.jobs[from].status == JobStatus::Running {
            return Err(CoreError::QueueBusy(format!("job {id} is running")));
        }
        let job = inner.jobs.remove(from);
        let to = index.min(inner.jobs.len());
        inner.jobs.insert(to, job);
        drop(inner);
        self.shared.changed.notify_all();
        Ok(())
    }

    /// Puts a Failed or Cancelled job back to Pending.
    pub fn requeue(&self, id: JobId) -> CoreResult<()> {
        let job = {
            let mut inner = self.shared.lock();
            let index = inner.index_of(id)?;
            let job = &mut inner.jobs[index];
            if !matches!(job.status, JobStatus::Failed | JobStatus::Cancelled) {
                return Err(CoreError::InvalidInput(format!(
                    "job {id} is {} and cannot be requeued",
                    job.status
                )));
            }
            *job = Job::new(job.id, job.source.clone(), job.target.clone(), job.params.clone());
            job.clone()
        };
        self.shared.publish(&[QueueEvent::JobUpdated { job }]);
        Ok(())
    }

    /// Removes every job. Only allowed while Idle.
    pub fn clear(&self) -> CoreResult<()> {
        let removed: Vec<JobId> = {
            let mut inner = self.shared.lock();
            if inner.state != QueueState::Idle {
                return Err(CoreError::QueueBusy("cannot clear while a batch is running".into()));
            }
            inner.jobs.drain(..).map(|job| job.id).collect()
        };
        let events: Vec<QueueEvent> = removed
            .into_iter()
            .map(|id| QueueEvent::JobRemoved { id })
            .collect();
        self.shared.publish(&events);
        Ok(())
    }

    /// Reorders the jobs. Only allowed while Idle.
    pub fn sort(&self, order: SortOrder) -> CoreResult<()> {
        let mut inner = self.shared.lock();
        if inner.state != QueueState::Idle {
            return Err(CoreError::QueueBusy("cannot sort while a batch is running".into()));
        }
        sort_jobs(&mut inner.jobs, order);
        log::debug!("Queue sorted by {order}");
        drop(inner);
        self.shared.changed.notify_all();
        Ok(())
    }

    /// Copy of every job in queue order.
    pub fn snapshot(&self) -> Vec<Job> {
        self.shared.lock().jobs.clone()
    }

    pub fn job(&self, id: JobId) -> Option<Job> {
        self.shared.lock().jobs.iter().find(|job| job.id == id).cloned()
    }

    pub fn state(&self) -> QueueState {
        self.shared.lock().state
    }

    pub fn len(&self) -> usize {
        self.shared.lock().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn summary(&self) -> BatchSummary {
        BatchSummary::from_jobs(&self.shared.lock().jobs)
    }

    /// Starts dispatching Pending jobs in order.
    ///
    /// # Errors
    ///
    /// * `CoreError::QueueBusy` - a batch is already running
    pub fn start(&self) -> CoreResult<()> {
        let mut slot = self
            .dispatcher
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // A finished dispatcher may still be publishing its final Idle.
        if self.shared.lock().state == QueueState::Idle {
            if let Some(previous) = slot.take() {
                if previous.thread().id() == thread::current().id() {
                    *slot = Some(previous);
                } else if previous.join().is_err() {
                    log::error!("Dispatcher thread panicked");
                }
            }
        }

        {
            let mut inner = self.shared.lock();
            if inner.state != QueueState::Idle {
                return Err(CoreError::QueueBusy("a batch is already running".into()));
            }
            inner.state = QueueState::Dispatching;
            inner.cancel_requested = false;
        }
        self.shared.publish(&[QueueEvent::StateChanged {
            state: QueueState::Dispatching,
        }]);

        let shared = Arc::clone(&self.shared);
        let context = Arc::clone(&self.context);
        let spawned = thread::Builder::new()
            .name("reelq-dispatcher".to_string())
            .spawn(move || dispatch_loop(&shared, &context));
        match spawned {
            Ok(handle) => {
                *slot = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.shared.lock().state = QueueState::Idle;
                self.shared.publish(&[QueueEvent::StateChanged {
                    state: QueueState::Idle,
                }]);
                Err(CoreError::OperationFailed(format!(
                    "Could not start dispatcher: {e}"
                )))
            }
        }
    }

    /// Cancels the running job and stops dispatching. Blocks until Idle.
    ///
    /// Pending jobs stay Pending; `start` resumes with them.
    ///
    /// # Errors
    ///
    /// * `CoreError::ProcessTimeoutOnCancel` - the job had to be killed
    pub fn cancel_batch(&self) -> CoreResult<()> {
        let Some(current) = self.shared.flag_cancel() else {
            return Ok(());
        };
        log::info!("Cancelling batch");
        let result = match current {
            Some(handle) => handle.cancel(),
            None => Ok(()),
        };
        self.wait_idle();
        result
    }

    /// Blocks until the queue is Idle and the dispatcher has finished.
    pub fn wait_idle(&self) {
        self.shared.wait_until_idle();
        let mut slot = self
            .dispatcher
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(handle) = slot.take() {
            if handle.thread().id() == thread::current().id() {
                *slot = Some(handle);
            } else if handle.join().is_err() {
                log::error!("Dispatcher thread panicked");
            }
        }
    }
}

impl<S: ProcessSpawner> Drop for BatchQueue<S> {
    fn drop(&mut self) {
        if let Err(e) = self.cancel_batch() {
            log::warn!("{e}");
        }
    }
}

// ============================================================================
// DISPATCHER
// ============================================================================

fn dispatch_loop<S: ProcessSpawner>(shared: &Shared, context: &DispatchContext<S>) {
    loop {
        let (next, summary) = {
            let mut inner = shared.lock();
            let index = if inner.cancel_requested {
                None
            } else {
                inner
                    .jobs
                    .iter()
                    .position(|job| job.status == JobStatus::Pending)
            };
            match index {
                Some(index) => {
                    inner.jobs[index].mark_running();
                    inner.state = QueueState::Dispatching;
                    (Some(inner.jobs[index].clone()), None)
                }
                None => {
                    inner.state = QueueState::Idle;
                    inner.cancel_requested = false;
                    inner.current = None;
                    (None, Some(BatchSummary::from_jobs(&inner.jobs)))
                }
            }
        };

        let Some(job) = next else {
            let summary = summary.unwrap_or_default();
            log::info!(
                "Batch finished: {} succeeded, {} failed, {} cancelled, {} pending",
                summary.succeeded,
                summary.failed,
                summary.cancelled,
                summary.pending
            );
            shared.publish(&[
                QueueEvent::BatchFinished { summary },
                QueueEvent::StateChanged {
                    state: QueueState::Idle,
                },
            ]);
            return;
        };

        log::info!(
            "Starting job {}: {} -> {}",
            job.id,
            job.source.display(),
            job.target.display()
        );
        shared.publish(&[QueueEvent::JobUpdated { job: job.clone() }]);
        run_job(shared, context, &job);
    }
}

fn run_job<S: ProcessSpawner>(shared: &Shared, context: &DispatchContext<S>, job: &Job) {
    let (invocation, expected) = match prepare_invocation(context, job) {
        Ok(prepared) => prepared,
        Err(e) => {
            shared.finish_job(job.id, JobStatus::Failed, Some(e.to_string()));
            return;
        }
    };

    if shared.lock().cancel_requested {
        shared.finish_job(job.id, JobStatus::Cancelled, None);
        return;
    }

    let capacity = context.session.config().event_channel_capacity;
    let (tx, rx) = sync_channel(capacity);
    let running = match context.runner.start(job.id, &invocation, expected, tx) {
        Ok(running) => running,
        Err(e) => {
            shared.finish_job(job.id, JobStatus::Failed, Some(e.to_string()));
            return;
        }
    };

    let cancel_now = {
        let mut inner = shared.lock();
        inner.current = Some(running.cancel_handle());
        inner.state = QueueState::WaitingOnJob;
        inner.cancel_requested
    };
    shared.publish(&[QueueEvent::StateChanged {
        state: QueueState::WaitingOnJob,
    }]);
    if cancel_now {
        if let Err(e) = running.cancel() {
            log::warn!("{e}");
        }
    }

    let mut finished = false;
    for event in rx.iter() {
        match event {
            JobEvent::Progress { id, fraction } => {
                let stored = shared
                    .lock()
                    .job_mut(id)
                    .and_then(|job| job.advance(fraction).then_some(job))
                    .map(|job| job.progress);
                if let Some(fraction) = stored {
                    shared.publish(&[QueueEvent::JobProgress { id, fraction }]);
                }
            }
            JobEvent::Line { id, line } => {
                shared.publish(&[QueueEvent::JobOutput { id, line }]);
            }
            JobEvent::Finished { id, outcome } => {
                let (status, error) = match outcome {
                    JobOutcome::Succeeded => (JobStatus::Succeeded, None),
                    JobOutcome::Failed(message) => (JobStatus::Failed, Some(message)),
                    JobOutcome::Cancelled { forced } => {
                        let note = forced.then(|| {
                            CoreError::ProcessTimeoutOnCancel(context.session.config().cancel_timeout)
                                .to_string()
                        });
                        (JobStatus::Cancelled, note)
                    }
                };
                shared.finish_job(id, status, error);
                finished = true;
                break;
            }
        }
    }

    if !finished {
        shared.finish_job(
            job.id,
            JobStatus::Failed,
            Some("job runner stopped without reporting a result".to_string()),
        );
    }
    running.join();
}

/// Probes the source when needed and builds the invocation.
fn prepare_invocation<S: ProcessSpawner>(
    context: &DispatchContext<S>,
    job: &Job,
) -> CoreResult<(ToolInvocation, Option<f64>)> {
    let media = if job.params.needs_decode() {
        match context.prober.probe(&job.source) {
            Ok(info) => Some(info),
            Err(e) => {
                log::warn!("Continuing without media info: {e}");
                None
            }
        }
    } else {
        None
    };

    let session = &context.session;
    let args = build_command(
        &job.params,
        &job.source,
        &job.target,
        session.capabilities(),
        session.config(),
        media.as_ref(),
    )?;
    let expected = expected_output_duration(&job.params, media.as_ref());
    Ok((session.invocation(args), expected))
}

// ============================================================================
// SORTING
// ============================================================================

fn sort_jobs(jobs: &mut [Job], order: SortOrder) {
    match order {
        SortOrder::NameAsc => jobs.sort_by_cached_key(Job::sort_name),
        SortOrder::NameDesc => jobs.sort_by_cached_key(|job| Reverse(job.sort_name())),
        SortOrder::DateNewest => jobs.sort_by_cached_key(|job| Reverse(modified_time(&job.source))),
        SortOrder::DateOldest => jobs.sort_by_cached_key(|job| modified_time(&job.source)),
        SortOrder::SizeLargest => jobs.sort_by_cached_key(|job| Reverse(file_size(&job.source))),
        SortOrder::SizeSmallest => jobs.sort_by_cached_key(|job| file_size(&job.source)),
    }
}

fn modified_time(path: &Path) -> SystemTime {
    fs::metadata(path)
        .and_then(|metadata| metadata.modified())
        .unwrap_or(UNIX_EPOCH)
}

fn file_size(path: &Path) -> u64 {
    fs::metadata(path).map(|metadata| metadata.len()).unwrap_or(0)
}
