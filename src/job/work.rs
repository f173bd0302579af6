use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::state::JobState;
use crate::error::JobError;
use crate::logsink::LogSink;

type WorkFuture<T> = Pin<Box<dyn Future<Output = Result<T, JobError>> + Send>>;
type WorkFn<T> = Box<dyn FnOnce(JobContext) -> WorkFuture<T> + Send>;
type SuccessCallback<T> = Box<dyn FnOnce(&T) + Send>;
type FailureCallback = Box<dyn FnOnce(&JobError) + Send>;

/// Mutable lifecycle data behind the core's lock.
pub(crate) struct StateCell {
    pub(crate) state: JobState,
    pub(crate) started_at: Option<DateTime<Utc>>,
    pub(crate) finished_at: Option<DateTime<Utc>>,
    pub(crate) last_error: Option<String>,
    // Armed while the job is Paused; a fresh gate per pause cycle.
    pause_gate: Option<Arc<Notify>>,
}

/// Identity, state machine and signals shared between a running job and
/// the handles that observe it.
pub(crate) struct JobCore {
    pub(crate) id: Uuid,
    pub(crate) name: String,
    pub(crate) predicted_duration: Option<Duration>,
    cell: Mutex<StateCell>,
    cancel: CancellationToken,
}

impl JobCore {
    fn new(name: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            predicted_duration: None,
            cell: Mutex::new(StateCell {
                state: JobState::Pending,
                started_at: None,
                finished_at: None,
                last_error: None,
                pause_gate: None,
            }),
            cancel: CancellationToken::new(),
        }
    }

    // A poisoned lock only means a panicking reader; the cell stays usable.
    fn cell(&self) -> MutexGuard<'_, StateCell> {
        self.cell.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn state(&self) -> JobState {
        self.cell().state
    }

    pub(crate) fn started_at(&self) -> Option<DateTime<Utc>> {
        self.cell().started_at
    }

    pub(crate) fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.cell().finished_at
    }

    pub(crate) fn last_error(&self) -> Option<String> {
        self.cell().last_error.clone()
    }

    /// Signal cancellation. Idempotent; a no-op once terminal. Releases an
    /// armed pause gate so a suspended job wakes up and observes the signal.
    pub(crate) fn cancel(&self) {
        let mut cell = self.cell();
        if cell.state.is_terminal() {
            return;
        }
        // Cancel the token before releasing the gate: a checkpoint woken
        // by the gate must already see the cancellation signal, not slip
        // through and run until its next checkpoint.
        self.cancel.cancel();
        if let Some(gate) = cell.pause_gate.take() {
            gate.notify_one();
        }
    }

    /// Arm the pause gate. Only effective while Running.
    pub(crate) fn pause(&self) {
        let mut cell = self.cell();
        if cell.state != JobState::Running {
            return;
        }
        cell.state = JobState::Paused;
        cell.pause_gate = Some(Arc::new(Notify::new()));
    }

    /// Release the pause gate. Only effective while Paused.
    pub(crate) fn resume(&self) {
        let mut cell = self.cell();
        if cell.state != JobState::Paused {
            return;
        }
        cell.state = JobState::Running;
        // notify_one stores a permit, so the wakeup is not lost even if the
        // job has not reached its checkpoint wait yet.
        if let Some(gate) = cell.pause_gate.take() {
            gate.notify_one();
        }
    }

    fn begin(&self) {
        let mut cell = self.cell();
        debug_assert!(cell.state.can_transition_to(JobState::Running));
        cell.state = JobState::Running;
        cell.started_at = Some(Utc::now());
    }

    /// Record the single terminal transition. `run` is the only caller, so
    /// exactly one terminal state is reached per job.
    fn finish(&self, terminal: JobState, error: Option<String>) {
        debug_assert!(terminal.is_terminal());
        let mut cell = self.cell();
        cell.state = terminal;
        cell.finished_at = Some(Utc::now());
        cell.pause_gate = None;
        if error.is_some() {
            cell.last_error = error;
        }
    }
}

/// Execution context handed to a work function.
///
/// The context is how a job cooperates with the runner: it exposes the
/// cancellation signal, the pause checkpoint and the job's audit log.
#[derive(Clone)]
pub struct JobContext {
    core: Arc<JobCore>,
    sink: Arc<dyn LogSink>,
}

impl JobContext {
    pub fn id(&self) -> Uuid {
        self.core.id
    }

    pub fn name(&self) -> &str {
        &self.core.name
    }

    /// Whether cancellation has been requested for this job.
    pub fn is_cancelled(&self) -> bool {
        self.core.cancel.is_cancelled()
    }

    /// Append a line to this job's audit log.
    pub fn log(&self, message: impl AsRef<str>) {
        self.sink.log(self.core.id, message.as_ref());
    }

    /// Cooperative suspension point. Call this periodically from the work
    /// function.
    ///
    /// If the job is Paused, suspends until Resume releases the gate or
    /// cancellation is signalled. Returns `Err(JobError::Cancelled)` once
    /// cancellation has been requested; propagate it with `?` to unwind
    /// into the Cancelled state. Jobs that never call this can be neither
    /// paused nor cancelled.
    pub async fn checkpoint(&self) -> Result<(), JobError> {
        loop {
            if self.core.cancel.is_cancelled() {
                return Err(JobError::Cancelled);
            }
            let gate = { self.core.cell().pause_gate.clone() };
            let Some(gate) = gate else {
                return Ok(());
            };
            tokio::select! {
                _ = self.core.cancel.cancelled() => return Err(JobError::Cancelled),
                _ = gate.notified() => {}
            }
            // Woken by Resume (or by Cancel releasing the gate); loop to
            // re-read the signals.
        }
    }
}

/// A single unit of asynchronous background work.
///
/// Constructed by the caller with an async work function, then transferred
/// to a [`JobRegistry`](crate::registry::JobRegistry), which starts it and
/// keeps a type-erased handle for later inspection.
pub struct Job<T> {
    core: Arc<JobCore>,
    work: WorkFn<T>,
    result: Arc<Mutex<Option<T>>>,
    on_success: Option<SuccessCallback<T>>,
    on_failure: Option<FailureCallback>,
}

impl<T: Send + 'static> Job<T> {
    /// Create a pending job with the given display name and work function.
    pub fn new<F, Fut>(name: impl Into<String>, work: F) -> Self
    where
        F: FnOnce(JobContext) -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, JobError>> + Send + 'static,
    {
        Self {
            core: Arc::new(JobCore::new(name.into())),
            work: Box::new(move |ctx| -> WorkFuture<T> { Box::pin(work(ctx)) }),
            result: Arc::new(Mutex::new(None)),
            on_success: None,
            on_failure: None,
        }
    }

    /// Attach an informational duration estimate. Never enforced.
    pub fn with_predicted_duration(mut self, duration: Duration) -> Self {
        // Arc is still unique here; the job has not been registered yet.
        if let Some(core) = Arc::get_mut(&mut self.core) {
            core.predicted_duration = Some(duration);
        }
        self
    }

    /// Callback invoked with the result after a successful completion.
    /// Not invoked on cancellation or failure.
    pub fn on_success(mut self, callback: impl FnOnce(&T) + Send + 'static) -> Self {
        self.on_success = Some(Box::new(callback));
        self
    }

    /// Callback invoked with the error after a failed completion.
    /// Not invoked on cancellation.
    pub fn on_failure(mut self, callback: impl FnOnce(&JobError) + Send + 'static) -> Self {
        self.on_failure = Some(Box::new(callback));
        self
    }

    pub fn id(&self) -> Uuid {
        self.core.id
    }

    pub fn name(&self) -> &str {
        &self.core.name
    }

    pub fn state(&self) -> JobState {
        self.core.state()
    }

    pub fn cancel(&self) {
        self.core.cancel();
    }

    pub fn pause(&self) {
        self.core.pause();
    }

    pub fn resume(&self) {
        self.core.resume();
    }

    pub(crate) fn core(&self) -> &Arc<JobCore> {
        &self.core
    }

    pub(crate) fn result_slot(&self) -> &Arc<Mutex<Option<T>>> {
        &self.result
    }

    /// Drive the job from Pending to exactly one terminal state.
    ///
    /// The work future runs on its own task so that a panic inside it is
    /// contained and recorded as an `Error` outcome instead of tearing the
    /// job down without a terminal transition.
    pub(crate) async fn run(self, sink: Arc<dyn LogSink>) -> JobState {
        let Job {
            core,
            work,
            result,
            on_success,
            on_failure,
        } = self;

        core.begin();
        sink.log(core.id, "job started");
        log::debug!("job {} ({}) started", core.id, core.name);

        let ctx = JobContext {
            core: Arc::clone(&core),
            sink: Arc::clone(&sink),
        };
        let outcome = match tokio::spawn(work(ctx)).await {
            Ok(res) => res,
            Err(join_err) if join_err.is_panic() => {
                Err(JobError::Panicked(panic_message(join_err)))
            }
            Err(_) => Err(JobError::Cancelled),
        };

        match outcome {
            Ok(value) => {
                *result.lock().unwrap_or_else(PoisonError::into_inner) = Some(value);
                core.finish(JobState::Completed, None);
                sink.log(core.id, "job completed");
                log::debug!("job {} completed", core.id);
                if let Some(callback) = on_success {
                    let guard = result.lock().unwrap_or_else(PoisonError::into_inner);
                    if let Some(value) = guard.as_ref() {
                        callback(value);
                    }
                }
                JobState::Completed
            }
            Err(JobError::Cancelled) => {
                core.finish(JobState::Cancelled, None);
                sink.log(core.id, "job cancelled");
                log::debug!("job {} cancelled", core.id);
                JobState::Cancelled
            }
            Err(err) => {
                core.finish(JobState::Error, Some(err.to_string()));
                sink.log(core.id, &format!("job failed: {err}"));
                log::warn!("job {} ({}) failed: {err}", core.id, core.name);
                if let Some(callback) = on_failure {
                    callback(&err);
                }
                JobState::Error
            }
        }
    }
}

fn panic_message(err: tokio::task::JoinError) -> String {
    match err.try_into_panic() {
        Ok(payload) => payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string()),
        Err(_) => "task aborted".to_string(),
    }
}
