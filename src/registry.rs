use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use uuid::Uuid;

use crate::job::{Job, JobHandle, JobState};
use crate::logsink::{LogEntry, LogSink};

/// How often the drain loop re-checks for running jobs.
pub const DEFAULT_DRAIN_POLL: Duration = Duration::from_millis(100);

type JobObserver = Arc<dyn Fn(&dyn JobHandle) + Send + Sync>;

/// Composite per-job view: handle projection plus the job's full audit
/// log. `result` is absent for jobs that have not completed successfully.
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    pub id: Uuid,
    pub name: String,
    pub state: JobState,
    pub result: Option<serde_json::Value>,
    pub logs: Vec<LogEntry>,
}

/// The concurrent collection of all known jobs.
///
/// The registry is the long-lived owner of every job added to it: jobs are
/// wrapped in a type-erased handle, started immediately, and retained
/// after they terminate so results and logs stay inspectable. A single
/// coarse lock guards the collection; job-added and job-completed
/// observers run outside it, so an observer may call back into the
/// registry without deadlocking.
pub struct JobRegistry {
    jobs: Mutex<Vec<Arc<dyn JobHandle>>>,
    sink: Arc<dyn LogSink>,
    on_added: Arc<Mutex<Vec<JobObserver>>>,
    on_completed: Arc<Mutex<Vec<JobObserver>>>,
    drain_poll: Duration,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn notify(observers: &Mutex<Vec<JobObserver>>, handle: &dyn JobHandle) {
    // Snapshot under the lock, invoke after releasing it: an observer may
    // register further observers or call back into the registry.
    let snapshot: Vec<JobObserver> = lock(observers).clone();
    for observer in snapshot {
        observer(handle);
    }
}

impl JobRegistry {
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self::with_drain_poll(sink, DEFAULT_DRAIN_POLL)
    }

    /// A registry with a custom drain polling interval.
    pub fn with_drain_poll(sink: Arc<dyn LogSink>, drain_poll: Duration) -> Self {
        Self {
            jobs: Mutex::new(Vec::new()),
            sink,
            on_added: Arc::new(Mutex::new(Vec::new())),
            on_completed: Arc::new(Mutex::new(Vec::new())),
            drain_poll,
        }
    }

    /// Register an observer for job-added events. For any given job it
    /// fires before that job's job-completed event.
    pub fn on_job_added(&self, observer: impl Fn(&dyn JobHandle) + Send + Sync + 'static) {
        lock(&self.on_added).push(Arc::new(observer));
    }

    /// Register an observer fired exactly once per job, after the job
    /// reaches its terminal state.
    pub fn on_job_completed(&self, observer: impl Fn(&dyn JobHandle) + Send + Sync + 'static) {
        lock(&self.on_completed).push(Arc::new(observer));
    }

    /// Take ownership of a job, start it, and return its id.
    ///
    /// Returns as soon as the job's execution has been spawned; it does
    /// not wait for completion. Every added job runs immediately and
    /// concurrently with the others.
    pub fn add_job<T: Serialize + Send + 'static>(&self, job: Job<T>) -> Uuid {
        let id = job.id();
        let handle: Arc<dyn JobHandle> = Arc::new(crate::job::TypedJobHandle::new(
            Arc::clone(job.core()),
            Arc::clone(job.result_slot()),
        ));

        {
            let mut jobs = lock(&self.jobs);
            jobs.push(Arc::clone(&handle));
        }
        log::debug!("job {id} ({}) registered", handle.name());
        notify(&self.on_added, handle.as_ref());

        let sink = Arc::clone(&self.sink);
        let on_completed = Arc::clone(&self.on_completed);
        tokio::spawn(async move {
            job.run(sink).await;
            notify(&on_completed, handle.as_ref());
        });

        id
    }

    /// Look up a job's handle by id.
    pub fn job(&self, id: Uuid) -> Option<Arc<dyn JobHandle>> {
        lock(&self.jobs).iter().find(|h| h.id() == id).cloned()
    }

    /// Request cancellation of every registered job. Does not wait.
    pub fn cancel_all(&self) {
        for handle in lock(&self.jobs).iter() {
            handle.cancel();
        }
    }

    /// Pause the job with the given id. Unknown ids are a silent no-op.
    pub fn pause_job(&self, id: Uuid) {
        if let Some(handle) = self.job(id) {
            handle.pause();
        }
    }

    /// Resume the job with the given id. Unknown ids are a silent no-op.
    pub fn resume_job(&self, id: Uuid) {
        if let Some(handle) = self.job(id) {
            handle.resume();
        }
    }

    /// True iff at least one job currently reports Running.
    pub fn has_running_jobs(&self) -> bool {
        lock(&self.jobs)
            .iter()
            .any(|h| h.state() == JobState::Running)
    }

    pub fn len(&self) -> usize {
        lock(&self.jobs).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.jobs).is_empty()
    }

    /// Per-job composite views in insertion order.
    ///
    /// Membership is snapshotted once under the lock; each entry's state,
    /// result and logs are read lazily as the iterator advances, so a job
    /// finishing mid-iteration may appear with its result still absent.
    pub fn jobs_with_logs(&self) -> impl Iterator<Item = JobReport> + '_ {
        let snapshot: Vec<Arc<dyn JobHandle>> = lock(&self.jobs).clone();
        snapshot.into_iter().map(move |handle| JobReport {
            id: handle.id(),
            name: handle.name().to_string(),
            state: handle.state(),
            result: handle.result_value(),
            logs: self.sink.logs_for(handle.id()),
        })
    }

    /// Graceful drain: cancel everything, then wait until no job reports
    /// Running. Returns immediately when nothing runs.
    ///
    /// The wait is a polling sleep (interval set by
    /// [`with_drain_poll`](Self::with_drain_poll), 100 ms by default); the
    /// collection lock is never held across the sleep, so other registry
    /// operations proceed while a caller drains.
    pub async fn cancel_or_wait_for_running_jobs(&self) {
        self.cancel_all();
        while self.has_running_jobs() {
            tokio::time::sleep(self.drain_poll).await;
        }
        log::debug!("registry drained, no jobs running");
    }
}
