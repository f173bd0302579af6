use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::state::JobState;
use super::work::JobCore;

/// Type-erased read/control view over a registered job.
///
/// The registry stores one handle per job regardless of the job's result
/// type; the result is exposed as an opaque JSON value. Reads reflect the
/// job's state at the time of the call.
pub trait JobHandle: Send + Sync {
    fn id(&self) -> Uuid;
    fn name(&self) -> &str;
    fn state(&self) -> JobState;

    /// The job's result, if it completed successfully.
    fn result_value(&self) -> Option<serde_json::Value>;

    fn started_at(&self) -> Option<DateTime<Utc>>;
    fn finished_at(&self) -> Option<DateTime<Utc>>;

    /// The caller's duration estimate, if one was attached.
    fn predicted_duration(&self) -> Option<std::time::Duration>;

    /// The stored failure message, set only when the job ended in Error.
    fn last_error(&self) -> Option<String>;

    fn cancel(&self);
    fn pause(&self);
    fn resume(&self);

    /// Wall-clock run time, available once the job is terminal.
    fn duration(&self) -> Option<chrono::Duration> {
        match (self.started_at(), self.finished_at()) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }
}

/// The one concrete handle: pairs the shared job core with the typed
/// result slot and erases the type at the trait boundary.
pub(crate) struct TypedJobHandle<T> {
    core: Arc<JobCore>,
    result: Arc<Mutex<Option<T>>>,
}

impl<T> TypedJobHandle<T> {
    pub(crate) fn new(core: Arc<JobCore>, result: Arc<Mutex<Option<T>>>) -> Self {
        Self { core, result }
    }
}

impl<T: Serialize + Send + 'static> JobHandle for TypedJobHandle<T> {
    fn id(&self) -> Uuid {
        self.core.id
    }

    fn name(&self) -> &str {
        &self.core.name
    }

    fn state(&self) -> JobState {
        self.core.state()
    }

    fn result_value(&self) -> Option<serde_json::Value> {
        let guard = self.result.lock().unwrap_or_else(PoisonError::into_inner);
        guard.as_ref().and_then(|v| serde_json::to_value(v).ok())
    }

    fn started_at(&self) -> Option<DateTime<Utc>> {
        self.core.started_at()
    }

    fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.core.finished_at()
    }

    fn predicted_duration(&self) -> Option<std::time::Duration> {
        self.core.predicted_duration
    }

    fn last_error(&self) -> Option<String> {
        self.core.last_error()
    }

    fn cancel(&self) {
        self.core.cancel();
    }

    fn pause(&self) {
        self.core.pause();
    }

    fn resume(&self) {
        self.core.resume();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::job::Job;
    use crate::logsink::{JobLogger, LogSink};

    #[tokio::test]
    async fn handle_exposes_result_as_json() {
        let job = Job::new("typed", |_ctx| async { Ok(vec![1u32, 2, 3]) })
            .with_predicted_duration(Duration::from_secs(1));
        let handle = TypedJobHandle::new(Arc::clone(job.core()), Arc::clone(job.result_slot()));

        assert_eq!(handle.state(), JobState::Pending);
        assert!(handle.result_value().is_none());
        assert!(handle.duration().is_none());

        let sink: Arc<dyn LogSink> = Arc::new(JobLogger::in_memory());
        job.run(sink).await;

        assert_eq!(handle.state(), JobState::Completed);
        assert_eq!(handle.result_value(), Some(serde_json::json!([1, 2, 3])));
        assert_eq!(handle.predicted_duration(), Some(Duration::from_secs(1)));
        assert!(handle.duration().unwrap() >= chrono::Duration::zero());
    }

    #[tokio::test]
    async fn handle_forwards_cancel() {
        let job = Job::<()>::new("forward", |ctx| async move {
            loop {
                ctx.checkpoint().await?;
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        });
        let handle = TypedJobHandle::new(Arc::clone(job.core()), Arc::clone(job.result_slot()));

        let sink: Arc<dyn LogSink> = Arc::new(JobLogger::in_memory());
        let running = tokio::spawn(job.run(sink));

        handle.cancel();
        let terminal = running.await.unwrap();
        assert_eq!(terminal, JobState::Cancelled);
        assert!(handle.result_value().is_none());
    }
}
