//! Mutirão — an in-process background job runner.
//!
//! Callers construct a [`Job`] around an async work function, hand it to a
//! [`JobRegistry`] (which starts it immediately), and later query state,
//! results and per-job audit logs, or issue cancel/pause/resume by id or
//! in bulk. Pause and cancellation are cooperative: the work function
//! periodically awaits [`JobContext::checkpoint`], which suspends while
//! paused and raises [`JobError::Cancelled`] once cancellation is
//! requested.
//!
//! ```no_run
//! use std::sync::Arc;
//! use mutirao::{Job, JobLogger, JobRegistry, LogSink};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let sink: Arc<dyn LogSink> = Arc::new(JobLogger::in_memory());
//! let registry = JobRegistry::new(Arc::clone(&sink));
//!
//! let id = registry.add_job(Job::new("count", |ctx| async move {
//!     let mut total = 0u64;
//!     for n in 0..1_000 {
//!         ctx.checkpoint().await?;
//!         total += n;
//!     }
//!     ctx.log("done counting");
//!     Ok(total)
//! }));
//!
//! let handle = registry.job(id).unwrap();
//! while !handle.state().is_terminal() {
//!     tokio::time::sleep(std::time::Duration::from_millis(10)).await;
//! }
//! println!("{:?}", handle.result_value());
//! # }
//! ```

pub mod config;
pub mod error;
pub mod job;
pub mod logging;
pub mod logsink;
pub mod registry;
pub mod shutdown;

pub use error::{JobError, RunnerError};
pub use job::{Job, JobContext, JobHandle, JobState};
pub use logsink::{JobLogger, LogEntry, LogSink};
pub use registry::{JobRegistry, JobReport};
