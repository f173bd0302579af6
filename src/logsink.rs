use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::RunnerError;

/// One immutable audit-log line: when it was written and what it says.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

type LogObserver = std::sync::Arc<dyn Fn(Uuid, &LogEntry) + Send + Sync>;

/// Append-only per-job log storage.
///
/// Jobs write through this while running; the registry reads it back when
/// building composite job views. Entry order per job id is insertion
/// order; ordering across different jobs is unspecified.
pub trait LogSink: Send + Sync {
    /// Append a message for the given job, stamped with the system clock.
    fn log(&self, job_id: Uuid, message: &str);

    /// The ordered entries for a job id; empty (never an error) when the
    /// id is unknown.
    fn logs_for(&self, job_id: Uuid) -> Vec<LogEntry>;

    /// The backing file, when the sink persists to disk.
    fn location(&self) -> Option<&Path> {
        None
    }
}

/// The default [`LogSink`]: in-memory per-id vectors, optionally mirrored
/// to an append-only text file (one line per entry,
/// `timestamp [jobId] message`).
pub struct JobLogger {
    entries: Mutex<HashMap<Uuid, Vec<LogEntry>>>,
    // Single writer lock serializes all file appends.
    writer: Option<Mutex<File>>,
    path: Option<PathBuf>,
    observers: Mutex<Vec<LogObserver>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl JobLogger {
    /// A logger that keeps entries in memory only.
    pub fn in_memory() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            writer: None,
            path: None,
            observers: Mutex::new(Vec::new()),
        }
    }

    /// A logger that also appends each entry to the given file.
    pub fn with_file(path: impl Into<PathBuf>) -> Result<Self, RunnerError> {
        let path = path.into();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            entries: Mutex::new(HashMap::new()),
            writer: Some(Mutex::new(file)),
            path: Some(path),
            observers: Mutex::new(Vec::new()),
        })
    }

    /// Register an observer invoked synchronously after each append.
    pub fn on_entry(&self, observer: impl Fn(Uuid, &LogEntry) + Send + Sync + 'static) {
        lock(&self.observers).push(std::sync::Arc::new(observer));
    }
}

/// Parse one persisted log line (`timestamp [jobId] message`) back into
/// its job id and entry. Returns `None` for lines in any other shape.
pub fn parse_log_line(line: &str) -> Option<(Uuid, LogEntry)> {
    let (timestamp, rest) = line.split_once(" [")?;
    let (id, message) = rest.split_once("] ")?;
    let timestamp = DateTime::parse_from_rfc3339(timestamp)
        .ok()?
        .with_timezone(&Utc);
    let id = Uuid::parse_str(id).ok()?;
    Some((
        id,
        LogEntry {
            timestamp,
            message: message.to_string(),
        },
    ))
}

impl LogSink for JobLogger {
    fn log(&self, job_id: Uuid, message: &str) {
        let entry = LogEntry {
            timestamp: Utc::now(),
            message: message.to_string(),
        };

        lock(&self.entries)
            .entry(job_id)
            .or_default()
            .push(entry.clone());

        if let Some(writer) = &self.writer {
            let line = format!("{} [{job_id}] {}", entry.timestamp.to_rfc3339(), entry.message);
            let mut file = lock(writer);
            if let Err(err) = writeln!(file, "{line}") {
                log::warn!("failed to append to job log file: {err}");
            }
        }

        // Invoke observers after releasing their lock; an observer may
        // register further observers.
        let observers: Vec<LogObserver> = lock(&self.observers).clone();
        for observer in observers {
            observer(job_id, &entry);
        }
    }

    fn logs_for(&self, job_id: Uuid) -> Vec<LogEntry> {
        lock(&self.entries).get(&job_id).cloned().unwrap_or_default()
    }

    fn location(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn entries_come_back_in_insertion_order() {
        let logger = JobLogger::in_memory();
        let id = Uuid::new_v4();

        logger.log(id, "first");
        logger.log(id, "second");
        logger.log(id, "third");

        let messages: Vec<String> = logger
            .logs_for(id)
            .into_iter()
            .map(|e| e.message)
            .collect();
        assert_eq!(messages, vec!["first", "second", "third"]);
    }

    #[test]
    fn unknown_id_yields_empty_not_error() {
        let logger = JobLogger::in_memory();
        assert!(logger.logs_for(Uuid::new_v4()).is_empty());
    }

    #[test]
    fn entries_for_different_jobs_stay_separate() {
        let logger = JobLogger::in_memory();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        logger.log(a, "for a");
        logger.log(b, "for b");

        assert_eq!(logger.logs_for(a).len(), 1);
        assert_eq!(logger.logs_for(b).len(), 1);
        assert_eq!(logger.logs_for(a)[0].message, "for a");
    }

    #[test]
    fn observer_sees_every_append() {
        let logger = JobLogger::in_memory();
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);
        logger.on_entry(move |_id, _entry| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        let id = Uuid::new_v4();
        logger.log(id, "one");
        logger.log(id, "two");

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn log_observer_may_register_another_observer() {
        let logger = Arc::new(JobLogger::in_memory());
        let late_count = Arc::new(AtomicUsize::new(0));

        let reentrant = Arc::clone(&logger);
        let late = Arc::clone(&late_count);
        logger.on_entry(move |_id, _entry| {
            let late = Arc::clone(&late);
            reentrant.on_entry(move |_id, _entry| {
                late.fetch_add(1, Ordering::SeqCst);
            });
        });

        let id = Uuid::new_v4();
        logger.log(id, "first");
        logger.log(id, "second");

        // The observer added during "first" only sees "second".
        assert_eq!(late_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn file_backed_logger_writes_one_line_per_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.log");
        let logger = JobLogger::with_file(&path).unwrap();
        let id = Uuid::new_v4();

        logger.log(id, "hello");
        logger.log(id, "world");

        assert_eq!(logger.location(), Some(path.as_path()));
        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains(&format!("[{id}] hello")));
        assert!(lines[1].contains(&format!("[{id}] world")));
    }

    #[test]
    fn persisted_lines_parse_back_into_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jobs.log");
        let logger = JobLogger::with_file(&path).unwrap();
        let id = Uuid::new_v4();
        logger.log(id, "started [phase one]");

        let contents = std::fs::read_to_string(&path).unwrap();
        let (parsed_id, entry) = parse_log_line(contents.lines().next().unwrap()).unwrap();
        assert_eq!(parsed_id, id);
        assert_eq!(entry.message, "started [phase one]");
        assert_eq!(entry, logger.logs_for(id)[0]);
    }

    #[test]
    fn garbage_lines_do_not_parse() {
        assert!(parse_log_line("not a log line").is_none());
        assert!(parse_log_line("2026-08-25T00:00:00Z [not-a-uuid] hi").is_none());
        assert!(parse_log_line("").is_none());
    }

    #[test]
    fn in_memory_logger_has_no_location() {
        assert!(JobLogger::in_memory().location().is_none());
    }

    #[tokio::test]
    async fn concurrent_appends_lose_nothing() {
        let logger = Arc::new(JobLogger::in_memory());
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let mut tasks = Vec::new();
        for i in 0..50 {
            let logger = Arc::clone(&logger);
            let id = if i % 2 == 0 { a } else { b };
            tasks.push(tokio::spawn(async move {
                logger.log(id, &format!("entry {i}"));
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(logger.logs_for(a).len(), 25);
        assert_eq!(logger.logs_for(b).len(), 25);
    }
}
