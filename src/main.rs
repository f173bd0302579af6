mod cli;
mod ui;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Command};
use mutirao::config::MutiraoConfig;
use mutirao::logsink::parse_log_line;
use mutirao::shutdown::install_shutdown_handler;
use mutirao::{Job, JobError, JobLogger, JobRegistry, JobReport, JobState, LogEntry, LogSink};
use ui::RunnerProgress;
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    mutirao::logging::init(cli.verbose);

    let mut config = MutiraoConfig::load()?;
    if cli.log_file.is_some() {
        config.log_file = cli.log_file.clone();
    }

    match cli.command {
        Command::Demo { jobs, with_failure } => run_demo(&config, jobs, with_failure).await,
        Command::Status => run_status(&config),
    }
}

/// Render the per-job report view from the persisted log file.
fn run_status(config: &MutiraoConfig) -> Result<()> {
    let Some(path) = &config.log_file else {
        println!("no log file configured; set `log_file` in mutirao.toml or pass --log-file");
        return Ok(());
    };
    let contents = std::fs::read_to_string(path)?;
    let reports = reports_from_log(&contents);
    if reports.is_empty() {
        println!("no jobs recorded in {path}");
        return Ok(());
    }
    ui::print_reports(&reports);
    Ok(())
}

/// Rebuild per-job reports from append-only log contents, in first-seen
/// order. Names and results are not persisted in the log, so the id
/// stands in for the name and `result` stays absent.
fn reports_from_log(contents: &str) -> Vec<JobReport> {
    let mut order: Vec<Uuid> = Vec::new();
    let mut logs: HashMap<Uuid, Vec<LogEntry>> = HashMap::new();
    for line in contents.lines() {
        let Some((id, entry)) = parse_log_line(line) else {
            continue;
        };
        if !logs.contains_key(&id) {
            order.push(id);
        }
        logs.entry(id).or_default().push(entry);
    }

    order
        .into_iter()
        .map(|id| {
            let entries = logs.remove(&id).unwrap_or_default();
            JobReport {
                id,
                name: id.to_string(),
                state: state_from_logs(&entries),
                result: None,
                logs: entries,
            }
        })
        .collect()
}

/// Infer a job's last known state from its lifecycle sentinel lines.
fn state_from_logs(entries: &[LogEntry]) -> JobState {
    entries
        .iter()
        .rev()
        .find_map(|entry| match entry.message.as_str() {
            "job completed" => Some(JobState::Completed),
            "job cancelled" => Some(JobState::Cancelled),
            message if message.starts_with("job failed:") => Some(JobState::Error),
            "job started" => Some(JobState::Running),
            _ => None,
        })
        .unwrap_or(JobState::Pending)
}

/// Launch a batch of cooperative demo jobs and watch them to completion.
/// Ctrl-C cancels everything and waits for the jobs to acknowledge before
/// the process exits.
async fn run_demo(config: &MutiraoConfig, jobs: usize, with_failure: bool) -> Result<()> {
    let logger = match &config.log_file {
        Some(path) => JobLogger::with_file(path)?,
        None => JobLogger::in_memory(),
    };
    let sink: Arc<dyn LogSink> = Arc::new(logger);
    let registry = Arc::new(JobRegistry::with_drain_poll(
        Arc::clone(&sink),
        config.drain_poll(),
    ));

    let progress = RunnerProgress::start(jobs + usize::from(with_failure));
    let added_ui = progress.clone();
    registry.on_job_added(move |handle| added_ui.job_added(handle.name()));
    let finished_ui = progress.clone();
    registry
        .on_job_completed(move |handle| finished_ui.job_finished(handle.name(), handle.state()));

    for i in 0..jobs {
        let steps = 20 + 10 * i as u64;
        registry.add_job(
            Job::new(format!("demo-{i}"), move |ctx| async move {
                let mut total = 0u64;
                for step in 0..steps {
                    ctx.checkpoint().await?;
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    total += step;
                    if step % 10 == 0 {
                        ctx.log(format!("reached step {step}"));
                    }
                }
                Ok(total)
            })
            .with_predicted_duration(Duration::from_millis(100 * steps)),
        );
    }

    if with_failure {
        registry.add_job(Job::<u64>::new("demo-failing", |ctx| async move {
            ctx.checkpoint().await?;
            tokio::time::sleep(Duration::from_millis(300)).await;
            Err(JobError::failed("simulated failure"))
        }));
    }

    let shutdown = install_shutdown_handler();
    loop {
        if registry.jobs_with_logs().all(|report| report.state.is_terminal()) {
            break;
        }
        tokio::select! {
            _ = shutdown.cancelled() => {
                progress.draining();
                registry.cancel_or_wait_for_running_jobs().await;
                break;
            }
            _ = tokio::time::sleep(Duration::from_millis(100)) => {}
        }
    }

    let reports: Vec<_> = registry.jobs_with_logs().collect();
    progress.finish(&reports);
    Ok(())
}
