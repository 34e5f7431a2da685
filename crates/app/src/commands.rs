//! Subcommand implementations.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use apiprobe_application::{
    SchedulerError, TaskScheduler, TestHttpClient, TestRunner, TransportError,
};
use apiprobe_domain::{
    ExecutionConfig, TaskOutcome, TaskPriority, TaskStatusInfo, TestSuiteExecutionResult,
};
use apiprobe_infrastructure::{
    load_suite, write_report, AppConfig, ConfigError, ReportError, ReqwestTransport,
    SuiteLoadError, SystemClock,
};

use crate::cli::{RunArgs, ScheduleArgs};

/// Errors surfaced by the CLI.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A suite file could not be loaded.
    #[error(transparent)]
    Suite(#[from] SuiteLoadError),

    /// The report could not be written.
    #[error(transparent)]
    Report(#[from] ReportError),

    /// The HTTP transport could not be created.
    #[error("failed to create HTTP transport: {0}")]
    Transport(#[from] TransportError),

    /// The scheduler refused to start.
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}

/// Final state of one scheduled suite.
#[derive(Debug)]
pub struct ScheduledOutcome {
    /// Suite file the task came from.
    pub file: PathBuf,
    /// Status snapshot at completion.
    pub task: TaskStatusInfo,
    /// Result, when the task completed.
    pub outcome: Option<TaskOutcome>,
}

impl ScheduledOutcome {
    /// Returns true when the task completed and every case passed.
    ///
    /// Follows [`TestSuiteExecutionResult::all_passed`], so an empty suite
    /// does not count as a success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome.as_ref().is_some_and(TaskOutcome::all_passed)
    }
}

/// Loads configuration and applies global flags.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded.
pub fn load_config(file: Option<&Path>, verbose: bool) -> Result<AppConfig, CommandError> {
    let mut config = AppConfig::load(file)?;
    if verbose {
        config.execution.verbose = true;
    }
    Ok(config)
}

fn build_runner(config: ExecutionConfig) -> Result<TestRunner, CommandError> {
    let transport = Arc::new(ReqwestTransport::new()?);
    Ok(TestRunner::new(TestHttpClient::new(transport, config)))
}

/// Runs one suite file.
///
/// # Errors
///
/// Returns an error if the suite cannot be loaded or the report cannot be
/// written. Failing cases are reported in the result, not as errors.
pub async fn run(
    args: &RunArgs,
    mut config: AppConfig,
) -> Result<TestSuiteExecutionResult, CommandError> {
    if let Some(concurrency) = args.concurrency {
        config.execution.max_concurrent_tests = concurrency;
    }

    let suite = load_suite(&args.suite).await?;
    let runner = build_runner(config.execution)?;

    info!(suite = %suite.name, cases = suite.len(), "Running suite");
    let result = runner
        .execute_test_suite(&suite, args.base_url.as_deref())
        .await;

    if let Some(output) = &args.output {
        write_report(output, &result).await?;
        info!(path = %output.display(), "Report written");
    }
    Ok(result)
}

fn delayed_start(delay_secs: u64) -> Option<DateTime<Utc>> {
    if delay_secs == 0 {
        return None;
    }
    let delay = i64::try_from(delay_secs)
        .ok()
        .and_then(chrono::Duration::try_seconds)?;
    Utc::now().checked_add_signed(delay)
}

/// Submits every suite file to a scheduler and waits for all of them.
///
/// # Errors
///
/// Returns an error if a suite cannot be loaded or the scheduler cannot
/// start.
pub async fn schedule(
    args: &ScheduleArgs,
    config: AppConfig,
) -> Result<Vec<ScheduledOutcome>, CommandError> {
    let mut suites = Vec::with_capacity(args.suites.len());
    for path in &args.suites {
        suites.push((path.clone(), load_suite(path).await?));
    }

    let poll = config.scheduler.poll_interval();
    let scheduler = TaskScheduler::new(
        build_runner(config.execution)?,
        config.scheduler,
        SystemClock::shared(),
    );
    scheduler.on_task_complete(|task| {
        info!(task_id = %task.id, label = task.payload.label(), "Task completed");
    });
    scheduler.on_task_error(|task| {
        warn!(
            task_id = %task.id,
            error = task.error.as_deref().unwrap_or_default(),
            "Task failed"
        );
    });
    scheduler.start()?;

    let scheduled_at = delayed_start(args.delay_secs);
    let priority = TaskPriority(args.priority);
    let submitted: Vec<(PathBuf, String)> = suites
        .into_iter()
        .map(|(path, suite)| {
            let id =
                scheduler.submit_test_suite(suite, args.base_url.clone(), priority, scheduled_at);
            (path, id)
        })
        .collect();

    loop {
        let pending = submitted.iter().any(|(_, id)| {
            scheduler
                .get_task_status(id)
                .is_some_and(|info| !info.status.is_terminal())
        });
        if !pending {
            break;
        }
        tokio::time::sleep(poll).await;
    }

    let outcomes = submitted
        .into_iter()
        .filter_map(|(file, id)| {
            let task = scheduler.get_task_status(&id)?;
            let outcome = scheduler.get_task_result(&id);
            Some(ScheduledOutcome {
                file,
                task,
                outcome,
            })
        })
        .collect();

    scheduler.stop().await;
    Ok(outcomes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use apiprobe_domain::{Task, TaskPayload, TestSuite};

    #[test]
    fn test_delayed_start() {
        assert!(delayed_start(0).is_none());

        let before = Utc::now();
        let at = delayed_start(30);
        assert!(at.is_some_and(|at| at >= before + chrono::Duration::seconds(30)));

        assert!(delayed_start(u64::MAX).is_none());
    }

    #[test]
    fn test_empty_suite_fails_on_both_paths() {
        let result = TestSuiteExecutionResult::start("s", "empty");
        assert!(!result.all_passed());

        let mut task = Task::new(
            TaskPayload::TestSuite(TestSuite::new("empty")),
            None,
            TaskPriority::NORMAL,
            None,
            Utc::now(),
        );
        task.complete(TaskOutcome::TestSuite(result), Utc::now());
        let scheduled = ScheduledOutcome {
            file: PathBuf::from("empty.json"),
            task: TaskStatusInfo::from(&task),
            outcome: task.result.clone(),
        };
        assert!(!scheduled.is_success());
    }
}
