//! Scheduler tasks and their status snapshots.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::generate_id;
use crate::testing::{TestCase, TestResult, TestSuite, TestSuiteExecutionResult};

/// Lifecycle state of a task.
///
/// `pending → running → completed | error | cancelled`, and
/// `pending → cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Queued, not yet picked up.
    #[default]
    Pending,
    /// Executing on a worker.
    Running,
    /// Finished and a result is stored.
    Completed,
    /// Could not be queued or executed.
    Error,
    /// Cancelled by the caller.
    Cancelled,
}

impl TaskStatus {
    /// Returns true for states that never change again.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error | Self::Cancelled)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Task priority; higher runs first when priority ordering is enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskPriority(pub i32);

impl TaskPriority {
    /// 10
    pub const HIGH: Self = Self(10);
    /// 5
    pub const NORMAL: Self = Self(5);
    /// 1
    pub const LOW: Self = Self(1);
}

impl Default for TaskPriority {
    fn default() -> Self {
        Self::NORMAL
    }
}

impl From<i32> for TaskPriority {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

/// What a task executes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum TaskPayload {
    /// A single case.
    TestCase(TestCase),
    /// A whole suite.
    TestSuite(TestSuite),
}

impl TaskPayload {
    /// Short label used in logs.
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::TestCase(case) if !case.title.is_empty() => &case.title,
            Self::TestCase(case) => &case.id,
            Self::TestSuite(suite) => &suite.name,
        }
    }
}

/// What a completed task produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "result", rename_all = "snake_case")]
pub enum TaskOutcome {
    /// Result of a single case.
    TestCase(TestResult),
    /// Result of a suite.
    TestSuite(TestSuiteExecutionResult),
}

impl TaskOutcome {
    /// Returns true when every executed case passed.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        match self {
            Self::TestCase(result) => result.is_passed(),
            Self::TestSuite(result) => result.all_passed(),
        }
    }
}

/// A unit of scheduled work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Task identifier (UUID v7).
    pub id: String,
    /// What to execute.
    pub payload: TaskPayload,
    /// Base URL passed to the runner.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Priority.
    #[serde(default)]
    pub priority: TaskPriority,
    /// Earliest start time; immediate when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Current state.
    pub status: TaskStatus,
    /// Result, once completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<TaskOutcome>,
    /// Error description for `error` tasks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Submission time.
    pub created_at: DateTime<Utc>,
    /// When a worker picked the task up.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// When the task reached a terminal state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Creates a pending task with a fresh identifier.
    #[must_use]
    pub fn new(
        payload: TaskPayload,
        base_url: Option<String>,
        priority: TaskPriority,
        scheduled_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: generate_id(),
            payload,
            base_url,
            priority,
            scheduled_at,
            status: TaskStatus::Pending,
            result: None,
            error: None,
            created_at: now,
            started_at: None,
            completed_at: None,
        }
    }

    /// Returns true if the task may start at `now`.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.scheduled_at.is_none_or(|at| at <= now)
    }

    /// Moves to `running`.
    pub fn mark_running(&mut self, now: DateTime<Utc>) {
        self.status = TaskStatus::Running;
        self.started_at = Some(now);
    }

    /// Moves to `completed` with a result.
    pub fn complete(&mut self, outcome: TaskOutcome, now: DateTime<Utc>) {
        self.status = TaskStatus::Completed;
        self.result = Some(outcome);
        self.completed_at = Some(now);
    }

    /// Moves to `error`.
    pub fn fail(&mut self, message: impl Into<String>, now: DateTime<Utc>) {
        self.status = TaskStatus::Error;
        self.error = Some(message.into());
        self.completed_at = Some(now);
    }

    /// Moves to `cancelled`.
    pub fn cancel(&mut self, now: DateTime<Utc>) {
        self.status = TaskStatus::Cancelled;
        self.completed_at = Some(now);
    }

    /// Returns true once the task can no longer change.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// A lightweight status snapshot of a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStatusInfo {
    /// Task identifier.
    pub task_id: String,
    /// Current state.
    pub status: TaskStatus,
    /// Priority.
    pub priority: TaskPriority,
    /// Suite name or case id.
    pub label: String,
    /// Submission time.
    pub created_at: DateTime<Utc>,
    /// Earliest start time.
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Start time.
    pub started_at: Option<DateTime<Utc>>,
    /// Completion time.
    pub completed_at: Option<DateTime<Utc>>,
    /// Error description.
    pub error: Option<String>,
    /// Whether a result is available.
    pub has_result: bool,
}

impl From<&Task> for TaskStatusInfo {
    fn from(task: &Task) -> Self {
        Self {
            task_id: task.id.clone(),
            status: task.status,
            priority: task.priority,
            label: task.payload.label().to_string(),
            created_at: task.created_at,
            scheduled_at: task.scheduled_at,
            started_at: task.started_at,
            completed_at: task.completed_at,
            error: task.error.clone(),
            has_result: task.result.is_some(),
        }
    }
}

/// Scheduler-wide counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatus {
    /// Entries waiting in the queue.
    pub queue_size: usize,
    /// Queue capacity; `0` means unbounded.
    pub max_queue_size: usize,
    /// Tasks known to the scheduler.
    pub total_tasks: usize,
    /// Tasks currently running.
    pub running_tasks: usize,
    /// Tasks still pending.
    pub pending_tasks: usize,
    /// Worker pool size.
    pub worker_threads: usize,
    /// Whether the dispatch loop is running.
    pub is_running: bool,
}
