//! Execution and scheduling configuration.
//!
//! Both structs deserialize from partial documents: every missing field
//! takes its default. Durations are stored as integer milliseconds.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// How test cases and suites are executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Upper bound on cases in flight within one suite. `0` and `1` both
    /// mean sequential execution.
    pub max_concurrent_tests: usize,
    /// Default timeout for one HTTP exchange.
    pub request_timeout_ms: u64,
    /// Timeout for one whole case, retries included.
    pub test_timeout_ms: u64,
    /// Optional deadline for a whole suite.
    pub suite_timeout_ms: Option<u64>,
    /// Retries after a transport failure.
    pub max_retries: u32,
    /// Pause between retries.
    pub retry_delay_ms: u64,
    /// Default TLS verification.
    pub verify_ssl: bool,
    /// Default redirect following.
    pub follow_redirects: bool,
    /// Log every request and assertion outcome.
    pub verbose: bool,
    /// Keep response bodies in results.
    pub save_responses: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_concurrent_tests: 5,
            request_timeout_ms: 30_000,
            test_timeout_ms: 60_000,
            suite_timeout_ms: None,
            max_retries: 0,
            retry_delay_ms: 1_000,
            verify_ssl: true,
            follow_redirects: true,
            verbose: false,
            save_responses: true,
        }
    }
}

impl ExecutionConfig {
    /// Default request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Per-case timeout.
    #[must_use]
    pub const fn test_timeout(&self) -> Duration {
        Duration::from_millis(self.test_timeout_ms)
    }

    /// Per-suite deadline, if any.
    #[must_use]
    pub fn suite_timeout(&self) -> Option<Duration> {
        self.suite_timeout_ms.map(Duration::from_millis)
    }

    /// Delay between retries.
    #[must_use]
    pub const fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// Returns true when suites run one case at a time.
    #[must_use]
    pub const fn is_sequential(&self) -> bool {
        self.max_concurrent_tests <= 1
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidConfig`] for zero timeouts.
    pub fn validate(&self) -> DomainResult<()> {
        if self.request_timeout_ms == 0 {
            return Err(DomainError::InvalidConfig(
                "request_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.test_timeout_ms == 0 {
            return Err(DomainError::InvalidConfig(
                "test_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.suite_timeout_ms == Some(0) {
            return Err(DomainError::InvalidConfig(
                "suite_timeout_ms must be greater than zero when set".to_string(),
            ));
        }
        Ok(())
    }
}

/// How the scheduler queues and dispatches tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskScheduleConfig {
    /// Order the queue by priority (higher first) instead of pure FIFO.
    pub enable_priority: bool,
    /// Queue capacity; `0` means unbounded.
    pub max_queue_size: usize,
    /// Number of tasks executed at the same time.
    pub worker_threads: usize,
    /// How long the dispatch loop sleeps when only delayed tasks are queued.
    pub poll_interval_ms: u64,
}

impl Default for TaskScheduleConfig {
    fn default() -> Self {
        Self {
            enable_priority: false,
            max_queue_size: 100,
            worker_threads: 3,
            poll_interval_ms: 100,
        }
    }
}

impl TaskScheduleConfig {
    /// Dispatch poll interval.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidConfig`] when there are no workers or
    /// the poll interval is zero.
    pub fn validate(&self) -> DomainResult<()> {
        if self.worker_threads == 0 {
            return Err(DomainError::InvalidConfig(
                "worker_threads must be at least 1".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(DomainError::InvalidConfig(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
