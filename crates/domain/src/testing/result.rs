//! Execution results for single test cases and whole suites.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use super::Assertion;
use crate::request::TestRequest;
use crate::response::CapturedResponse;
use crate::serde_util::duration_millis;

/// Status of one executed test case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    /// Not started.
    #[default]
    Pending,
    /// In flight.
    Running,
    /// Response received and every assertion passed.
    Passed,
    /// Response received but at least one assertion failed.
    Failed,
    /// The exchange itself failed, or the case could not be built.
    Error,
    /// Never started (e.g. the suite deadline passed first).
    Skipped,
}

impl TestStatus {
    /// Returns true for the final states.
    #[must_use]
    pub const fn is_final(self) -> bool {
        !matches!(self, Self::Pending | Self::Running)
    }

    /// Returns the lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Error => "error",
            Self::Skipped => "skipped",
        }
    }
}

impl std::fmt::Display for TestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of executing one test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    /// Identifier of the executed test case.
    pub test_id: String,
    /// Current status.
    pub status: TestStatus,
    /// The request that was (or would have been) sent.
    pub request: TestRequest,
    /// The captured response, absent on transport errors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<CapturedResponse>,
    /// Evaluated assertions, in declaration order.
    #[serde(default)]
    pub assertions: Vec<Assertion>,
    /// Wall-clock execution time.
    #[serde(rename = "duration_ms", with = "duration_millis")]
    pub duration: Duration,
    /// Error description for `error` and `skipped` results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// When execution started.
    pub started_at: DateTime<Utc>,
    /// When the result was finalized.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl TestResult {
    /// Creates a running result for `request`.
    #[must_use]
    pub fn running(test_id: impl Into<String>, request: TestRequest) -> Self {
        Self {
            test_id: test_id.into(),
            status: TestStatus::Running,
            request,
            response: None,
            assertions: Vec::new(),
            duration: Duration::ZERO,
            error_message: None,
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Finalizes with a received response.
    ///
    /// The status is `passed` iff every assertion passed.
    #[must_use]
    pub fn complete(
        mut self,
        response: CapturedResponse,
        assertions: Vec<Assertion>,
        duration: Duration,
    ) -> Self {
        self.status = if assertions.iter().all(Assertion::is_passed) {
            TestStatus::Passed
        } else {
            TestStatus::Failed
        };
        self.response = Some(response);
        self.assertions = assertions;
        self.finish(duration);
        self
    }

    /// Finalizes as `error`.
    #[must_use]
    pub fn fail(
        mut self,
        message: impl Into<String>,
        assertions: Vec<Assertion>,
        duration: Duration,
    ) -> Self {
        self.status = TestStatus::Error;
        self.error_message = Some(message.into());
        self.assertions = assertions;
        self.finish(duration);
        self
    }

    /// Creates a finished `error` result without executing anything.
    #[must_use]
    pub fn error(
        test_id: impl Into<String>,
        request: TestRequest,
        message: impl Into<String>,
    ) -> Self {
        Self::running(test_id, request).fail(message, Vec::new(), Duration::ZERO)
    }

    /// Creates a finished `skipped` result.
    #[must_use]
    pub fn skipped(
        test_id: impl Into<String>,
        request: TestRequest,
        reason: impl Into<String>,
    ) -> Self {
        let mut result = Self::running(test_id, request);
        result.status = TestStatus::Skipped;
        result.error_message = Some(reason.into());
        result.finish(Duration::ZERO);
        result
    }

    fn finish(&mut self, duration: Duration) {
        self.duration = duration;
        self.completed_at = Some(Utc::now());
    }

    /// Returns true if the case passed.
    #[must_use]
    pub fn is_passed(&self) -> bool {
        self.status == TestStatus::Passed
    }

    /// Number of assertions that passed.
    #[must_use]
    pub fn passed_assertions(&self) -> usize {
        self.assertions.iter().filter(|a| a.is_passed()).count()
    }

    /// Number of assertions that did not pass.
    #[must_use]
    pub fn failed_assertions(&self) -> usize {
        self.assertions.len() - self.passed_assertions()
    }
}

/// Per-status counts derived from a list of results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SuiteCounts {
    /// Number of results.
    pub total: usize,
    /// `passed` results.
    pub passed: usize,
    /// `failed` results.
    pub failed: usize,
    /// `error` results.
    pub error: usize,
    /// `skipped` results.
    pub skipped: usize,
}

impl SuiteCounts {
    /// Counts results by status.
    #[must_use]
    pub fn from_results(results: &[TestResult]) -> Self {
        results.iter().fold(
            Self {
                total: results.len(),
                ..Self::default()
            },
            |mut counts, result| {
                match result.status {
                    TestStatus::Passed => counts.passed += 1,
                    TestStatus::Failed => counts.failed += 1,
                    TestStatus::Skipped => counts.skipped += 1,
                    // unfinished results cannot be counted as anything else
                    TestStatus::Error | TestStatus::Pending | TestStatus::Running => {
                        counts.error += 1;
                    }
                }
                counts
            },
        )
    }

    /// Passed results as a percentage of the total; 0 for an empty suite.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.passed as f64 / self.total as f64) * 100.0
        }
    }
}

/// The outcome of executing a whole suite.
///
/// Counts are never stored: they are derived from `test_results` on every
/// access, so they cannot drift from the list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TestSuiteExecutionResult {
    suite_id: String,
    suite_name: String,
    test_results: Vec<TestResult>,
    started_at: DateTime<Utc>,
    #[serde(default)]
    completed_at: Option<DateTime<Utc>>,
    #[serde(rename = "total_duration_ms", with = "duration_millis")]
    total_duration: Duration,
}

impl TestSuiteExecutionResult {
    /// Starts an empty result for the given suite.
    #[must_use]
    pub fn start(suite_id: impl Into<String>, suite_name: impl Into<String>) -> Self {
        Self {
            suite_id: suite_id.into(),
            suite_name: suite_name.into(),
            test_results: Vec::new(),
            started_at: Utc::now(),
            completed_at: None,
            total_duration: Duration::ZERO,
        }
    }

    /// Appends one result.
    pub fn add_test_result(&mut self, result: TestResult) {
        self.test_results.push(result);
    }

    /// Marks the suite finished.
    pub fn finish(&mut self, total_duration: Duration) {
        self.total_duration = total_duration;
        self.completed_at = Some(Utc::now());
    }

    /// Suite identifier.
    #[must_use]
    pub fn suite_id(&self) -> &str {
        &self.suite_id
    }

    /// Suite name.
    #[must_use]
    pub fn suite_name(&self) -> &str {
        &self.suite_name
    }

    /// Results in submission order.
    #[must_use]
    pub fn test_results(&self) -> &[TestResult] {
        &self.test_results
    }

    /// Consumes the suite result, returning the per-case results.
    #[must_use]
    pub fn into_test_results(self) -> Vec<TestResult> {
        self.test_results
    }

    /// Counts derived from the result list.
    #[must_use]
    pub fn counts(&self) -> SuiteCounts {
        SuiteCounts::from_results(&self.test_results)
    }

    /// Number of results.
    #[must_use]
    pub fn total(&self) -> usize {
        self.test_results.len()
    }

    /// Passed percentage (0–100).
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        self.counts().success_rate()
    }

    /// True when the suite has results and all of them passed.
    #[must_use]
    pub fn all_passed(&self) -> bool {
        !self.test_results.is_empty() && self.test_results.iter().all(TestResult::is_passed)
    }

    /// When execution started.
    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// When execution finished.
    #[must_use]
    pub const fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Total wall-clock duration.
    #[must_use]
    pub const fn total_duration(&self) -> Duration {
        self.total_duration
    }
}

impl Serialize for TestSuiteExecutionResult {
    #[allow(clippy::cast_possible_truncation)]
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let counts = self.counts();
        let mut state = serializer.serialize_struct("TestSuiteExecutionResult", 12)?;
        state.serialize_field("suite_id", &self.suite_id)?;
        state.serialize_field("suite_name", &self.suite_name)?;
        state.serialize_field("test_results", &self.test_results)?;
        state.serialize_field("total_tests", &counts.total)?;
        state.serialize_field("passed_tests", &counts.passed)?;
        state.serialize_field("failed_tests", &counts.failed)?;
        state.serialize_field("error_tests", &counts.error)?;
        state.serialize_field("skipped_tests", &counts.skipped)?;
        state.serialize_field("success_rate", &counts.success_rate())?;
        state.serialize_field("started_at", &self.started_at)?;
        state.serialize_field("completed_at", &self.completed_at)?;
        state.serialize_field("total_duration_ms", &(self.total_duration.as_millis() as u64))?;
        state.end()
    }
}
