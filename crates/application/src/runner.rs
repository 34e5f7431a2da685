//! Test runner.
//!
//! Resolves abstract test cases into requests, delegates them to the
//! [`TestHttpClient`] and aggregates suite results, either sequentially or
//! over a bounded set of concurrent workers.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::{AbortHandle, JoinError};
use tokio::time::{timeout, timeout_at, Instant};
use tracing::{debug, info, warn};

use apiprobe_domain::{
    ExecutionConfig, TestCase, TestResult, TestSuite, TestSuiteExecutionResult,
};

use crate::client::TestHttpClient;

/// Aborts the wrapped task when dropped.
pub(crate) struct AbortOnDrop(pub(crate) AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Executes test cases and suites.
///
/// Cheap to clone; clones share the underlying transport.
#[derive(Debug, Clone)]
pub struct TestRunner {
    client: TestHttpClient,
}

impl TestRunner {
    /// Creates a runner over `client`.
    #[must_use]
    pub const fn new(client: TestHttpClient) -> Self {
        Self { client }
    }

    /// Returns the execution configuration.
    #[must_use]
    pub const fn config(&self) -> &ExecutionConfig {
        self.client.config()
    }

    /// Returns the underlying client.
    #[must_use]
    pub const fn client(&self) -> &TestHttpClient {
        &self.client
    }

    /// Executes one case.
    ///
    /// The request URL is `base_url` joined with the case's endpoint path, or
    /// the path itself when no base is given. Any failure to build the
    /// request becomes an `error` result, and so does a panic while the case
    /// runs.
    pub async fn execute_test_case(&self, case: &TestCase, base_url: Option<&str>) -> TestResult {
        self.run_isolated(case, base_url, Arc::new(BTreeMap::new()), None).await
    }

    /// Executes every case of `suite`.
    ///
    /// `base_url` overrides the suite's own base URL. Results keep the
    /// suite's case order whatever the concurrency.
    pub async fn execute_test_suite(
        &self,
        suite: &TestSuite,
        base_url: Option<&str>,
    ) -> TestSuiteExecutionResult {
        let base_url = base_url.or(suite.base_url.as_deref());
        let config = self.config();
        let started = Instant::now();
        let deadline = config.suite_timeout().map(|limit| started + limit);
        let mut execution = TestSuiteExecutionResult::start(&suite.id, &suite.name);

        info!(
            suite = %suite.name,
            cases = suite.len(),
            max_concurrent = config.max_concurrent_tests,
            "Executing test suite"
        );

        let results = if config.is_sequential() || suite.len() <= 1 {
            if config.max_concurrent_tests == 0 {
                warn!(suite = %suite.name, "max_concurrent_tests is 0, running sequentially");
            }
            self.run_sequential(suite, base_url, deadline).await
        } else {
            self.run_concurrent(suite, base_url, deadline).await
        };

        for result in results {
            execution.add_test_result(result);
        }
        execution.finish(started.elapsed());

        let counts = execution.counts();
        info!(
            suite = %suite.name,
            total = counts.total,
            passed = counts.passed,
            failed = counts.failed,
            error = counts.error,
            skipped = counts.skipped,
            success_rate = execution.success_rate(),
            "Test suite finished"
        );
        execution
    }

    async fn run_sequential(
        &self,
        suite: &TestSuite,
        base_url: Option<&str>,
        deadline: Option<Instant>,
    ) -> Vec<TestResult> {
        let headers = Arc::new(suite.global_headers.clone());
        let mut results = Vec::with_capacity(suite.len());
        for case in &suite.test_cases {
            results.push(self.run_isolated(case, base_url, Arc::clone(&headers), deadline).await);
        }
        results
    }

    async fn run_concurrent(
        &self,
        suite: &TestSuite,
        base_url: Option<&str>,
        deadline: Option<Instant>,
    ) -> Vec<TestResult> {
        let permits = Arc::new(Semaphore::new(self.config().max_concurrent_tests));
        let base_url = base_url.map(str::to_string);
        let headers = Arc::new(suite.global_headers.clone());

        let handles: Vec<_> = suite
            .test_cases
            .iter()
            .map(|case| {
                let runner = self.clone();
                let case = case.clone();
                let base_url = base_url.clone();
                let headers = Arc::clone(&headers);
                let permits = Arc::clone(&permits);
                tokio::spawn(async move {
                    let Ok(_permit) = permits.acquire_owned().await else {
                        return TestResult::error(
                            &case.id,
                            case.placeholder_request(),
                            "worker pool closed",
                        );
                    };
                    runner
                        .run_within_deadline(&case, base_url.as_deref(), &headers, deadline)
                        .await
                })
            })
            .collect();
        let _guards: Vec<_> = handles
            .iter()
            .map(|handle| AbortOnDrop(handle.abort_handle()))
            .collect();

        let mut results = Vec::with_capacity(handles.len());
        for (case, handle) in suite.test_cases.iter().zip(handles) {
            results.push(Self::joined(case, handle.await));
        }
        results
    }

    /// Runs one case on its own task so a panic becomes an `error` result.
    async fn run_isolated(
        &self,
        case: &TestCase,
        base_url: Option<&str>,
        global_headers: Arc<BTreeMap<String, String>>,
        deadline: Option<Instant>,
    ) -> TestResult {
        let runner = self.clone();
        let owned = case.clone();
        let base_url = base_url.map(str::to_string);
        let handle = tokio::spawn(async move {
            runner
                .run_within_deadline(&owned, base_url.as_deref(), &global_headers, deadline)
                .await
        });
        let _guard = AbortOnDrop(handle.abort_handle());
        Self::joined(case, handle.await)
    }

    fn joined(case: &TestCase, outcome: Result<TestResult, JoinError>) -> TestResult {
        match outcome {
            Ok(result) => result,
            Err(e) => {
                warn!(test_id = %case.id, error = %e, "Test worker failed");
                TestResult::error(
                    &case.id,
                    case.placeholder_request(),
                    format!("worker failed: {e}"),
                )
            }
        }
    }

    async fn run_within_deadline(
        &self,
        case: &TestCase,
        base_url: Option<&str>,
        global_headers: &BTreeMap<String, String>,
        deadline: Option<Instant>,
    ) -> TestResult {
        let Some(deadline) = deadline else {
            return self.run_case(case, base_url, global_headers).await;
        };
        if Instant::now() >= deadline {
            debug!(test_id = %case.id, "Suite deadline passed, skipping");
            return TestResult::skipped(
                &case.id,
                case.placeholder_request(),
                "suite timed out before the test started",
            );
        }
        match timeout_at(deadline, self.run_case(case, base_url, global_headers)).await {
            Ok(result) => result,
            Err(_) => {
                warn!(test_id = %case.id, "Suite deadline reached while test was running");
                TestResult::error(&case.id, case.placeholder_request(), "suite timed out")
            }
        }
    }

    async fn run_case(
        &self,
        case: &TestCase,
        base_url: Option<&str>,
        global_headers: &BTreeMap<String, String>,
    ) -> TestResult {
        let config = self.config();
        let request = match case.to_request(base_url, global_headers) {
            Ok(request) => request.with_transport_flags(config.follow_redirects, config.verify_ssl),
            Err(e) => {
                warn!(test_id = %case.id, error = %e, "Could not build request");
                return TestResult::error(&case.id, case.placeholder_request(), e.to_string());
            }
        };
        let assertions = match case.to_assertions() {
            Ok(assertions) => assertions,
            Err(e) => {
                warn!(test_id = %case.id, error = %e, "Could not map assertions");
                return TestResult::error(&case.id, request, e.to_string());
            }
        };

        let limit = config.test_timeout();
        let pending = self.client.execute_test_case(request.clone(), assertions, &case.id);
        match timeout(limit, pending).await {
            Ok(result) => result,
            Err(_) => {
                warn!(test_id = %case.id, timeout = ?limit, "Test timed out");
                TestResult::error(&case.id, request, "test timed out")
            }
        }
    }
}
