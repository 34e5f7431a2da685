//! HTTP test client.
//!
//! Sends one request per test case through an [`HttpTransport`] and runs
//! every assertion against the captured response.

use std::sync::Arc;

use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use apiprobe_domain::{
    Assertion, CapturedResponse, ExecutionConfig, RawTestCase, TestRequest, TestResult,
};

use crate::evaluator;
use crate::ports::{HttpTransport, TransportError};

/// Executes test requests and evaluates their assertions.
///
/// Cheap to clone: the transport is shared.
#[derive(Clone)]
pub struct TestHttpClient {
    transport: Arc<dyn HttpTransport>,
    config: ExecutionConfig,
}

impl std::fmt::Debug for TestHttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestHttpClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TestHttpClient {
    /// Creates a client over `transport`.
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>, config: ExecutionConfig) -> Self {
        Self { transport, config }
    }

    /// Returns the execution configuration.
    #[must_use]
    pub const fn config(&self) -> &ExecutionConfig {
        &self.config
    }

    /// Executes one request and evaluates `assertions` against the response.
    ///
    /// Non-2xx statuses are ordinary responses. The result is `error` when no
    /// response could be obtained, `passed` when every assertion holds and
    /// `failed` otherwise.
    pub async fn execute_test_case(
        &self,
        request: TestRequest,
        mut assertions: Vec<Assertion>,
        test_id: &str,
    ) -> TestResult {
        let result = TestResult::running(test_id, request);
        let start = Instant::now();

        match self.send_with_retries(&result.request, test_id).await {
            Ok(mut response) => {
                evaluator::evaluate_all(&response, &mut assertions);
                if self.config.verbose {
                    for assertion in &assertions {
                        debug!(
                            test_id,
                            kind = assertion.kind.tag(),
                            passed = assertion.is_passed(),
                            message = assertion.message.as_deref().unwrap_or_default(),
                            "Assertion evaluated"
                        );
                    }
                }
                if !self.config.save_responses {
                    response.discard_body();
                }
                let result = result.complete(response, assertions, start.elapsed());
                debug!(test_id, status = %result.status, "Test case finished");
                result
            }
            Err(e) => {
                let message = e.to_string();
                warn!(test_id, error = %message, "Request failed");
                evaluator::mark_not_evaluated(&mut assertions, &message);
                result.fail(message, assertions, start.elapsed())
            }
        }
    }

    /// Executes an ad-hoc batch of raw case documents, one after another.
    ///
    /// A document that cannot be parsed or built becomes an `error` result
    /// and the batch continues. Cases without an `id` are named `test_<n>`
    /// (1-based position).
    pub async fn execute_test_suite(&self, raw_cases: Vec<Value>) -> Vec<TestResult> {
        let mut results = Vec::with_capacity(raw_cases.len());
        for (index, raw) in raw_cases.into_iter().enumerate() {
            let fallback_id = format!("test_{}", index + 1);
            let test_id = raw
                .get("id")
                .and_then(Value::as_str)
                .map_or_else(|| fallback_id.clone(), str::to_string);
            let placeholder_url = raw
                .pointer("/request/url")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();

            let parts = serde_json::from_value::<RawTestCase>(raw)
                .map_err(|e| e.to_string())
                .and_then(|case| {
                    case.into_parts(self.config.follow_redirects, self.config.verify_ssl)
                        .map_err(|e| e.to_string())
                });

            let result = match parts {
                Ok((request, assertions)) => {
                    self.execute_test_case(request, assertions, &test_id).await
                }
                Err(message) => {
                    warn!(test_id, error = %message, "Skipping malformed test case");
                    TestResult::error(test_id, TestRequest::get(placeholder_url), message)
                }
            };
            results.push(result);
        }
        info!(total = results.len(), "Batch finished");
        results
    }

    async fn send_with_retries(
        &self,
        request: &TestRequest,
        test_id: &str,
    ) -> Result<CapturedResponse, TransportError> {
        let timeout = request.timeout().unwrap_or_else(|| self.config.request_timeout());
        let mut attempt = 0;
        loop {
            if self.config.verbose {
                debug!(
                    test_id,
                    method = %request.method,
                    url = %request.url,
                    attempt,
                    "Sending request"
                );
            }
            match self.transport.send(request, timeout).await {
                Ok(response) => return Ok(response),
                Err(e) if attempt < self.config.max_retries => {
                    attempt += 1;
                    warn!(test_id, attempt, error = %e, "Transport failure, retrying");
                    tokio::time::sleep(self.config.retry_delay()).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
