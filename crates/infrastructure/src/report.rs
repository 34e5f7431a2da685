//! Result reports.
//!
//! Suite results are written as pretty JSON with 2-space indentation and a
//! trailing newline so saved reports diff cleanly.

use std::fmt::Write as _;
use std::io;
use std::path::Path;

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

use apiprobe_domain::{TestStatus, TestSuiteExecutionResult};

/// Error type for report output.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// JSON serialization failed.
    #[error("JSON serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// UTF-8 encoding error.
    #[error("UTF-8 encoding error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Serializes a value to pretty JSON with a trailing newline.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_json_pretty<T: Serialize>(value: &T) -> Result<String, ReportError> {
    let mut buffer = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"  ");
    let mut serializer = Serializer::with_formatter(&mut buffer, formatter);
    value.serialize(&mut serializer)?;

    let mut json = String::from_utf8(buffer)?;
    json.push('\n');
    Ok(json)
}

/// Writes a suite result to `path` as JSON.
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub async fn write_report(
    path: &Path,
    result: &TestSuiteExecutionResult,
) -> Result<(), ReportError> {
    let json = to_json_pretty(result)?;
    tokio::fs::write(path, json).await?;
    Ok(())
}

/// Renders a plain-text summary: one line per case, then the totals.
#[must_use]
pub fn render_summary(result: &TestSuiteExecutionResult) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Suite: {}", result.suite_name());

    for test in result.test_results() {
        let marker = match test.status {
            TestStatus::Passed => "PASS",
            TestStatus::Failed => "FAIL",
            TestStatus::Skipped => "SKIP",
            TestStatus::Error | TestStatus::Pending | TestStatus::Running => "ERR ",
        };
        let _ = write!(
            out,
            "  [{marker}] {} {} {}",
            test.test_id, test.request.method, test.request.url
        );
        if let Some(error) = &test.error_message {
            let _ = write!(out, " ({error})");
        }
        out.push('\n');

        for assertion in test.assertions.iter().filter(|a| !a.is_passed()) {
            if let Some(message) = &assertion.message {
                let _ = writeln!(out, "         - {message}");
            }
        }
    }

    let counts = result.counts();
    let _ = writeln!(
        out,
        "Total: {}  Passed: {}  Failed: {}  Errors: {}  Skipped: {}  ({:.1}%) in {} ms",
        counts.total,
        counts.passed,
        counts.failed,
        counts.error,
        counts.skipped,
        result.success_rate(),
        result.total_duration().as_millis()
    );
    out
}
