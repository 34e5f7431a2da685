//! Assertion evaluator.
//!
//! Checks one captured response against assertions and writes the verdict,
//! the observed value and a message back into each assertion. Evaluation
//! never fails: malformed patterns or paths produce a failed assertion.

pub mod json_path;

use regex::Regex;
use serde_json::{json, Value};

use apiprobe_domain::{Assertion, AssertionKind, CapturedResponse};

const PREVIEW_LEN: usize = 100;

/// Outcome of one check before it is written back.
struct Verdict {
    passed: bool,
    actual: Option<Value>,
    message: String,
}

impl Verdict {
    fn pass(actual: Value, message: impl Into<String>) -> Self {
        Self {
            passed: true,
            actual: Some(actual),
            message: message.into(),
        }
    }

    fn fail(actual: Option<Value>, message: impl Into<String>) -> Self {
        Self {
            passed: false,
            actual,
            message: message.into(),
        }
    }

    fn from_check(passed: bool, actual: Value, message: String) -> Self {
        Self {
            passed,
            actual: Some(actual),
            message,
        }
    }
}

/// Evaluates one assertion against `response`, recording the outcome in place.
pub fn evaluate(response: &CapturedResponse, assertion: &mut Assertion) {
    let verdict = check(response, &assertion.kind);
    assertion.record(verdict.passed, verdict.actual, verdict.message);
}

/// Evaluates every assertion; a failing one never stops the rest.
pub fn evaluate_all(response: &CapturedResponse, assertions: &mut [Assertion]) {
    for assertion in assertions.iter_mut() {
        evaluate(response, assertion);
    }
}

/// Marks every assertion failed because no response was received.
pub fn mark_not_evaluated(assertions: &mut [Assertion], reason: &str) {
    for assertion in assertions.iter_mut() {
        assertion.record(false, None, format!("not evaluated: {reason}"));
    }
}

fn check(response: &CapturedResponse, kind: &AssertionKind) -> Verdict {
    match kind {
        AssertionKind::StatusCode { expected } => check_status_code(response, *expected),
        AssertionKind::ResponseTime { max_seconds } => check_response_time(response, *max_seconds),
        AssertionKind::ResponseSize { max_bytes } => check_response_size(response, *max_bytes),
        AssertionKind::HeaderExists { name } => check_header_exists(response, name),
        AssertionKind::HeaderValue { name, expected } => {
            check_header_value(response, name, expected)
        }
        AssertionKind::BodyContains { text } => check_body_contains(response, text, true),
        AssertionKind::BodyNotContains { text } => check_body_contains(response, text, false),
        AssertionKind::JsonPath { path, expected } => check_json_path(response, path, expected),
        AssertionKind::RegexMatch { pattern } => check_regex(response, pattern),
    }
}

fn check_status_code(response: &CapturedResponse, expected: u16) -> Verdict {
    let actual = response.status;
    Verdict::from_check(
        actual == expected,
        json!(actual),
        format!("Expected status {expected}, got {actual}"),
    )
}

fn check_response_time(response: &CapturedResponse, max_seconds: f64) -> Verdict {
    let actual = response.elapsed.as_secs_f64();
    Verdict::from_check(
        actual <= max_seconds,
        json!(actual),
        format!("Response took {actual:.3}s, expected <= {max_seconds}s"),
    )
}

fn check_response_size(response: &CapturedResponse, max_bytes: u64) -> Verdict {
    let actual = u64::try_from(response.size).unwrap_or(u64::MAX);
    Verdict::from_check(
        actual <= max_bytes,
        json!(actual),
        format!("Response size {actual} bytes, expected <= {max_bytes} bytes"),
    )
}

fn check_header_exists(response: &CapturedResponse, name: &str) -> Verdict {
    match response.header(name) {
        Some(value) => Verdict::pass(json!(value), format!("Header '{name}' is present")),
        None => Verdict::fail(None, format!("Header '{name}' not found")),
    }
}

fn check_header_value(response: &CapturedResponse, name: &str, expected: &str) -> Verdict {
    match response.header(name) {
        Some(actual) => Verdict::from_check(
            actual == expected,
            json!(actual),
            format!("Header '{name}': expected '{expected}', got '{actual}'"),
        ),
        None => Verdict::fail(
            None,
            format!("Header '{name}': expected '{expected}', got no header"),
        ),
    }
}

fn check_body_contains(response: &CapturedResponse, text: &str, should_contain: bool) -> Verdict {
    let contains = response.body.contains(text);
    let message = match (should_contain, contains) {
        (true, true) => format!("Body contains '{text}'"),
        (true, false) => format!("Body does not contain '{text}'"),
        (false, true) => format!("Body unexpectedly contains '{text}'"),
        (false, false) => format!("Body does not contain '{text}' as expected"),
    };
    Verdict::from_check(contains == should_contain, json!(preview(&response.body)), message)
}

fn check_json_path(response: &CapturedResponse, path: &str, expected: &Value) -> Verdict {
    let document = match response.json() {
        Ok(document) => document,
        Err(e) => {
            return Verdict::fail(
                None,
                format!("JSON path '{path}': expected {expected}, but the body is not JSON ({e})"),
            );
        }
    };

    match json_path::select_first(&document, path) {
        Ok(Some(actual)) => Verdict::from_check(
            json_equals(actual, expected),
            actual.clone(),
            format!("JSON path '{path}': expected {expected}, got {actual}"),
        ),
        Ok(None) => Verdict::fail(
            None,
            format!("JSON path '{path}': expected {expected}, got no match"),
        ),
        Err(e) => Verdict::fail(None, e.to_string()),
    }
}

fn check_regex(response: &CapturedResponse, pattern: &str) -> Verdict {
    match Regex::new(pattern) {
        Ok(regex) => {
            let found = regex.find(&response.body);
            match found {
                Some(m) => Verdict::pass(json!(m.as_str()), format!("Body matches /{pattern}/")),
                None => Verdict::fail(
                    Some(json!(preview(&response.body))),
                    format!("Body does not match /{pattern}/"),
                ),
            }
        }
        Err(e) => Verdict::fail(None, format!("Invalid regex pattern '{pattern}': {e}")),
    }
}

/// JSON equality, treating `1` and `1.0` as equal.
fn json_equals(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Number(a), Value::Number(b)) => {
            a == b
                || matches!(
                    (a.as_f64(), b.as_f64()),
                    (Some(x), Some(y)) if (x - y).abs() < f64::EPSILON
                )
        }
        _ => actual == expected,
    }
}

fn preview(body: &str) -> String {
    if body.chars().count() > PREVIEW_LEN {
        let head: String = body.chars().take(PREVIEW_LEN).collect();
        format!("{head}...")
    } else {
        body.to_string()
    }
}
