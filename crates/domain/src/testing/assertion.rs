//! Declarative assertions checked against a captured response.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DomainError, DomainResult};

/// The check an assertion performs, together with its expected value.
///
/// The set is closed: every variant has exactly one evaluation rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssertionKind {
    /// Status code equals `expected`.
    StatusCode {
        /// Expected status code.
        expected: u16,
    },
    /// Elapsed time is at most `max_seconds`.
    ResponseTime {
        /// Upper bound in seconds (inclusive).
        max_seconds: f64,
    },
    /// Raw body length is at most `max_bytes`.
    ResponseSize {
        /// Upper bound in bytes (inclusive).
        max_bytes: u64,
    },
    /// A header is present (case-insensitive name).
    HeaderExists {
        /// Header name.
        name: String,
    },
    /// A header is present and its value equals `expected`.
    HeaderValue {
        /// Header name (case-insensitive).
        name: String,
        /// Expected header value.
        expected: String,
    },
    /// The raw body contains `text`.
    BodyContains {
        /// Substring to look for.
        text: String,
    },
    /// The raw body does not contain `text`.
    BodyNotContains {
        /// Substring that must be absent.
        text: String,
    },
    /// The first match of `path` in the JSON body equals `expected`.
    JsonPath {
        /// JSON path expression (e.g. `$.data.items[0].id`).
        path: String,
        /// Expected JSON value.
        expected: Value,
    },
    /// `pattern` matches somewhere in the raw body.
    RegexMatch {
        /// Regular expression.
        pattern: String,
    },
}

impl AssertionKind {
    /// Returns the snake_case type tag.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::StatusCode { .. } => "status_code",
            Self::ResponseTime { .. } => "response_time",
            Self::ResponseSize { .. } => "response_size",
            Self::HeaderExists { .. } => "header_exists",
            Self::HeaderValue { .. } => "header_value",
            Self::BodyContains { .. } => "body_contains",
            Self::BodyNotContains { .. } => "body_not_contains",
            Self::JsonPath { .. } => "json_path",
            Self::RegexMatch { .. } => "regex_match",
        }
    }

    /// Returns a human-readable description of this check.
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::StatusCode { expected } => format!("Status code = {expected}"),
            Self::ResponseTime { max_seconds } => format!("Response time <= {max_seconds}s"),
            Self::ResponseSize { max_bytes } => format!("Response size <= {max_bytes} bytes"),
            Self::HeaderExists { name } => format!("Header '{name}' exists"),
            Self::HeaderValue { name, expected } => {
                format!("Header '{name}' equals '{expected}'")
            }
            Self::BodyContains { text } => format!("Body contains '{text}'"),
            Self::BodyNotContains { text } => format!("Body does not contain '{text}'"),
            Self::JsonPath { path, expected } => format!("JSON {path} equals {expected}"),
            Self::RegexMatch { pattern } => format!("Body matches /{pattern}/"),
        }
    }

    /// Parses the compact `{type, expected}` wire form.
    ///
    /// Pair-valued kinds (`header_value`, `json_path`) accept either a
    /// two-element array `[name, value]` or an object
    /// `{"name"|"path": .., "value": ..}`.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidAssertion`] for unknown tags or
    /// expected values of the wrong shape.
    pub fn from_tagged(tag: &str, expected: &Value) -> DomainResult<Self> {
        let tag = tag.trim();
        match tag {
            "status_code" => Ok(Self::StatusCode {
                expected: expect_status(tag, expected)?,
            }),
            "response_time" => Ok(Self::ResponseTime {
                max_seconds: expect_number(tag, expected)?,
            }),
            "response_size" => Ok(Self::ResponseSize {
                max_bytes: expected.as_u64().ok_or_else(|| {
                    DomainError::invalid_assertion(
                        tag,
                        format!("expected a byte count, got {expected}"),
                    )
                })?,
            }),
            "header_exists" => Ok(Self::HeaderExists {
                name: expect_text(tag, expected)?,
            }),
            "header_value" => {
                let (name, value) = expect_pair(tag, expected, "name")?;
                Ok(Self::HeaderValue {
                    name: expect_text(tag, &name)?,
                    expected: value_as_text(&value),
                })
            }
            "body_contains" => Ok(Self::BodyContains {
                text: value_as_text(expected),
            }),
            "body_not_contains" => Ok(Self::BodyNotContains {
                text: value_as_text(expected),
            }),
            "json_path" => {
                let (path, value) = expect_pair(tag, expected, "path")?;
                Ok(Self::JsonPath {
                    path: expect_text(tag, &path)?,
                    expected: value,
                })
            }
            "regex_match" => Ok(Self::RegexMatch {
                pattern: expect_text(tag, expected)?,
            }),
            other => Err(DomainError::invalid_assertion(other, "unknown assertion type")),
        }
    }
}

/// One assertion together with its evaluation outcome.
///
/// Created unevaluated by the caller; the evaluator fills in `actual`,
/// `passed` and `message` exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assertion {
    /// What is checked.
    #[serde(flatten)]
    pub kind: AssertionKind,
    /// Value observed in the response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<Value>,
    /// Verdict; `None` until evaluated.
    #[serde(default)]
    pub passed: Option<bool>,
    /// Human-readable outcome.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl Assertion {
    /// Creates an unevaluated assertion.
    #[must_use]
    pub const fn new(kind: AssertionKind) -> Self {
        Self {
            kind,
            actual: None,
            passed: None,
            message: None,
        }
    }

    /// Status code equals `expected`.
    #[must_use]
    pub const fn status_code(expected: u16) -> Self {
        Self::new(AssertionKind::StatusCode { expected })
    }

    /// Body contains `text`.
    #[must_use]
    pub fn body_contains(text: impl Into<String>) -> Self {
        Self::new(AssertionKind::BodyContains { text: text.into() })
    }

    /// Header `name` equals `expected`.
    #[must_use]
    pub fn header_value(name: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::new(AssertionKind::HeaderValue {
            name: name.into(),
            expected: expected.into(),
        })
    }

    /// First match of `path` equals `expected`.
    #[must_use]
    pub fn json_path(path: impl Into<String>, expected: Value) -> Self {
        Self::new(AssertionKind::JsonPath {
            path: path.into(),
            expected,
        })
    }

    /// Records the evaluation outcome.
    pub fn record(&mut self, passed: bool, actual: Option<Value>, message: impl Into<String>) {
        self.passed = Some(passed);
        self.actual = actual;
        self.message = Some(message.into());
    }

    /// Returns true only if evaluated and passed.
    #[must_use]
    pub fn is_passed(&self) -> bool {
        self.passed == Some(true)
    }

    /// Returns true once a verdict has been recorded.
    #[must_use]
    pub const fn is_evaluated(&self) -> bool {
        self.passed.is_some()
    }
}

impl From<AssertionKind> for Assertion {
    fn from(kind: AssertionKind) -> Self {
        Self::new(kind)
    }
}

fn expect_status(tag: &str, value: &Value) -> DomainResult<u16> {
    let code = match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    code.and_then(|c| u16::try_from(c).ok())
        .ok_or_else(|| {
            DomainError::invalid_assertion(tag, format!("expected a status code, got {value}"))
        })
}

fn expect_number(tag: &str, value: &Value) -> DomainResult<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    number
        .filter(|n| n.is_finite() && *n >= 0.0)
        .ok_or_else(|| {
            DomainError::invalid_assertion(
                tag,
                format!("expected a non-negative number, got {value}"),
            )
        })
}

fn expect_text(tag: &str, value: &Value) -> DomainResult<String> {
    match value {
        Value::String(s) if !s.is_empty() => Ok(s.clone()),
        _ => Err(DomainError::invalid_assertion(
            tag,
            format!("expected a non-empty string, got {value}"),
        )),
    }
}

fn expect_pair(tag: &str, value: &Value, key: &str) -> DomainResult<(Value, Value)> {
    match value {
        Value::Array(items) if items.len() == 2 => Ok((items[0].clone(), items[1].clone())),
        Value::Object(map) => match (map.get(key), map.get("value")) {
            (Some(first), Some(second)) => Ok((first.clone(), second.clone())),
            _ => Err(DomainError::invalid_assertion(
                tag,
                format!("expected an object with '{key}' and 'value'"),
            )),
        },
        _ => Err(DomainError::invalid_assertion(
            tag,
            format!("expected a [{key}, value] pair, got {value}"),
        )),
    }
}

/// Renders a JSON value as plain text: strings unquoted, everything else as JSON.
#[must_use]
pub fn value_as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
