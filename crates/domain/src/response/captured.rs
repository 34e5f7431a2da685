//! Captured HTTP response
//!
//! Holds everything the assertion evaluator needs from one HTTP exchange:
//! status, headers, body text, body size and elapsed time.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::serde_util::duration_millis;

/// A response captured from the target service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CapturedResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers. Repeated headers are joined with `", "`.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Response body decoded as UTF-8 (lossy).
    #[serde(default)]
    pub body: String,
    /// Size of the raw body in bytes.
    #[serde(default)]
    pub size: usize,
    /// Time from sending the request to receiving the full body.
    #[serde(rename = "elapsed_ms", with = "duration_millis")]
    pub elapsed: Duration,
}

impl CapturedResponse {
    /// Creates a response from raw parts.
    #[must_use]
    pub fn new(
        status: u16,
        headers: BTreeMap<String, String>,
        body: &[u8],
        elapsed: Duration,
    ) -> Self {
        Self {
            status,
            headers,
            body: String::from_utf8_lossy(body).into_owned(),
            size: body.len(),
            elapsed,
        }
    }

    /// Creates a response with a text body and no headers.
    #[must_use]
    pub fn text(status: u16, body: &str, elapsed: Duration) -> Self {
        Self::new(status, BTreeMap::new(), body.as_bytes(), elapsed)
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Gets a header value by name (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Attempts to parse the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns the parser error when the body is not valid JSON.
    pub fn json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_str(&self.body)
    }

    /// Returns true for 2xx statuses.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }

    /// Drops the body text while keeping its recorded size.
    pub fn discard_body(&mut self) {
        self.body.clear();
    }
}
