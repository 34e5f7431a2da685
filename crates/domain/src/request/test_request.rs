//! The concrete HTTP request issued for one test case.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{FileAttachment, HttpMethod, RequestBody};

/// A fully resolved HTTP request for one test case.
///
/// Built once before execution and never modified afterwards; the
/// [`TestResult`](crate::testing::TestResult) that carries it owns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestRequest {
    /// HTTP method.
    pub method: HttpMethod,
    /// Absolute request URL (without the query parameters below).
    pub url: String,
    /// Request headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Query parameters appended to the URL.
    #[serde(default)]
    pub query: BTreeMap<String, String>,
    /// Request body.
    #[serde(default)]
    pub body: RequestBody,
    /// File attachments keyed by form field name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub files: BTreeMap<String, FileAttachment>,
    /// Per-request timeout; the client default applies when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
    /// Whether redirects are followed.
    #[serde(default = "default_true")]
    pub follow_redirects: bool,
    /// Whether TLS certificates are verified.
    #[serde(default = "default_true")]
    pub verify_ssl: bool,
}

const fn default_true() -> bool {
    true
}

impl TestRequest {
    /// Creates a request with no headers, query or body.
    #[must_use]
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: BTreeMap::new(),
            query: BTreeMap::new(),
            body: RequestBody::None,
            files: BTreeMap::new(),
            timeout_ms: None,
            follow_redirects: true,
            verify_ssl: true,
        }
    }

    /// Creates a GET request.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    /// Adds a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Adds a query parameter.
    #[must_use]
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    /// Attaches a file under the given form field.
    #[must_use]
    pub fn with_file(mut self, field: impl Into<String>, file: FileAttachment) -> Self {
        self.files.insert(field.into(), file);
        self
    }

    /// Sets the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = Some(u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// Sets redirect following and TLS verification.
    #[must_use]
    pub const fn with_transport_flags(mut self, follow_redirects: bool, verify_ssl: bool) -> Self {
        self.follow_redirects = follow_redirects;
        self.verify_ssl = verify_ssl;
        self
    }

    /// Returns the per-request timeout, if set.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Returns a header value by name (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}
