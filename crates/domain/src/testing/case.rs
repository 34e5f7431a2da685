//! Abstract test-case descriptors and their mapping to concrete requests.
//!
//! Two input shapes are supported: [`TestCase`]/[`TestSuite`] as produced by
//! test generation (endpoint path + abstract assertion descriptors), and
//! [`RawTestCase`], a request-level wire shape for ad-hoc batches.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::assertion::value_as_text;
use super::{Assertion, AssertionKind};
use crate::error::{DomainError, DomainResult};
use crate::id::generate_id;
use crate::request::{FileAttachment, HttpMethod, RequestBody, TestRequest};

const fn default_status() -> u16 {
    200
}

fn default_method() -> String {
    "GET".to_string()
}

/// One abstract assertion as emitted by test generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseAssertion {
    /// Assertion type tag (e.g. `status_code`, `json_path`).
    pub assertion_type: String,
    /// Header name or JSON path for the kinds that need one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_path: Option<String>,
    /// Expected value.
    #[serde(default)]
    pub expected_value: Value,
    /// Optional operator; only `not_contains` is meaningful (body checks).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    /// Free-text description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CaseAssertion {
    /// Creates a descriptor with a type and an expected value.
    #[must_use]
    pub fn new(assertion_type: impl Into<String>, expected_value: Value) -> Self {
        Self {
            assertion_type: assertion_type.into(),
            field_path: None,
            expected_value,
            operator: None,
            description: None,
        }
    }

    /// Sets the field path.
    #[must_use]
    pub fn with_field_path(mut self, field_path: impl Into<String>) -> Self {
        self.field_path = Some(field_path.into());
        self
    }

    /// Sets the operator.
    #[must_use]
    pub fn with_operator(mut self, operator: impl Into<String>) -> Self {
        self.operator = Some(operator.into());
        self
    }

    /// Returns true if this descriptor checks the status code.
    #[must_use]
    pub fn is_status_check(&self) -> bool {
        self.assertion_type.trim() == "status_code"
    }

    /// Maps the descriptor to an unevaluated [`Assertion`].
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidAssertion`] for unknown types or an
    /// expected value of the wrong shape.
    pub fn to_assertion(&self) -> DomainResult<Assertion> {
        let tag = self.assertion_type.trim();
        let field = self
            .field_path
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty());
        let negated = self
            .operator
            .as_deref()
            .is_some_and(|op| op.trim().eq_ignore_ascii_case("not_contains"));

        let kind = match (tag, field) {
            ("response_body" | "body_contains", _) if negated => AssertionKind::BodyNotContains {
                text: value_as_text(&self.expected_value),
            },
            ("response_body", _) => AssertionKind::BodyContains {
                text: value_as_text(&self.expected_value),
            },
            ("header_exists", Some(name)) => AssertionKind::HeaderExists {
                name: name.to_string(),
            },
            ("header_value", Some(name)) => AssertionKind::HeaderValue {
                name: name.to_string(),
                expected: value_as_text(&self.expected_value),
            },
            ("json_path", Some(path)) => AssertionKind::JsonPath {
                path: path.to_string(),
                expected: self.expected_value.clone(),
            },
            _ => AssertionKind::from_tagged(tag, &self.expected_value)?,
        };
        Ok(Assertion::new(kind))
    }
}

/// An abstract test case: an endpoint, a method and what to expect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    /// Case identifier.
    #[serde(default = "generate_id")]
    pub id: String,
    /// Short title.
    #[serde(default)]
    pub title: String,
    /// Longer description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Path relative to the base URL (or an absolute URL).
    pub endpoint_path: String,
    /// HTTP method name; validated when the request is built.
    #[serde(default = "default_method")]
    pub http_method: String,
    /// Request headers.
    #[serde(default)]
    pub request_headers: BTreeMap<String, String>,
    /// Query parameters; non-string values are rendered as JSON text.
    #[serde(default)]
    pub request_params: BTreeMap<String, Value>,
    /// JSON request body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<Value>,
    /// Status code checked when no explicit `status_code` descriptor exists.
    #[serde(default = "default_status")]
    pub expected_status_code: u16,
    /// Abstract assertions.
    #[serde(default)]
    pub assertions: Vec<CaseAssertion>,
    /// Free-form tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

impl TestCase {
    /// Creates a case for `method path` expecting status 200.
    #[must_use]
    pub fn new(method: impl Into<String>, endpoint_path: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            title: String::new(),
            description: None,
            endpoint_path: endpoint_path.into(),
            http_method: method.into(),
            request_headers: BTreeMap::new(),
            request_params: BTreeMap::new(),
            request_body: None,
            expected_status_code: default_status(),
            assertions: Vec::new(),
            tags: Vec::new(),
        }
    }

    /// Sets the identifier.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Sets the expected status code.
    #[must_use]
    pub const fn expecting_status(mut self, status: u16) -> Self {
        self.expected_status_code = status;
        self
    }

    /// Adds an assertion descriptor.
    #[must_use]
    pub fn with_assertion(mut self, assertion: CaseAssertion) -> Self {
        self.assertions.push(assertion);
        self
    }

    /// Adds a request header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request_headers.insert(name.into(), value.into());
        self
    }

    /// Sets the JSON body.
    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.request_body = Some(body);
        self
    }

    /// Resolves the request URL against `base_url`.
    ///
    /// With a base, exactly one `/` separates base and path; an empty path or
    /// one starting with `?` or `#` is appended to the base as is. An absolute
    /// path ignores the base, and without a base the path is used verbatim.
    /// The result must be an absolute URL.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidUrl`] when the result does not parse.
    pub fn resolve_url(&self, base_url: Option<&str>) -> DomainResult<String> {
        let path = self.endpoint_path.trim();
        let joined = match base_url.map(str::trim).filter(|b| !b.is_empty()) {
            Some(base) if !is_absolute(path) => {
                let base = base.trim_end_matches('/');
                if path.is_empty() || path.starts_with(['?', '#']) {
                    format!("{base}{path}")
                } else {
                    format!("{base}/{}", path.trim_start_matches('/'))
                }
            }
            _ => path.to_string(),
        };
        url::Url::parse(&joined).map_err(|e| DomainError::InvalidUrl(format!("{joined}: {e}")))?;
        Ok(joined)
    }

    /// Builds the concrete request.
    ///
    /// `global_headers` are applied first so the case's own headers win.
    ///
    /// # Errors
    ///
    /// Returns an error for an unresolvable URL or an unknown method.
    pub fn to_request(
        &self,
        base_url: Option<&str>,
        global_headers: &BTreeMap<String, String>,
    ) -> DomainResult<TestRequest> {
        let url = self.resolve_url(base_url)?;
        let method: HttpMethod = self.http_method.parse()?;

        let mut request = TestRequest::new(method, url);
        for (name, value) in global_headers.iter().chain(&self.request_headers) {
            request.headers.retain(|existing, _| !existing.eq_ignore_ascii_case(name));
            request.headers.insert(name.clone(), value.clone());
        }
        for (key, value) in &self.request_params {
            request.query.insert(key.clone(), value_as_text(value));
        }
        if let Some(body) = self.request_body.as_ref().filter(|b| !b.is_null()) {
            request.body = RequestBody::Json(body.clone());
        }
        Ok(request)
    }

    /// Maps every descriptor to an assertion.
    ///
    /// A `status_code` check built from `expected_status_code` is placed
    /// first when no descriptor checks the status.
    ///
    /// # Errors
    ///
    /// Returns the first descriptor mapping error.
    pub fn to_assertions(&self) -> DomainResult<Vec<Assertion>> {
        let mut assertions = Vec::with_capacity(self.assertions.len() + 1);
        if !self.assertions.iter().any(CaseAssertion::is_status_check) {
            assertions.push(Assertion::status_code(self.expected_status_code));
        }
        for descriptor in &self.assertions {
            assertions.push(descriptor.to_assertion()?);
        }
        Ok(assertions)
    }

    /// A best-effort request used when the real one cannot be built.
    #[must_use]
    pub fn placeholder_request(&self) -> TestRequest {
        let method = self.http_method.parse().unwrap_or_default();
        TestRequest::new(method, self.endpoint_path.clone())
    }
}

fn is_absolute(path: &str) -> bool {
    path.starts_with("http://") || path.starts_with("https://")
}

/// A named, ordered collection of test cases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSuite {
    /// Suite identifier.
    #[serde(default = "generate_id")]
    pub id: String,
    /// Suite name.
    pub name: String,
    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Default base URL for every case.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Headers sent with every case (case headers override).
    #[serde(default)]
    pub global_headers: BTreeMap<String, String>,
    /// Cases in execution order.
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
}

impl TestSuite {
    /// Creates an empty suite.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            name: name.into(),
            description: None,
            base_url: None,
            global_headers: BTreeMap::new(),
            test_cases: Vec::new(),
        }
    }

    /// Sets the default base URL.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Appends a case.
    #[must_use]
    pub fn with_case(mut self, case: TestCase) -> Self {
        self.test_cases.push(case);
        self
    }

    /// Number of cases.
    #[must_use]
    pub fn len(&self) -> usize {
        self.test_cases.len()
    }

    /// Returns true if the suite has no cases.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.test_cases.is_empty()
    }
}

/// Request part of a [`RawTestCase`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRequest {
    /// Method name.
    #[serde(default = "default_method")]
    pub method: String,
    /// Absolute URL.
    pub url: String,
    /// Headers.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Query parameters.
    #[serde(default)]
    pub params: BTreeMap<String, Value>,
    /// JSON body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<Value>,
    /// Form fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<BTreeMap<String, Value>>,
    /// Files to upload: form field name to local path.
    #[serde(default)]
    pub files: BTreeMap<String, PathBuf>,
    /// Timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<f64>,
    /// Follow redirects (client default when absent).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_redirects: Option<bool>,
    /// Verify TLS (client default when absent).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify_ssl: Option<bool>,
}

/// Compact assertion form `{type, expected}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAssertion {
    /// Type tag.
    #[serde(rename = "type")]
    pub kind: String,
    /// Expected value.
    #[serde(default)]
    pub expected: Value,
}

/// A request-level case for ad-hoc batches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTestCase {
    /// Identifier; the batch assigns `test_<n>` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// The request.
    pub request: RawRequest,
    /// Assertions.
    #[serde(default)]
    pub assertions: Vec<RawAssertion>,
}

impl RawTestCase {
    /// Builds the request and the assertions.
    ///
    /// `follow_redirects` and `verify_ssl` are used where the case leaves
    /// them unset.
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown method, an invalid URL, a bad
    /// timeout or an unknown assertion.
    pub fn into_parts(
        self,
        follow_redirects: bool,
        verify_ssl: bool,
    ) -> DomainResult<(TestRequest, Vec<Assertion>)> {
        let raw = self.request;
        let method: HttpMethod = raw.method.parse()?;
        url::Url::parse(raw.url.trim())
            .map_err(|e| DomainError::InvalidUrl(format!("{}: {e}", raw.url)))?;

        let mut request = TestRequest::new(method, raw.url.trim()).with_transport_flags(
            raw.allow_redirects.unwrap_or(follow_redirects),
            raw.verify_ssl.unwrap_or(verify_ssl),
        );
        request.headers = raw.headers;
        request.query = raw
            .params
            .iter()
            .map(|(k, v)| (k.clone(), value_as_text(v)))
            .collect();
        request.body = match (raw.json, raw.data) {
            (Some(json), _) => RequestBody::Json(json),
            (None, Some(form)) => RequestBody::Form(
                form.iter()
                    .map(|(k, v)| (k.clone(), value_as_text(v)))
                    .collect(),
            ),
            (None, None) => RequestBody::None,
        };
        request.files = raw
            .files
            .into_iter()
            .map(|(field, path)| (field, FileAttachment::new(path)))
            .collect();
        if let Some(seconds) = raw.timeout {
            let timeout = Duration::try_from_secs_f64(seconds).map_err(|_| {
                DomainError::InvalidTestCase(format!("invalid timeout: {seconds}"))
            })?;
            request = request.with_timeout(timeout);
        }

        let assertions = self
            .assertions
            .iter()
            .map(|a| AssertionKind::from_tagged(&a.kind, &a.expected).map(Assertion::new))
            .collect::<DomainResult<Vec<_>>>()?;
        Ok((request, assertions))
    }
}
