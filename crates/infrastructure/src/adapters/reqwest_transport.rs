//! HTTP transport implementation using reqwest.
//!
//! This adapter implements the `HttpTransport` port. It keeps one
//! `reqwest::Client` per combination of redirect and certificate policy so
//! connection pools are reused across requests.

use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::redirect::Policy;
use reqwest::{Client, Method, Url};
use tracing::debug;

use apiprobe_application::{HttpTransport, TransportError};
use apiprobe_domain::{CapturedResponse, HttpMethod, TestRequest};

use crate::http::{build_body, BodyBuildError, BuiltBody};

/// Maximum number of redirects followed when redirects are enabled.
pub const MAX_REDIRECTS: usize = 10;

const USER_AGENT: &str = concat!("apiprobe/", env!("CARGO_PKG_VERSION"));

/// HTTP transport backed by reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    /// Indexed by `client_index(verify_ssl, follow_redirects)`.
    clients: [Client; 4],
}

impl ReqwestTransport {
    /// Creates a transport with default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if a client cannot be created.
    pub fn new() -> Result<Self, TransportError> {
        let build = |verify_ssl: bool, follow_redirects: bool| {
            let policy = if follow_redirects {
                Policy::limited(MAX_REDIRECTS)
            } else {
                Policy::none()
            };
            Client::builder()
                .user_agent(USER_AGENT)
                .redirect(policy)
                .danger_accept_invalid_certs(!verify_ssl)
                .build()
                .map_err(|e| TransportError::Other(e.to_string()))
        };

        Ok(Self {
            clients: [
                build(false, false)?,
                build(false, true)?,
                build(true, false)?,
                build(true, true)?,
            ],
        })
    }

    const fn client_index(verify_ssl: bool, follow_redirects: bool) -> usize {
        match (verify_ssl, follow_redirects) {
            (false, false) => 0,
            (false, true) => 1,
            (true, false) => 2,
            (true, true) => 3,
        }
    }

    fn client_for(&self, request: &TestRequest) -> &Client {
        &self.clients[Self::client_index(request.verify_ssl, request.follow_redirects)]
    }

    /// Converts domain `HttpMethod` to reqwest `Method`.
    const fn to_reqwest_method(method: HttpMethod) -> Method {
        match method {
            HttpMethod::Get => Method::GET,
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Patch => Method::PATCH,
            HttpMethod::Delete => Method::DELETE,
            HttpMethod::Head => Method::HEAD,
            HttpMethod::Options => Method::OPTIONS,
        }
    }

    /// Parses the request URL and appends its query parameters.
    fn build_url(request: &TestRequest) -> Result<Url, TransportError> {
        let mut url = Url::parse(&request.url)
            .map_err(|e| TransportError::InvalidUrl(format!("{e}: {}", request.url)))?;
        if !request.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&request.query);
        }
        Ok(url)
    }

    fn map_body_error(error: BodyBuildError) -> TransportError {
        match error {
            BodyBuildError::FileRead { .. } => TransportError::Io(error.to_string()),
            BodyBuildError::InvalidMime { .. } | BodyBuildError::Serialization(_) => {
                TransportError::InvalidRequest(error.to_string())
            }
        }
    }

    /// Maps reqwest errors to transport errors, inspecting the source chain.
    fn map_error(error: &reqwest::Error, url: &Url, timeout: Duration) -> TransportError {
        if error.is_timeout() {
            return TransportError::Timeout {
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            };
        }
        if error.is_builder() {
            return TransportError::InvalidRequest(error.to_string());
        }

        let chain = error_chain(error);
        let lower = chain.to_lowercase();
        let host = url.host_str().unwrap_or("unknown").to_string();

        if error.is_connect() {
            if lower.contains("dns") || lower.contains("resolve") || lower.contains("lookup") {
                return TransportError::Dns {
                    host,
                    message: chain,
                };
            }
            if is_connection_refused(error) || lower.contains("refused") {
                let port = url.port_or_known_default().unwrap_or(80);
                return TransportError::ConnectionRefused {
                    host: format!("{host}:{port}"),
                };
            }
        }
        if lower.contains("certificate") || lower.contains("tls") || lower.contains("handshake") {
            return TransportError::Tls(chain);
        }
        if error.is_body() || error.is_decode() {
            return TransportError::Io(chain);
        }
        if error.is_redirect() {
            return TransportError::Other(format!(
                "redirect limit of {MAX_REDIRECTS} exceeded: {chain}"
            ));
        }
        TransportError::Other(chain)
    }
}

/// Joins the messages of `error` and all of its sources.
fn error_chain(error: &reqwest::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

fn is_connection_refused(error: &reqwest::Error) -> bool {
    let mut source = error.source();
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            if io.kind() == std::io::ErrorKind::ConnectionRefused {
                return true;
            }
        }
        source = cause.source();
    }
    false
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(
        &self,
        request: &TestRequest,
        timeout: Duration,
    ) -> Result<CapturedResponse, TransportError> {
        let url = Self::build_url(request)?;
        let body = build_body(request).await.map_err(Self::map_body_error)?;

        let mut builder = self
            .client_for(request)
            .request(Self::to_reqwest_method(request.method), url.clone())
            .timeout(timeout);

        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        if let Some(content_type) = body.content_type() {
            if request.header("content-type").is_none() {
                builder = builder.header("Content-Type", content_type);
            }
        }

        builder = match body {
            BuiltBody::None => builder,
            BuiltBody::Bytes { content, .. } => builder.body(content),
            BuiltBody::Multipart(form) => builder.multipart(form),
        };

        debug!(method = %request.method, url = %url, "Dispatching request");
        let start = Instant::now();

        let response = builder
            .send()
            .await
            .map_err(|e| Self::map_error(&e, &url, timeout))?;

        let status = response.status().as_u16();

        let mut headers: BTreeMap<String, String> = BTreeMap::new();
        for (name, value) in response.headers() {
            let value = value.to_str().unwrap_or("<binary>");
            headers
                .entry(name.as_str().to_string())
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(value);
                })
                .or_insert_with(|| value.to_string());
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Self::map_error(&e, &url, timeout))?;
        let elapsed = start.elapsed();

        Ok(CapturedResponse::new(status, headers, &body, elapsed))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_to_reqwest_method() {
        assert_eq!(
            ReqwestTransport::to_reqwest_method(HttpMethod::Get),
            Method::GET
        );
        assert_eq!(
            ReqwestTransport::to_reqwest_method(HttpMethod::Patch),
            Method::PATCH
        );
        assert_eq!(
            ReqwestTransport::to_reqwest_method(HttpMethod::Options),
            Method::OPTIONS
        );
    }

    #[test]
    fn test_client_index_is_unique() {
        let mut seen = [false; 4];
        for verify in [false, true] {
            for follow in [false, true] {
                let index = ReqwestTransport::client_index(verify, follow);
                assert!(!seen[index]);
                seen[index] = true;
            }
        }
    }

    #[test]
    fn test_build_url_appends_query() {
        let request = TestRequest::get("http://api.test/search?fixed=1")
            .with_query("q", "rust lang")
            .with_query("page", "2");
        let url = ReqwestTransport::build_url(&request).unwrap();
        assert_eq!(
            url.as_str(),
            "http://api.test/search?fixed=1&page=2&q=rust+lang"
        );
    }

    #[test]
    fn test_build_url_without_query_is_untouched() {
        let url = ReqwestTransport::build_url(&TestRequest::get("http://api.test/items")).unwrap();
        assert_eq!(url.as_str(), "http://api.test/items");
    }

    #[test]
    fn test_build_url_rejects_garbage() {
        assert!(matches!(
            ReqwestTransport::build_url(&TestRequest::get("not a url")),
            Err(TransportError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_client_creation() {
        assert!(ReqwestTransport::new().is_ok());
    }
}
