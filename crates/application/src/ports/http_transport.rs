//! HTTP transport port
//!
//! Defines the single outbound exchange the test client performs per case.

use std::time::Duration;

use async_trait::async_trait;
use apiprobe_domain::{CapturedResponse, TestRequest};

/// Errors raised when no HTTP response could be obtained.
///
/// A response with any status code is never an error at this level.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The exchange did not finish in time.
    #[error("request timed out after {timeout_ms}ms")]
    Timeout {
        /// The timeout that was applied.
        timeout_ms: u64,
    },

    /// The target refused the connection.
    #[error("connection refused by {host}")]
    ConnectionRefused {
        /// Target host (and port when known).
        host: String,
    },

    /// Host name resolution failed.
    #[error("DNS lookup failed for {host}: {message}")]
    Dns {
        /// Host that could not be resolved.
        host: String,
        /// Resolver message.
        message: String,
    },

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// The URL could not be used.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The request could not be built (bad header, unreadable file, ...).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Connection or body I/O failed.
    #[error("I/O error: {0}")]
    Io(String),

    /// Any other failure.
    #[error("{0}")]
    Other(String),
}

impl TransportError {
    /// Returns true for timeouts.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Port for sending one test request.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Sends `request` and captures the full response.
    ///
    /// `timeout` applies when the request carries no timeout of its own.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when no response was received.
    async fn send(
        &self,
        request: &TestRequest,
        timeout: Duration,
    ) -> Result<CapturedResponse, TransportError>;
}
