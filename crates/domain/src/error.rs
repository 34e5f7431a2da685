//! Domain error types

use thiserror::Error;

/// Domain-level errors that can occur during validation or processing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The provided URL is invalid or malformed.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The HTTP method is not supported.
    #[error("unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    /// An assertion descriptor could not be mapped to a known assertion.
    #[error("invalid assertion '{kind}': {reason}")]
    InvalidAssertion {
        /// The assertion type tag as received.
        kind: String,
        /// Why the descriptor was rejected.
        reason: String,
    },

    /// A test case descriptor is malformed.
    #[error("invalid test case: {0}")]
    InvalidTestCase(String),

    /// An identifier is invalid or empty.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl DomainError {
    /// Creates an [`DomainError::InvalidAssertion`].
    pub fn invalid_assertion(kind: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAssertion {
            kind: kind.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
