//! ID generation utilities.

use uuid::Uuid;

use crate::error::{DomainError, DomainResult};

/// Generates a new UUID v7 as a string.
///
/// This is the identifier format for scheduler tasks. UUID v7 embeds a
/// timestamp, so identifiers sort by creation time.
#[must_use]
pub fn generate_id() -> String {
    Uuid::now_v7().to_string()
}

/// Checks that `id` is a well-formed UUID and returns it in canonical form.
///
/// # Errors
///
/// Returns [`DomainError::InvalidIdentifier`] if `id` is not a UUID.
pub fn parse_id(id: &str) -> DomainResult<String> {
    Uuid::parse_str(id.trim())
        .map(|uuid| uuid.to_string())
        .map_err(|e| DomainError::InvalidIdentifier(format!("{id}: {e}")))
}
