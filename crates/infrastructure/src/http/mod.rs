//! HTTP infrastructure utilities.
//!
//! Request body encoding (JSON, url-encoded forms, multipart uploads) for
//! the reqwest transport.

mod body_builder;

pub use body_builder::{build_body, BodyBuildError, BuiltBody};
