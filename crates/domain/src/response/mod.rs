//! HTTP response types

mod captured;

pub use captured::CapturedResponse;
