//! HTTP request types

mod body;
mod method;
mod test_request;

pub use body::{FileAttachment, RequestBody};
pub use method::HttpMethod;
pub use test_request::TestRequest;
