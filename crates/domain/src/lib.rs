//! Apiprobe Domain - Core business types
//!
//! This crate defines the domain model for the apiprobe test execution
//! engine: requests, captured responses, assertions, results, test-case
//! descriptors, configuration and scheduler tasks.
//! All types here are pure Rust with no I/O dependencies.

pub mod config;
pub mod error;
pub mod id;
pub mod request;
pub mod response;
pub mod serde_util;
pub mod task;
pub mod testing;

pub use config::{ExecutionConfig, TaskScheduleConfig};
pub use error::{DomainError, DomainResult};
pub use id::{generate_id, parse_id};
pub use request::{FileAttachment, HttpMethod, RequestBody, TestRequest};
pub use response::CapturedResponse;
pub use task::{
    QueueStatus, Task, TaskOutcome, TaskPayload, TaskPriority, TaskStatus, TaskStatusInfo,
};
pub use testing::{
    Assertion, AssertionKind, CaseAssertion, RawAssertion, RawRequest, RawTestCase, SuiteCounts,
    TestCase, TestResult, TestStatus, TestSuite, TestSuiteExecutionResult,
};
