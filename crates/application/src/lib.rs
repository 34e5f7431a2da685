//! Apiprobe Application - Use cases and ports
//!
//! This crate contains the execution engine: the assertion evaluator, the
//! HTTP test client, the test runner and the task scheduler. It depends on
//! the outside world only through the port traits in [`ports`].

pub mod client;
pub mod error;
pub mod evaluator;
pub mod ports;
pub mod runner;
pub mod scheduler;

#[cfg(test)]
mod test_support;

pub use client::TestHttpClient;
pub use error::{SchedulerError, SchedulerResult};
pub use ports::{Clock, HttpTransport, TransportError};
pub use runner::TestRunner;
pub use scheduler::{TaskCallback, TaskScheduler};
