//! Apiprobe Infrastructure - Adapters and I/O
//!
//! This crate implements the application ports and everything that touches
//! the outside world:
//!
//! - [`adapters::ReqwestTransport`]: HTTP transport over reqwest
//! - [`adapters::SystemClock`] / [`adapters::ManualClock`]: clocks
//! - [`config`]: layered configuration loading
//! - [`suite_loader`]: JSON and YAML suite files
//! - [`report`]: result summaries and JSON reports

pub mod adapters;
pub mod config;
pub mod http;
pub mod report;
pub mod suite_loader;

pub use adapters::{ManualClock, ReqwestTransport, SystemClock};
pub use config::{AppConfig, ConfigError};
pub use report::{render_summary, write_report, ReportError};
pub use suite_loader::{load_suite, SuiteLoadError};
