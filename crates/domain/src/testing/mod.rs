//! Test cases, assertions and execution results.

mod assertion;
mod case;
mod result;

pub use assertion::{value_as_text, Assertion, AssertionKind};
pub use case::{CaseAssertion, RawAssertion, RawRequest, RawTestCase, TestCase, TestSuite};
pub use result::{SuiteCounts, TestResult, TestStatus, TestSuiteExecutionResult};
