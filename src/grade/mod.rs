//! # Grading
//!
//! A submission is graded by running it once per fixture, each time followed
//! by that fixture's setup code, and comparing the trimmed console output
//! with the fixture's expected output.

/// The grading loop
mod harness;
/// Fixtures, per-fixture results and reports
mod results;

pub use harness::{GradeError, GradingHarness};
pub use results::{GradeReport, TestCase, TestRunResult};
