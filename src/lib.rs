//! # tsgrade
//!
//! Runs and grades student-written JavaScript and TypeScript.
//!
//! A submission goes through three stages:
//!
//! 1. [`typescript`] erases TypeScript syntax, leaving plain JavaScript.
//! 2. [`sandbox`] runs the JavaScript in a fresh, bounded QuickJS context and
//!    captures what it prints.
//! 3. [`grade`] runs the submission once per fixture and compares output.
//!
//! [`score`] then turns grading reports into lesson scores, XP and streaks.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Configuration: sandbox limits and score policy
pub mod config;
/// Grading submissions against fixtures
pub mod grade;
/// Isolated JavaScript execution
pub mod sandbox;
/// Lesson scores and aggregate progress
pub mod score;
/// Source units and languages
pub mod types;
/// TypeScript to JavaScript erasure
pub mod typescript;

pub use config::{Config, SandboxLimits, ScorePolicy};
pub use grade::{GradeError, GradeReport, GradingHarness, TestCase, TestRunResult};
pub use sandbox::{CancelHandle, ErrorKind, ExecutionError, ExecutionResult, Sandbox};
pub use score::{AggregateProgress, JsonFileStore, LessonScore, MemoryStore, ScoreStore, StoreError};
pub use types::{Language, SourceUnit};

/// Runs `code` once without grading, erasing TypeScript syntax first when
/// present. Uses the process-wide limits.
pub fn run_code(code: &str) -> ExecutionResult {
    let unit = SourceUnit::detect(code);
    Sandbox::from_env().execute(&unit.to_javascript())
}

/// Grades `code` against `test_cases` with the process-wide limits.
pub fn grade_submission(code: &str, test_cases: &[TestCase]) -> Result<GradeReport, GradeError> {
    GradingHarness::from_env().grade(code, test_cases)
}
