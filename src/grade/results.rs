#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::fmt::Write as _;

use bon::Builder;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use similar::{Algorithm, ChangeTag, utils::diff_unicode_words};
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Panel, Style, Width, object::Rows},
};

use crate::sandbox::{ExecutionError, ExecutionResult};

/// Longest output shown per cell in the overview table.
const TABLE_PREVIEW_CHARS: usize = 60;

/// A single fixture: code appended to the submission, and the output it must
/// print.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Builder)]
#[builder(on(String, into))]
pub struct TestCase {
    /// What the fixture checks, shown in feedback
    #[serde(default)]
    pub description:     String,
    /// Code run after the submission, typically a call that prints
    #[serde(alias = "input")]
    pub setup:           String,
    /// Expected console output, compared after trimming
    #[serde(alias = "expectedOutput")]
    pub expected_output: String,
}

impl TestCase {
    /// Creates a fixture.
    pub fn new(
        description: impl Into<String>,
        setup: impl Into<String>,
        expected_output: impl Into<String>,
    ) -> Self {
        Self {
            description:     description.into(),
            setup:           setup.into(),
            expected_output: expected_output.into(),
        }
    }
}

/// Outcome of one fixture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestRunResult {
    /// The fixture that was run
    pub test_case:     TestCase,
    /// Whether the run succeeded and printed the expected output
    pub passed:        bool,
    /// Trimmed console output of the run
    pub actual_output: String,
    /// The run's failure, if it had one
    pub error:         Option<ExecutionError>,
}

impl TestRunResult {
    /// Judges `execution` against `test_case`.
    pub fn from_execution(test_case: TestCase, execution: &ExecutionResult) -> Self {
        let actual_output = execution.output().trim().to_string();
        let passed =
            execution.success() && actual_output == test_case.expected_output.trim();

        Self {
            test_case,
            passed,
            actual_output,
            error: execution.error().cloned(),
        }
    }

    /// Word-level diff of expected against actual output. Missing words are
    /// red in the expected line, extra words green in the actual line.
    pub fn diff(&self) -> String {
        let expected = self.test_case.expected_output.trim();
        let mut colored_expected = String::new();
        let mut colored_actual = String::new();

        for (change, value) in diff_unicode_words(Algorithm::Patience, expected, &self.actual_output)
        {
            match change {
                ChangeTag::Equal => {
                    colored_expected.push_str(value);
                    colored_actual.push_str(value);
                }
                ChangeTag::Delete => colored_expected.push_str(&value.red().to_string()),
                ChangeTag::Insert => colored_actual.push_str(&value.green().to_string()),
            }
        }

        format!("Expected:\n{colored_expected}\nActual:\n{colored_actual}")
    }
}

/// Row of the overview table.
#[derive(Tabled)]
struct ReportRow {
    /// fixture description
    #[tabled(rename = "Test")]
    test:     String,
    /// pass mark
    #[tabled(rename = "Result")]
    result:   String,
    /// expected output preview
    #[tabled(rename = "Expected")]
    expected: String,
    /// actual output or error preview
    #[tabled(rename = "Actual")]
    actual:   String,
}

/// Results of grading one submission against a list of fixtures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GradeReport {
    /// One entry per fixture, in authored order
    pub results:    Vec<TestRunResult>,
    /// True when every fixture passed; vacuously true with no fixtures
    pub all_passed: bool,
}

impl GradeReport {
    /// Builds a report from per-fixture results.
    pub fn new(results: Vec<TestRunResult>) -> Self {
        let all_passed = results.iter().all(|r| r.passed);
        Self {
            results,
            all_passed,
        }
    }

    /// Number of fixtures that passed.
    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.passed).count()
    }

    /// Number of fixtures run.
    pub fn total(&self) -> usize {
        self.results.len()
    }

    /// True when there was nothing to grade.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Percentage of passed fixtures, rounded down. Zero for an empty
    /// report.
    pub fn score_percent(&self) -> u32 {
        if self.is_empty() {
            return 0;
        }
        (self.passed_count() * 100 / self.total()) as u32
    }

    /// Fixtures that failed.
    pub fn failures(&self) -> impl Iterator<Item = &TestRunResult> {
        self.results.iter().filter(|r| !r.passed)
    }

    /// Plain-text feedback: a mark per fixture and, for failures, expected
    /// and actual output.
    pub fn summary(&self) -> String {
        let mut out = String::from("Test Results:\n\n");

        for result in &self.results {
            let mark = if result.passed { "✓" } else { "✗" };
            let _ = writeln!(out, "{mark} {}", result.test_case.description);
            if !result.passed {
                let _ = writeln!(out, "  Expected: {}", result.test_case.expected_output.trim());
                let _ = writeln!(out, "  Got: {}", result.actual_output);
                if let Some(error) = &result.error {
                    let _ = writeln!(out, "  Error: {error}");
                }
            }
        }

        let _ = write!(out, "\n{}/{} passed", self.passed_count(), self.total());
        out
    }

    /// Overview table of every fixture.
    pub fn table(&self) -> String {
        let rows = self.results.iter().map(|r| ReportRow {
            test:     r.test_case.description.clone(),
            result:   if r.passed { "pass" } else { "fail" }.to_string(),
            expected: preview(r.test_case.expected_output.trim()),
            actual:   match &r.error {
                Some(error) if r.actual_output.is_empty() => preview(&error.to_string()),
                _ => preview(&r.actual_output),
            },
        });

        Table::new(rows)
            .with(Panel::header("Grading Overview"))
            .with(Panel::footer(format!(
                "Score: {}% ({}/{})",
                self.score_percent(),
                self.passed_count(),
                self.total()
            )))
            .with(Modify::new(Rows::new(1..)).with(Width::wrap(24).keep_words(true)))
            .with(
                Modify::new(Rows::first())
                    .with(Alignment::center())
                    .with(Alignment::center_vertical()),
            )
            .with(
                Modify::new(Rows::last())
                    .with(Alignment::center())
                    .with(Alignment::center_vertical()),
            )
            .with(Style::modern())
            .to_string()
    }
}

/// Shortens `text` for a table cell.
fn preview(text: &str) -> String {
    if text.is_empty() {
        return "[empty]".to_string();
    }
    let mut head: String = text.chars().take(TABLE_PREVIEW_CHARS).collect();
    if text.chars().count() > TABLE_PREVIEW_CHARS {
        head.push('…');
    }
    head
}
