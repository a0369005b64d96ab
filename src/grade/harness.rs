#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use bon::Builder;

use super::results::{GradeReport, TestCase, TestRunResult};
use crate::{
    sandbox::{ErrorKind, ExecutionResult, Sandbox},
    typescript,
};

/// Grading stopped because the sandbox itself failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GradeError {
    /// The sandbox could not be built or driven while running a fixture.
    #[error("sandbox unavailable while running test case {index} ({description}): {message}")]
    Host {
        /// zero-based position of the fixture
        index:       usize,
        /// the fixture's description
        description: String,
        /// the host error reported by the sandbox
        message:     String,
    },
}

/// Runs a submission against a list of fixtures.
///
/// Each fixture gets its own sandbox run of the submission followed by the
/// fixture's setup code, so fixtures cannot see each other's state.
#[derive(Debug, Clone, Default, Builder)]
pub struct GradingHarness {
    /// Sandbox every fixture runs in
    #[builder(default)]
    sandbox:           Sandbox,
    /// Erase TypeScript syntax even when the submission doesn't look typed
    #[builder(default)]
    assume_typescript: bool,
}

impl GradingHarness {
    /// A harness using the process-wide sandbox limits.
    pub fn from_env() -> Self {
        Self::builder().sandbox(Sandbox::from_env()).build()
    }

    /// Returns the sandbox fixtures run in.
    pub fn sandbox(&self) -> &Sandbox {
        &self.sandbox
    }

    /// Turns the submission into JavaScript, once per grading call.
    fn prepare(&self, student_code: &str) -> String {
        if self.assume_typescript {
            typescript::erase(student_code)
        } else {
            typescript::transpile(student_code)
        }
    }

    /// Builds the unit run for one fixture.
    fn unit(student_js: &str, test_case: &TestCase) -> String {
        format!("{student_js}\n{}", typescript::transpile(&test_case.setup))
    }

    /// Grades `student_code` against every fixture, in order. Failing
    /// fixtures don't stop the run; only a sandbox host error does.
    pub fn grade(
        &self,
        student_code: &str,
        test_cases: &[TestCase],
    ) -> Result<GradeReport, GradeError> {
        let student_js = self.prepare(student_code);
        let mut results = Vec::with_capacity(test_cases.len());

        for (index, test_case) in test_cases.iter().enumerate() {
            let execution = self.sandbox.execute(&Self::unit(&student_js, test_case));
            results.push(judge(index, test_case, &execution)?);
        }

        Ok(finish(results))
    }

    /// Like [`GradingHarness::grade`], with each fixture run on tokio's
    /// blocking pool. Dropping the future cancels the fixture in flight.
    pub async fn grade_async(
        &self,
        student_code: &str,
        test_cases: &[TestCase],
    ) -> Result<GradeReport, GradeError> {
        let student_js = self.prepare(student_code);
        let mut results = Vec::with_capacity(test_cases.len());

        for (index, test_case) in test_cases.iter().enumerate() {
            let execution = self
                .sandbox
                .execute_async(Self::unit(&student_js, test_case))
                .await;
            results.push(judge(index, test_case, &execution)?);
        }

        Ok(finish(results))
    }
}

/// Scores one execution, turning host errors into a [`GradeError`].
fn judge(
    index: usize,
    test_case: &TestCase,
    execution: &ExecutionResult,
) -> Result<TestRunResult, GradeError> {
    if let Some(error) = execution.error().filter(|e| e.kind == ErrorKind::HostError) {
        tracing::warn!("Aborting grading at test case {index}: {error}");
        return Err(GradeError::Host {
            index,
            description: test_case.description.clone(),
            message: error.message.clone(),
        });
    }

    Ok(TestRunResult::from_execution(test_case.clone(), execution))
}

/// Wraps up a report and logs its totals.
fn finish(results: Vec<TestRunResult>) -> GradeReport {
    let report = GradeReport::new(results);
    tracing::info!(
        passed = report.passed_count(),
        total = report.total(),
        "Graded submission"
    );
    report
}
