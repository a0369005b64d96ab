//! Tests for grading submissions against fixtures.

use std::{path::PathBuf, time::Duration};

use tsgrade::{
    ErrorKind, GradeReport, GradingHarness, Sandbox, SandboxLimits, TestCase, grade_submission,
};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join("lessons")
        .join(name)
}

fn load_cases(name: &str) -> Vec<TestCase> {
    let raw = std::fs::read_to_string(fixture(name)).expect("read fixture");
    serde_json::from_str(&raw).expect("parse fixture")
}

fn add_case() -> TestCase {
    TestCase::new("adds", "console.log(add(2,3));", "5")
}

fn grade(code: &str, cases: &[TestCase]) -> GradeReport {
    GradingHarness::default().grade(code, cases).expect("grade")
}

#[test]
fn correct_submission_passes() {
    let report = grade("function add(a,b){return a+b;}", &[add_case()]);
    assert!(report.all_passed);
    assert!(report.results[0].passed);
    assert_eq!(report.results[0].actual_output, "5");
}

#[test]
fn wrong_submission_fails_with_actual_output() {
    let report = grade("function add(a,b){return a-b;}", &[add_case()]);
    assert!(!report.all_passed);
    assert!(!report.results[0].passed);
    assert_eq!(report.results[0].actual_output, "-1");
    assert!(report.results[0].error.is_none());
}

#[test]
fn typed_submission_is_erased_before_grading() {
    let cases = load_cases("greet.json");
    let report = grade(
        "function greet(name: string): string { return 'Hi, ' + name; }",
        &cases,
    );
    assert!(report.all_passed, "{}", report.summary());
    assert_eq!(report.results[0].actual_output, "Hi, Al");
}

#[test]
fn lesson_files_accept_input_and_expected_output_keys() {
    let cases = load_cases("add-numbers.json");
    assert_eq!(cases.len(), 3);
    assert_eq!(cases[0].setup, "console.log(add(2, 3));");
    assert_eq!(cases[1].expected_output, "-3");
}

#[test]
fn every_fixture_runs_in_authored_order() {
    let cases = load_cases("add-numbers.json");
    let report = grade("function add(a, b) { return Math.abs(a) + b; }", &cases);

    let passed: Vec<bool> = report.results.iter().map(|r| r.passed).collect();
    assert_eq!(passed, vec![true, false, true]);
    assert_eq!(report.results[1].actual_output, "5");
    assert_eq!(report.passed_count(), 2);
    assert_eq!(report.total(), 3);
    assert_eq!(report.score_percent(), 66);
    assert_eq!(report.failures().count(), 1);
}

#[test]
fn fixtures_do_not_share_state() {
    let cases = vec![
        TestCase::new("first", "counter++; console.log(counter);", "1"),
        TestCase::new("second", "counter++; console.log(counter);", "1"),
    ];
    let report = grade("var counter = 0;", &cases);
    assert!(report.all_passed, "{}", report.summary());
}

#[test]
fn output_is_compared_trimmed() {
    let cases = vec![TestCase::new("padded", "console.log('  ok  ');", "\nok\n")];
    assert!(grade("", &cases).all_passed);
}

#[test]
fn runtime_errors_fail_only_their_fixture() {
    let cases = vec![
        TestCase::new("throws", "console.log(add(1, 1)); boom();", "2"),
        add_case(),
    ];
    let report = grade("function add(a,b){return a+b;}", &cases);

    assert!(!report.results[0].passed);
    assert_eq!(report.results[0].actual_output, "2");
    assert_eq!(
        report.results[0].error.as_ref().map(|e| e.kind),
        Some(ErrorKind::RuntimeError)
    );
    assert!(report.results[1].passed);
}

#[test]
fn timeouts_fail_only_their_fixture() {
    let harness = GradingHarness::builder()
        .sandbox(Sandbox::new(
            SandboxLimits::default().with_timeout(Duration::from_millis(200)),
        ))
        .build();
    let cases = vec![TestCase::new("spins", "while (true) {}", ""), add_case()];
    let report = harness
        .grade("function add(a,b){return a+b;}", &cases)
        .expect("grade");

    assert_eq!(
        report.results[0].error.as_ref().map(|e| e.kind),
        Some(ErrorKind::Timeout)
    );
    assert!(!report.results[0].passed);
    assert!(report.results[1].passed);
}

#[test]
fn compile_errors_fail_every_fixture() {
    let report = grade("function add(a,b){return a+b;", &[add_case(), add_case()]);
    assert_eq!(report.passed_count(), 0);
    for result in &report.results {
        assert_eq!(
            result.error.as_ref().map(|e| e.kind),
            Some(ErrorKind::CompileError)
        );
    }
}

#[test]
fn empty_fixture_list_is_vacuously_passed() {
    let report = grade("function add(a,b){return a+b;}", &[]);
    assert!(report.all_passed);
    assert!(report.is_empty());
    assert_eq!(report.score_percent(), 0);
}

#[test]
fn grading_is_deterministic() {
    let cases = load_cases("add-numbers.json");
    let code = "function add(a, b) { return a * b; }";
    assert_eq!(grade(code, &cases), grade(code, &cases));
}

#[test]
fn typescript_can_be_forced() {
    let harness = GradingHarness::builder().assume_typescript(true).build();
    let report = harness
        .grade("function add(a, b) { return a + b; }", &[add_case()])
        .expect("grade");
    assert!(report.all_passed);
}

#[test]
fn summary_shows_expected_and_actual_for_failures() {
    let report = grade(
        "function add(a,b){return a-b;}",
        &[add_case(), TestCase::new("prints hi", "console.log('hi');", "hi")],
    );
    let summary = report.summary();
    assert!(summary.starts_with("Test Results:"));
    assert!(summary.contains("✗ adds\n  Expected: 5\n  Got: -1\n"), "{summary}");
    assert!(summary.contains("✓ prints hi"), "{summary}");
    assert!(summary.ends_with("1/2 passed"), "{summary}");
}

#[test]
fn table_and_diff_render() {
    let report = grade("function add(a,b){return a-b;}", &[add_case()]);
    let table = report.table();
    assert!(table.contains("Grading Overview"));
    assert!(table.contains("Score: 0% (0/1)"));

    let diff = report.results[0].diff();
    assert!(diff.starts_with("Expected:\n"));
    assert!(diff.contains("Actual:\n"));
}

#[test]
fn facade_grades_with_default_limits() {
    let report = grade_submission("const add = (a: number, b: number) => a + b;", &[add_case()])
        .expect("grade");
    assert!(report.all_passed);
}

#[tokio::test]
async fn async_grading_matches_sync_grading() {
    let cases = load_cases("add-numbers.json");
    let code = "function add(a, b) { return a + b; }";
    let harness = GradingHarness::default();

    let sync_report = harness.grade(code, &cases).expect("grade");
    let async_report = harness.grade_async(code, &cases).await.expect("grade");
    assert_eq!(sync_report, async_report);
    assert!(async_report.all_passed);
}
