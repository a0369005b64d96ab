//! Tests for score persistence.

use tempfile::tempdir;
use tsgrade::{
    AggregateProgress, GradeReport, JsonFileStore, LessonScore, MemoryStore, ScorePolicy,
    ScoreStore, StoreError, TestCase, TestRunResult, score::record_submission,
};

fn passing_report() -> GradeReport {
    GradeReport::new(vec![TestRunResult {
        test_case:     TestCase::new("case", "console.log(1)", "1"),
        passed:        true,
        actual_output: "1".to_string(),
        error:         None,
    }])
}

#[test]
fn memory_store_round_trips_scores() {
    let mut store = MemoryStore::new();
    assert!(store.load("lesson").unwrap().is_none());

    let mut score = LessonScore::new("lesson");
    score.attempts = 2;
    store.save(&score).unwrap();
    assert_eq!(store.load("lesson").unwrap(), Some(score));
}

#[test]
fn missing_file_reads_as_empty() {
    let dir = tempdir().unwrap();
    let store = JsonFileStore::new(dir.path().join("nested").join("scores.json"));
    assert!(store.load("anything").unwrap().is_none());
    assert_eq!(store.load_progress().unwrap(), AggregateProgress::default());
}

#[test]
fn json_store_persists_across_instances() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("scores.json");

    let mut score = LessonScore::new("lesson");
    score.record_attempt(&passing_report(), 12, &ScorePolicy::default());
    let mut progress = AggregateProgress::default();
    progress.apply(&score);

    {
        let mut store = JsonFileStore::new(&path);
        store.save(&score).unwrap();
        store.save_progress(&progress).unwrap();
    }

    let store = JsonFileStore::new(&path);
    assert_eq!(store.load("lesson").unwrap(), Some(score));
    assert_eq!(store.load_progress().unwrap(), progress);
}

#[test]
fn malformed_file_is_a_json_error() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("scores.json");
    std::fs::write(&path, "{ not json").unwrap();

    let store = JsonFileStore::new(&path);
    assert!(matches!(store.load("lesson"), Err(StoreError::Json { .. })));
}

#[test]
fn recording_submissions_updates_lesson_and_progress() {
    let dir = tempdir().unwrap();
    let mut store = JsonFileStore::new(dir.path().join("scores.json"));
    let policy = ScorePolicy::default();

    let (first, _) =
        record_submission(&mut store, "lesson", &passing_report(), 5, &policy).unwrap();
    assert!(first.perfect);

    let (second, progress) =
        record_submission(&mut store, "lesson", &passing_report(), 5, &policy).unwrap();
    assert_eq!(second.attempts, 2);
    assert!(second.perfect);
    assert_eq!(progress.total_perfect_lessons, 1);
    assert_eq!(progress.total_time_spent_seconds, 10);
    assert_eq!(store.load("lesson").unwrap(), Some(second));
}

#[test]
fn memory_store_records_submissions() {
    let mut store = MemoryStore::new();
    let (score, progress) = record_submission(
        &mut store,
        "lesson",
        &passing_report(),
        0,
        &ScorePolicy::default(),
    )
    .unwrap();

    assert_eq!(score.attempts, 1);
    assert_eq!(progress.current_streak, 1);
    assert_eq!(store.load_progress().unwrap(), progress);
}
