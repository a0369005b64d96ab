//! Tests for lesson scores, XP, levels and streaks.

use chrono::{NaiveDate, TimeZone, Utc};
use tsgrade::{
    AggregateProgress, GradeReport, LessonScore, ScorePolicy, TestCase, TestRunResult,
    score::{PERFECT_LESSON_XP, XP_PER_LEVEL},
};

/// A report with `passed` passing and `failed` failing fixtures.
fn report(passed: usize, failed: usize) -> GradeReport {
    let results = (0..passed)
        .map(|i| (i, true))
        .chain((0..failed).map(|i| (passed + i, false)))
        .map(|(i, ok)| TestRunResult {
            test_case:     TestCase::new(format!("case {i}"), "", "x"),
            passed:        ok,
            actual_output: if ok { "x" } else { "y" }.to_string(),
            error:         None,
        })
        .collect();
    GradeReport::new(results)
}

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

#[test]
fn first_perfect_attempt_is_perfect() {
    let mut score = LessonScore::new("lesson-1");
    score.record_attempt(&report(3, 0), 30, &ScorePolicy::default());

    assert_eq!(score.attempts, 1);
    assert_eq!(score.score, 100);
    assert!(score.perfect);
    assert!(score.is_complete());
    assert_eq!(score.time_spent_seconds, 30);
}

#[test]
fn resubmission_never_clears_perfect() {
    let policy = ScorePolicy::default();
    let mut score = LessonScore::new("lesson-1");
    score.record_attempt(&report(2, 0), 10, &policy);
    score.record_attempt(&report(0, 2), 5, &policy);

    assert_eq!(score.attempts, 2);
    assert_eq!(score.score, 0);
    assert!(score.perfect);
    assert_eq!(score.time_spent_seconds, 15);
}

#[test]
fn later_full_marks_are_not_perfect() {
    let policy = ScorePolicy::default();
    let mut score = LessonScore::new("lesson-2");
    score.record_attempt(&report(1, 1), 0, &policy);
    assert_eq!(score.score, 50);
    assert!(!score.perfect);
    assert!(!score.is_complete());

    score.record_attempt(&report(2, 0), 0, &policy);
    assert_eq!(score.score, 100);
    assert!(!score.perfect);
    assert!(score.is_complete());
}

#[test]
fn score_rounds_down() {
    let mut score = LessonScore::new("thirds");
    score.record_attempt(&report(2, 1), 0, &ScorePolicy::default());
    assert_eq!(score.score, 66);
}

#[test]
fn empty_report_scores_zero_and_does_not_complete() {
    let mut score = LessonScore::new("empty");
    score.record_attempt(&report(0, 0), 0, &ScorePolicy::default());
    assert_eq!(score.attempts, 1);
    assert_eq!(score.score, 0);
    assert!(!score.perfect);
    assert!(!score.is_complete());
}

#[test]
fn first_completion_time_wins() {
    let policy = ScorePolicy::default();
    let first = Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap();
    let later = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();

    let mut score = LessonScore::new("lesson");
    score.record_attempt_at(&report(1, 0), 0, &policy, first);
    score.record_attempt_at(&report(1, 0), 0, &policy, later);
    assert_eq!(score.completed_at, Some(first));
}

#[test]
fn frozen_policy_stops_counting_after_completion() {
    let policy = ScorePolicy {
        freeze_after_completion: true,
    };
    let mut score = LessonScore::new("lesson");
    score.record_attempt(&report(1, 1), 10, &policy);
    score.record_attempt(&report(2, 0), 10, &policy);
    score.record_attempt(&report(0, 2), 10, &policy);

    assert_eq!(score.attempts, 2);
    assert_eq!(score.score, 100);
    assert_eq!(score.time_spent_seconds, 30);
}

#[test]
fn letter_grades_follow_thresholds() {
    let grade_for = |value| {
        let mut score = LessonScore::new("g");
        score.score = value;
        score.letter_grade()
    };
    assert_eq!(grade_for(100), 'A');
    assert_eq!(grade_for(90), 'A');
    assert_eq!(grade_for(89), 'B');
    assert_eq!(grade_for(70), 'C');
    assert_eq!(grade_for(60), 'D');
    assert_eq!(grade_for(59), 'F');
}

#[test]
fn perfect_lessons_earn_flat_xp() {
    let mut score = LessonScore::new("lesson");
    score.record_attempt(&report(1, 0), 0, &ScorePolicy::default());

    let mut progress = AggregateProgress::default();
    progress.apply_on(&score, day(2026, 1, 10));
    assert_eq!(progress.total_xp, PERFECT_LESSON_XP);
    assert_eq!(progress.total_perfect_lessons, 1);
    assert!(progress.is_lesson_complete("lesson"));
}

#[test]
fn imperfect_lessons_earn_half_their_score() {
    let mut score = LessonScore::new("lesson");
    score.record_attempt(&report(2, 1), 0, &ScorePolicy::default());

    let mut progress = AggregateProgress::default();
    progress.apply_on(&score, day(2026, 1, 10));
    assert_eq!(progress.total_xp, 33);
    assert_eq!(progress.total_perfect_lessons, 0);
    assert!(!progress.is_lesson_complete("lesson"));
}

#[test]
fn perfect_lessons_are_counted_once() {
    let mut score = LessonScore::new("lesson");
    score.record_attempt(&report(1, 0), 0, &ScorePolicy::default());

    let mut progress = AggregateProgress::default();
    progress.apply_on(&score, day(2026, 1, 10));
    score.record_attempt(&report(1, 0), 0, &ScorePolicy::default());
    progress.apply_on(&score, day(2026, 1, 10));

    assert_eq!(progress.total_perfect_lessons, 1);
    assert_eq!(progress.total_xp, 2 * PERFECT_LESSON_XP);
    assert_eq!(progress.total_attempts(), 2);
    assert_eq!(progress.completed_lesson_count(), 1);
}

#[test]
fn time_is_added_once_per_recording() {
    let policy = ScorePolicy::default();
    let mut score = LessonScore::new("lesson");
    let mut progress = AggregateProgress::default();

    score.record_attempt(&report(0, 1), 40, &policy);
    progress.apply_on(&score, day(2026, 1, 10));
    score.record_attempt(&report(0, 1), 20, &policy);
    progress.apply_on(&score, day(2026, 1, 10));

    assert_eq!(progress.total_time_spent_seconds, 60);
}

#[test]
fn streak_rules() {
    let score = LessonScore::new("lesson");
    let mut progress = AggregateProgress::default();

    progress.apply_on(&score, day(2026, 2, 27));
    assert_eq!(progress.current_streak, 1);

    progress.apply_on(&score, day(2026, 2, 27));
    assert_eq!(progress.current_streak, 1);

    progress.apply_on(&score, day(2026, 2, 28));
    progress.apply_on(&score, day(2026, 3, 1));
    assert_eq!(progress.current_streak, 3);
    assert_eq!(progress.longest_streak, 3);

    progress.apply_on(&score, day(2026, 3, 5));
    assert_eq!(progress.current_streak, 1);
    assert_eq!(progress.longest_streak, 3);
    assert_eq!(progress.last_study_date, Some(day(2026, 3, 5)));
}

#[test]
fn levels_follow_xp() {
    let mut progress = AggregateProgress::default();
    assert_eq!(progress.level(), 1);
    assert_eq!(progress.xp_to_next_level(), XP_PER_LEVEL);

    progress.total_xp = 999;
    assert_eq!(progress.level(), 1);
    assert_eq!(progress.xp_to_next_level(), 1);

    progress.total_xp = 1000;
    assert_eq!(progress.level(), 2);
    assert_eq!(progress.xp_to_next_level(), 1000);

    progress.total_xp = 2350;
    assert_eq!(progress.level(), 3);
    assert_eq!(progress.xp_to_next_level(), 650);
}

#[test]
fn quizzes_award_their_percentage() {
    let mut progress = AggregateProgress::default();
    progress.record_quiz("quiz-1", 80);
    progress.record_quiz("quiz-2", 45);
    assert_eq!(progress.total_xp, 125);
    assert_eq!(progress.quiz_scores.get("quiz-1"), Some(&80));
}

#[test]
fn average_score_uses_latest_lesson_scores() {
    let policy = ScorePolicy::default();
    let mut a = LessonScore::new("a");
    a.record_attempt(&report(1, 0), 0, &policy);
    let mut b = LessonScore::new("b");
    b.record_attempt(&report(1, 1), 0, &policy);

    let mut progress = AggregateProgress::default();
    assert_eq!(progress.average_score(), 0.0);
    progress.apply_on(&a, day(2026, 1, 1));
    progress.apply_on(&b, day(2026, 1, 1));
    assert_eq!(progress.average_score(), 75.0);
}
