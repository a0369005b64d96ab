//! # Score keeping
//!
//! Pure bookkeeping over grading reports: a [`LessonScore`] per lesson and
//! one [`AggregateProgress`] with XP, levels and study streaks. Persistence
//! goes through the [`ScoreStore`] trait.

/// Per-lesson scores
mod lesson;
/// XP, levels and streaks
mod progress;
/// Persistence
mod store;

pub use lesson::LessonScore;
pub use progress::{AggregateProgress, PERFECT_LESSON_XP, XP_PER_LEVEL};
pub use store::{JsonFileStore, MemoryStore, ScoreStore, StoreError};

use crate::{config::ScorePolicy, grade::GradeReport};

/// Records one graded submission for `lesson_id` in `store`: the lesson's
/// score gets the attempt, and the aggregate is updated from the new score.
pub fn record_submission<S: ScoreStore + ?Sized>(
    store: &mut S,
    lesson_id: &str,
    report: &GradeReport,
    time_spent_seconds: u64,
    policy: &ScorePolicy,
) -> Result<(LessonScore, AggregateProgress), StoreError> {
    let mut score = store
        .load(lesson_id)?
        .unwrap_or_else(|| LessonScore::new(lesson_id));
    score.record_attempt(report, time_spent_seconds, policy);
    store.save(&score)?;

    let mut progress = store.load_progress()?;
    progress.apply(&score);
    store.save_progress(&progress)?;

    Ok((score, progress))
}
