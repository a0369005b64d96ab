#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{config::ScorePolicy, grade::GradeReport};

/// Score-keeping state for one lesson.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonScore {
    /// Lesson this score belongs to
    pub lesson_id:          String,
    /// Graded submissions counted so far
    pub attempts:           u32,
    /// Percentage of fixtures passed by the latest counted attempt
    pub score:              u32,
    /// Full marks on the very first attempt; never cleared once set
    pub perfect:            bool,
    /// Total time spent on the lesson
    pub time_spent_seconds: u64,
    /// When every fixture first passed
    pub completed_at:       Option<DateTime<Utc>>,
}

impl LessonScore {
    /// A lesson nobody has attempted yet.
    pub fn new(lesson_id: impl Into<String>) -> Self {
        Self {
            lesson_id:          lesson_id.into(),
            attempts:           0,
            score:              0,
            perfect:            false,
            time_spent_seconds: 0,
            completed_at:       None,
        }
    }

    /// Records one graded submission, timestamping completion with the
    /// current time.
    pub fn record_attempt(
        &mut self,
        report: &GradeReport,
        time_spent_seconds: u64,
        policy: &ScorePolicy,
    ) -> &LessonScore {
        self.record_attempt_at(report, time_spent_seconds, policy, Utc::now())
    }

    /// Records one graded submission made at `now`.
    ///
    /// With [`ScorePolicy::freeze_after_completion`] set, submissions after
    /// completion only add to the time spent.
    pub fn record_attempt_at(
        &mut self,
        report: &GradeReport,
        time_spent_seconds: u64,
        policy: &ScorePolicy,
        now: DateTime<Utc>,
    ) -> &LessonScore {
        self.time_spent_seconds = self.time_spent_seconds.saturating_add(time_spent_seconds);
        if policy.freeze_after_completion && self.is_complete() {
            return self;
        }

        self.attempts += 1;
        self.score = report.score_percent();
        if self.attempts == 1 && self.score == 100 {
            self.perfect = true;
        }
        if report.all_passed && !report.is_empty() && self.completed_at.is_none() {
            self.completed_at = Some(now);
        }

        tracing::debug!(
            lesson = %self.lesson_id,
            attempts = self.attempts,
            score = self.score,
            perfect = self.perfect,
            "Recorded attempt"
        );
        self
    }

    /// Whether every fixture has passed at least once.
    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Letter grade for the current score.
    pub fn letter_grade(&self) -> char {
        match self.score {
            90.. => 'A',
            80..=89 => 'B',
            70..=79 => 'C',
            60..=69 => 'D',
            _ => 'F',
        }
    }
}
