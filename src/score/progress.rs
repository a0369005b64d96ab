#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use super::lesson::LessonScore;

/// XP awarded for a perfect lesson.
pub const PERFECT_LESSON_XP: u64 = 100;

/// XP needed per level.
pub const XP_PER_LEVEL: u64 = 1000;

/// Progress across every lesson and quiz.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregateProgress {
    /// Experience points earned
    pub total_xp:                 u64,
    /// Consecutive study days ending at `last_study_date`
    pub current_streak:           u32,
    /// Longest streak ever reached
    pub longest_streak:           u32,
    /// Calendar day of the latest recorded study
    pub last_study_date:          Option<NaiveDate>,
    /// Lessons that were ever perfect, each counted once
    pub total_perfect_lessons:    u32,
    /// Time spent across every lesson
    pub total_time_spent_seconds: u64,
    /// Ids of completed lessons
    pub completed_lessons:        BTreeSet<String>,
    /// Latest score recorded for each lesson
    pub lesson_scores:            BTreeMap<String, LessonScore>,
    /// Score of each completed quiz
    pub quiz_scores:              BTreeMap<String, u32>,
}

impl AggregateProgress {
    /// Folds a lesson score into the aggregate, using today's local date for
    /// the streak.
    pub fn apply(&mut self, score: &LessonScore) -> &AggregateProgress {
        self.apply_on(score, Local::now().date_naive())
    }

    /// Folds a lesson score into the aggregate as of `today`.
    pub fn apply_on(&mut self, score: &LessonScore, today: NaiveDate) -> &AggregateProgress {
        self.total_xp += if score.perfect {
            PERFECT_LESSON_XP
        } else {
            u64::from(score.score / 2)
        };
        self.update_streak(today);

        let previous = self.lesson_scores.get(&score.lesson_id);
        if score.perfect && !previous.is_some_and(|p| p.perfect) {
            self.total_perfect_lessons += 1;
        }
        let already_counted = previous.map_or(0, |p| p.time_spent_seconds);
        self.total_time_spent_seconds += score.time_spent_seconds.saturating_sub(already_counted);

        if score.is_complete() {
            self.completed_lessons.insert(score.lesson_id.clone());
        }
        self.lesson_scores
            .insert(score.lesson_id.clone(), score.clone());

        tracing::debug!(
            xp = self.total_xp,
            streak = self.current_streak,
            level = self.level(),
            "Updated progress"
        );
        self
    }

    /// Records a finished quiz and awards its percentage as XP.
    pub fn record_quiz(&mut self, quiz_id: impl Into<String>, score_percentage: u32) {
        self.quiz_scores.insert(quiz_id.into(), score_percentage);
        self.total_xp += u64::from(score_percentage);
    }

    /// Advances, keeps or resets the streak for a study session on `today`.
    fn update_streak(&mut self, today: NaiveDate) {
        self.current_streak = match self.last_study_date {
            None => 1,
            Some(last) if last == today => self.current_streak,
            Some(last) if last.succ_opt() == Some(today) => self.current_streak + 1,
            Some(_) => 1,
        };
        self.last_study_date = Some(today);
        self.longest_streak = self.longest_streak.max(self.current_streak);
    }

    /// Current level, starting at 1.
    pub fn level(&self) -> u64 {
        self.total_xp / XP_PER_LEVEL + 1
    }

    /// XP still needed to reach the next level.
    pub fn xp_to_next_level(&self) -> u64 {
        XP_PER_LEVEL - self.total_xp % XP_PER_LEVEL
    }

    /// Mean of the latest lesson scores, or 0 with none recorded.
    pub fn average_score(&self) -> f64 {
        if self.lesson_scores.is_empty() {
            return 0.0;
        }
        let sum: u64 = self.lesson_scores.values().map(|s| u64::from(s.score)).sum();
        sum as f64 / self.lesson_scores.len() as f64
    }

    /// Attempts across every lesson.
    pub fn total_attempts(&self) -> u64 {
        self.lesson_scores
            .values()
            .map(|s| u64::from(s.attempts))
            .sum()
    }

    /// Number of completed lessons.
    pub fn completed_lesson_count(&self) -> usize {
        self.completed_lessons.len()
    }

    /// Whether `lesson_id` has been completed.
    pub fn is_lesson_complete(&self, lesson_id: &str) -> bool {
        self.completed_lessons.contains(lesson_id)
    }
}
