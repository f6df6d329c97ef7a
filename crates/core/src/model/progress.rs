use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::ids::{LessonId, TopicId, UserId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("topic percent must be 0-100, got {percent}")]
    InvalidPercent { percent: u8 },
}

/// Per-user completion state of a single lesson.
///
/// Completion is monotonic: once a lesson is marked complete it stays
/// complete, regardless of later visits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonProgress {
    user_id: UserId,
    lesson_id: LessonId,
    completed: bool,
    updated_at: DateTime<Utc>,
}

impl LessonProgress {
    /// Creates a fresh, not-yet-completed record.
    #[must_use]
    pub fn new(user_id: UserId, lesson_id: LessonId, at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            lesson_id,
            completed: false,
            updated_at: at,
        }
    }

    /// Rehydrate from persisted storage.
    #[must_use]
    pub fn from_persisted(
        user_id: UserId,
        lesson_id: LessonId,
        completed: bool,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            lesson_id,
            completed,
            updated_at,
        }
    }

    /// Marks the lesson complete. A completed record never reverts.
    pub fn mark_completed(&mut self, at: DateTime<Utc>) {
        if !self.completed {
            self.completed = true;
            self.updated_at = at;
        }
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn lesson_id(&self) -> LessonId {
        self.lesson_id
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// Per-user rollup of a topic: percent of lessons done plus the completed
/// flag, which can also be earned by passing the topic quiz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicProgress {
    user_id: UserId,
    topic_id: TopicId,
    percent: u8,
    completed: bool,
    updated_at: DateTime<Utc>,
}

impl TopicProgress {
    /// Derives progress from the lesson completion ratio.
    ///
    /// A topic with no lessons reports zero percent and stays incomplete;
    /// completing every lesson completes the topic.
    #[must_use]
    pub fn from_lesson_ratio(
        user_id: UserId,
        topic_id: TopicId,
        completed_lessons: u32,
        total_lessons: u32,
        at: DateTime<Utc>,
    ) -> Self {
        let (percent, completed) = if total_lessons == 0 {
            (0, false)
        } else {
            let ratio = f64::from(completed_lessons.min(total_lessons)) / f64::from(total_lessons);
            (
                (ratio * 100.0).round() as u8,
                completed_lessons >= total_lessons,
            )
        };
        Self {
            user_id,
            topic_id,
            percent,
            completed,
            updated_at: at,
        }
    }

    /// Progress earned by passing the topic quiz: full marks, completed.
    #[must_use]
    pub fn quiz_passed(user_id: UserId, topic_id: TopicId, at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            topic_id,
            percent: 100,
            completed: true,
            updated_at: at,
        }
    }

    /// Rehydrate from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::InvalidPercent` when the stored percent is
    /// above 100.
    pub fn from_persisted(
        user_id: UserId,
        topic_id: TopicId,
        percent: u8,
        completed: bool,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, ProgressError> {
        if percent > 100 {
            return Err(ProgressError::InvalidPercent { percent });
        }
        Ok(Self {
            user_id,
            topic_id,
            percent,
            completed,
            updated_at,
        })
    }

    /// Merges this freshly computed value over the stored one.
    ///
    /// Progress never regresses: percent keeps its maximum and a completed
    /// topic stays completed even if the fresh ratio says otherwise.
    #[must_use]
    pub fn merged_over(mut self, existing: &TopicProgress) -> Self {
        self.percent = self.percent.max(existing.percent);
        self.completed = self.completed || existing.completed;
        self
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn topic_id(&self) -> TopicId {
        self.topic_id
    }

    #[must_use]
    pub fn percent(&self) -> u8 {
        self.percent
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn lesson_completion_does_not_revert() {
        let mut progress = LessonProgress::new(UserId::new(), LessonId::new(), fixed_now());
        assert!(!progress.is_completed());

        let completed_at = fixed_now();
        progress.mark_completed(completed_at);
        progress.mark_completed(completed_at + chrono::Duration::days(1));

        assert!(progress.is_completed());
        assert_eq!(progress.updated_at(), completed_at);
    }

    #[test]
    fn ratio_rounds_to_nearest_percent() {
        let progress =
            TopicProgress::from_lesson_ratio(UserId::new(), TopicId::new(), 1, 3, fixed_now());
        assert_eq!(progress.percent(), 33);
        assert!(!progress.is_completed());
    }

    #[test]
    fn all_lessons_complete_the_topic() {
        let progress =
            TopicProgress::from_lesson_ratio(UserId::new(), TopicId::new(), 3, 3, fixed_now());
        assert_eq!(progress.percent(), 100);
        assert!(progress.is_completed());
    }

    #[test]
    fn empty_topic_is_never_complete() {
        let progress =
            TopicProgress::from_lesson_ratio(UserId::new(), TopicId::new(), 0, 0, fixed_now());
        assert_eq!(progress.percent(), 0);
        assert!(!progress.is_completed());
    }

    #[test]
    fn merge_keeps_completion_and_max_percent() {
        let user = UserId::new();
        let topic = TopicId::new();
        let existing = TopicProgress::quiz_passed(user, topic, fixed_now());
        let fresh = TopicProgress::from_lesson_ratio(user, topic, 1, 4, fixed_now());

        let merged = fresh.merged_over(&existing);
        assert_eq!(merged.percent(), 100);
        assert!(merged.is_completed());
    }

    #[test]
    fn persisted_percent_above_hundred_is_rejected() {
        let err = TopicProgress::from_persisted(UserId::new(), TopicId::new(), 101, false, fixed_now())
            .unwrap_err();
        assert_eq!(err, ProgressError::InvalidPercent { percent: 101 });
    }
}
