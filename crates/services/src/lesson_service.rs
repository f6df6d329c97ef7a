use std::collections::HashSet;
use std::sync::Arc;

use study_core::model::{
    Lesson, LessonId, LessonProgress, StudySession, TopicId, TopicProgress, UserId,
};
use storage::repository::{
    CatalogRepository, LessonProgressRepository, StorageError, StudySessionRepository,
    TopicProgressRepository,
};

use crate::Clock;
use crate::achievement_service::AchievementCheck;
use crate::error::LessonError;

/// Minimum seconds a lesson must stay open before completing counts.
pub const MIN_LESSON_DWELL_SECS: u32 = 10;

const MIN_LESSON_MINUTES: u32 = 1;
const MAX_LESSON_MINUTES: u32 = 60;

/// What one lesson completion did to the learner's progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonOutcome {
    pub newly_completed: bool,
    pub topic_percent: u8,
    pub topic_completed: bool,
    pub minutes_recorded: u32,
}

/// Handles the read-a-lesson flow: the dwell gate, the per-lesson
/// completion row, the topic rollup and the study time log.
#[derive(Clone)]
pub struct LessonFlowService {
    clock: Clock,
    catalog: Arc<dyn CatalogRepository>,
    lesson_progress: Arc<dyn LessonProgressRepository>,
    topic_progress: Arc<dyn TopicProgressRepository>,
    study_sessions: Arc<dyn StudySessionRepository>,
    achievements: Arc<dyn AchievementCheck>,
}

impl LessonFlowService {
    #[must_use]
    pub fn new(
        clock: Clock,
        catalog: Arc<dyn CatalogRepository>,
        lesson_progress: Arc<dyn LessonProgressRepository>,
        topic_progress: Arc<dyn TopicProgressRepository>,
        study_sessions: Arc<dyn StudySessionRepository>,
        achievements: Arc<dyn AchievementCheck>,
    ) -> Self {
        Self {
            clock,
            catalog,
            lesson_progress,
            topic_progress,
            study_sessions,
            achievements,
        }
    }

    /// Mark a lesson as read after `dwell_secs` seconds on the page.
    ///
    /// Completion is monotonic, the topic rollup never regresses, and a
    /// repeat visit still logs study time without changing the ratio.
    ///
    /// # Errors
    ///
    /// Returns `LessonError::DwellTooShort` below the dwell gate,
    /// `LessonError::Storage(StorageError::NotFound)` when the lesson is
    /// not part of the topic, and `LessonError::Storage` for repository
    /// failures.
    pub async fn complete_lesson(
        &self,
        user: UserId,
        topic: TopicId,
        lesson: LessonId,
        dwell_secs: u32,
    ) -> Result<LessonOutcome, LessonError> {
        if dwell_secs < MIN_LESSON_DWELL_SECS {
            return Err(LessonError::DwellTooShort {
                seconds: dwell_secs,
            });
        }

        let now = self.clock.now();
        let lessons = self.catalog.lessons_for_topic(topic).await?;
        if !lessons.iter().any(|l| l.id() == lesson) {
            return Err(StorageError::NotFound.into());
        }

        let mut row = self
            .lesson_progress
            .get_lesson_progress(user, lesson)
            .await?
            .unwrap_or_else(|| LessonProgress::new(user, lesson, now));
        let newly_completed = !row.is_completed();
        row.mark_completed(now);
        self.lesson_progress.upsert_lesson_progress(&row).await?;

        let rollup = self.rollup_topic(user, topic, &lessons).await?;

        let minutes = dwell_minutes(dwell_secs);
        let study = StudySession::new(user, minutes, now)?;
        self.study_sessions.append_session(&study).await?;

        if let Err(err) = self
            .achievements
            .lesson_completed(user, rollup.is_completed())
            .await
        {
            tracing::warn!("achievement check failed after lesson for user {user}: {err}");
        }

        Ok(LessonOutcome {
            newly_completed,
            topic_percent: rollup.percent(),
            topic_completed: rollup.is_completed(),
            minutes_recorded: minutes,
        })
    }

    /// Recompute the topic rollup from its lesson completion ratio and
    /// merge it over what is stored.
    async fn rollup_topic(
        &self,
        user: UserId,
        topic: TopicId,
        lessons: &[Lesson],
    ) -> Result<TopicProgress, LessonError> {
        let lesson_ids: HashSet<LessonId> = lessons.iter().map(Lesson::id).collect();
        let rows = self.lesson_progress.lesson_progress_for_user(user).await?;
        let done = rows
            .iter()
            .filter(|r| r.is_completed() && lesson_ids.contains(&r.lesson_id()))
            .count();

        let now = self.clock.now();
        let fresh = TopicProgress::from_lesson_ratio(
            user,
            topic,
            u32::try_from(done).unwrap_or(u32::MAX),
            u32::try_from(lessons.len()).unwrap_or(u32::MAX),
            now,
        );
        let rollup = match self.topic_progress.get_topic_progress(user, topic).await? {
            Some(existing) => fresh.merged_over(&existing),
            None => fresh,
        };
        self.topic_progress.upsert_topic_progress(&rollup).await?;
        Ok(rollup)
    }
}

/// Study minutes credited for `dwell_secs` seconds of reading.
fn dwell_minutes(dwell_secs: u32) -> u32 {
    let raw = (f64::from(dwell_secs) / 60.0).round() as u32;
    raw.clamp(MIN_LESSON_MINUTES, MAX_LESSON_MINUTES)
}
