use std::sync::Arc;

use study_core::model::{LessonId, ResumePoint, TopicId, UserId};
use storage::repository::ResumeRepository;

use crate::Clock;
use crate::error::SessionStateError;

/// Where to land when a learner opens a topic's lesson view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LessonTarget {
    /// A previously saved lesson takes precedence over the requested one.
    Saved(LessonId),
    /// No saved position diverges from the request.
    Requested(LessonId),
}

impl LessonTarget {
    #[must_use]
    pub fn lesson_id(self) -> LessonId {
        match self {
            Self::Saved(id) | Self::Requested(id) => id,
        }
    }
}

/// Keeps one resume point per (user, topic) so interrupted lessons and
/// quizzes reopen where the learner left off.
///
/// Position saves are best-effort: a failed write is logged and dropped,
/// never surfaced to the caller mid-study. Clearing is the exception,
/// because a stale resume point would misrepresent a finished quiz.
#[derive(Clone)]
pub struct SessionStateService {
    clock: Clock,
    resume: Arc<dyn ResumeRepository>,
}

impl SessionStateService {
    #[must_use]
    pub fn new(clock: Clock, resume: Arc<dyn ResumeRepository>) -> Self {
        Self { clock, resume }
    }

    /// Remember which lesson the learner is viewing. Quiz fields already
    /// saved on the row are preserved.
    pub async fn save_lesson_position(&self, user: UserId, topic: TopicId, lesson: LessonId) {
        let mut point = match self.resume.get_resume_point(user, topic).await {
            Ok(existing) => existing.unwrap_or_else(|| ResumePoint::new(user, topic, self.clock.now())),
            Err(err) => {
                tracing::warn!("skipping lesson position save for user {user}: {err}");
                return;
            }
        };
        point.lesson_id = Some(lesson);
        point.updated_at = self.clock.now();
        if let Err(err) = self.resume.save_resume_point(&point).await {
            tracing::warn!("lesson position save failed for user {user}: {err}");
        }
    }

    /// Remember mid-quiz state. The saved lesson pointer on the row is
    /// preserved; the quiz fields come from `snapshot`.
    pub async fn save_quiz_position(&self, snapshot: ResumePoint) {
        let user = snapshot.user_id;
        let topic = snapshot.topic_id;
        let mut point = snapshot;
        match self.resume.get_resume_point(user, topic).await {
            Ok(Some(existing)) => point.lesson_id = existing.lesson_id,
            Ok(None) => {}
            Err(err) => {
                tracing::warn!("skipping quiz position save for user {user}: {err}");
                return;
            }
        }
        if let Err(err) = self.resume.save_resume_point(&point).await {
            tracing::warn!("quiz position save failed for user {user}: {err}");
        }
    }

    /// The saved resume point, `None` when there is nothing to restore.
    ///
    /// A fetch failure also yields `None` so the caller renders a fresh
    /// state instead of erroring out of a study flow.
    pub async fn resume(&self, user: UserId, topic: TopicId) -> Option<ResumePoint> {
        match self.resume.get_resume_point(user, topic).await {
            Ok(point) => point,
            Err(err) => {
                tracing::warn!("resume point fetch failed for user {user}: {err}");
                None
            }
        }
    }

    /// Picks the lesson to open: a saved position wins over a deep link
    /// to a different lesson.
    pub async fn resolve_lesson(
        &self,
        user: UserId,
        topic: TopicId,
        requested: LessonId,
    ) -> LessonTarget {
        match self.resume(user, topic).await.and_then(|p| p.lesson_id) {
            Some(saved) if saved != requested => LessonTarget::Saved(saved),
            _ => LessonTarget::Requested(requested),
        }
    }

    /// Drop the resume point for (user, topic).
    ///
    /// # Errors
    ///
    /// Returns `SessionStateError::Storage` if the delete fails; callers
    /// depend on the row actually being gone.
    pub async fn clear(&self, user: UserId, topic: TopicId) -> Result<(), SessionStateError> {
        self.resume.clear_resume_point(user, topic).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use study_core::model::{QuestionId, SavedAnswer};
    use study_core::time::{fixed_clock, fixed_now};
    use storage::repository::InMemoryRepository;

    fn service(repo: &InMemoryRepository) -> SessionStateService {
        SessionStateService::new(fixed_clock(), Arc::new(repo.clone()))
    }

    #[tokio::test]
    async fn lesson_position_round_trips() {
        let repo = InMemoryRepository::new();
        let service = service(&repo);
        let user = UserId::new();
        let topic = TopicId::new();
        let lesson = LessonId::new();

        assert!(service.resume(user, topic).await.is_none());

        service.save_lesson_position(user, topic, lesson).await;
        let point = service.resume(user, topic).await.unwrap();
        assert_eq!(point.lesson_id, Some(lesson));
        assert!(!point.has_quiz_state());
    }

    #[tokio::test]
    async fn quiz_save_preserves_lesson_pointer() {
        let repo = InMemoryRepository::new();
        let service = service(&repo);
        let user = UserId::new();
        let topic = TopicId::new();
        let lesson = LessonId::new();
        let question = QuestionId::new();

        service.save_lesson_position(user, topic, lesson).await;

        let mut snapshot = ResumePoint::new(user, topic, fixed_now());
        snapshot.question_index = 1;
        snapshot.score = 1;
        snapshot
            .answers
            .insert(question, SavedAnswer::new("4", ""));
        service.save_quiz_position(snapshot).await;

        let point = service.resume(user, topic).await.unwrap();
        assert_eq!(point.lesson_id, Some(lesson));
        assert_eq!(point.question_index, 1);
        assert_eq!(point.saved_answer(question).unwrap().answer, "4");
    }

    #[tokio::test]
    async fn saved_lesson_wins_over_deep_link() {
        let repo = InMemoryRepository::new();
        let service = service(&repo);
        let user = UserId::new();
        let topic = TopicId::new();
        let saved = LessonId::new();
        let linked = LessonId::new();

        service.save_lesson_position(user, topic, saved).await;

        assert_eq!(
            service.resolve_lesson(user, topic, linked).await,
            LessonTarget::Saved(saved)
        );
        assert_eq!(
            service.resolve_lesson(user, topic, saved).await,
            LessonTarget::Requested(saved)
        );
    }

    #[tokio::test]
    async fn clear_removes_the_point() {
        let repo = InMemoryRepository::new();
        let service = service(&repo);
        let user = UserId::new();
        let topic = TopicId::new();

        service
            .save_lesson_position(user, topic, LessonId::new())
            .await;
        service.clear(user, topic).await.unwrap();
        assert!(service.resume(user, topic).await.is_none());
    }
}
