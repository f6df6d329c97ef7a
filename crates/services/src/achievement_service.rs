use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use study_core::metrics::current_streak;
use study_core::model::{AchievementCode, QUIZ_PASS_PERCENT, QuizAttempt, UserId};
use storage::repository::{
    AchievementRepository, StudySessionRepository, UnlockedAchievement,
};

use crate::Clock;
use crate::error::AchievementServiceError;

pub const CODE_FIRST_QUIZ: &str = "first-quiz";
pub const CODE_QUIZ_PERFECT: &str = "quiz-perfect";
pub const CODE_STREAK_THREE: &str = "streak-3";
pub const CODE_TOPIC_COMPLETE: &str = "topic-complete";

/// Streak length that earns [`CODE_STREAK_THREE`].
const STREAK_THRESHOLD: u32 = 3;

/// Hook invoked after study milestones so badges can unlock as a side
/// effect. Callers treat failures as non-fatal.
#[async_trait]
pub trait AchievementCheck: Send + Sync {
    /// React to a recorded quiz attempt. Returns the newly unlocked codes.
    ///
    /// # Errors
    ///
    /// Returns `AchievementServiceError` if an unlock cannot be evaluated
    /// or stored.
    async fn quiz_finished(
        &self,
        attempt: &QuizAttempt,
    ) -> Result<Vec<AchievementCode>, AchievementServiceError>;

    /// React to a completed lesson. Returns the newly unlocked codes.
    ///
    /// # Errors
    ///
    /// Returns `AchievementServiceError` if an unlock cannot be evaluated
    /// or stored.
    async fn lesson_completed(
        &self,
        user: UserId,
        topic_completed: bool,
    ) -> Result<Vec<AchievementCode>, AchievementServiceError>;
}

/// Default badge rules: first quiz, perfect quiz, three-day streak and
/// topic completion. Unlocks are idempotent, so re-earning a badge is a
/// no-op.
#[derive(Clone)]
pub struct AchievementService {
    clock: Clock,
    achievements: Arc<dyn AchievementRepository>,
    study_sessions: Arc<dyn StudySessionRepository>,
}

impl AchievementService {
    #[must_use]
    pub fn new(
        clock: Clock,
        achievements: Arc<dyn AchievementRepository>,
        study_sessions: Arc<dyn StudySessionRepository>,
    ) -> Self {
        Self {
            clock,
            achievements,
            study_sessions,
        }
    }

    /// Every badge the user has unlocked so far, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `AchievementServiceError::Storage` if repository access fails.
    pub async fn unlocked(
        &self,
        user: UserId,
    ) -> Result<Vec<UnlockedAchievement>, AchievementServiceError> {
        let unlocked = self.achievements.unlocked_for_user(user).await?;
        Ok(unlocked)
    }

    async fn try_unlock(
        &self,
        user: UserId,
        code: &str,
        at: DateTime<Utc>,
        newly: &mut Vec<AchievementCode>,
    ) -> Result<(), AchievementServiceError> {
        let code = AchievementCode::new(code)?;
        if self.achievements.unlock(user, &code, at).await? {
            newly.push(code);
        }
        Ok(())
    }

    async fn streak(&self, user: UserId) -> Result<u32, AchievementServiceError> {
        let sessions = self.study_sessions.sessions_for_user(user).await?;
        let dates: Vec<NaiveDate> = sessions
            .iter()
            .map(|s| s.recorded_at().date_naive())
            .collect();
        Ok(current_streak(&dates, self.clock.today()))
    }
}

#[async_trait]
impl AchievementCheck for AchievementService {
    async fn quiz_finished(
        &self,
        attempt: &QuizAttempt,
    ) -> Result<Vec<AchievementCode>, AchievementServiceError> {
        let user = attempt.user_id();
        let at = self.clock.now();
        let mut newly = Vec::new();

        self.try_unlock(user, CODE_FIRST_QUIZ, at, &mut newly).await?;
        if attempt.percentage() == 100 {
            self.try_unlock(user, CODE_QUIZ_PERFECT, at, &mut newly)
                .await?;
        }
        if attempt.percentage() >= QUIZ_PASS_PERCENT {
            self.try_unlock(user, CODE_TOPIC_COMPLETE, at, &mut newly)
                .await?;
        }
        if self.streak(user).await? >= STREAK_THRESHOLD {
            self.try_unlock(user, CODE_STREAK_THREE, at, &mut newly)
                .await?;
        }

        Ok(newly)
    }

    async fn lesson_completed(
        &self,
        user: UserId,
        topic_completed: bool,
    ) -> Result<Vec<AchievementCode>, AchievementServiceError> {
        let at = self.clock.now();
        let mut newly = Vec::new();

        if topic_completed {
            self.try_unlock(user, CODE_TOPIC_COMPLETE, at, &mut newly)
                .await?;
        }
        if self.streak(user).await? >= STREAK_THRESHOLD {
            self.try_unlock(user, CODE_STREAK_THREE, at, &mut newly)
                .await?;
        }

        Ok(newly)
    }
}

/// Wiring stub for callers that do not track badges.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAchievementCheck;

#[async_trait]
impl AchievementCheck for NoopAchievementCheck {
    async fn quiz_finished(
        &self,
        _attempt: &QuizAttempt,
    ) -> Result<Vec<AchievementCode>, AchievementServiceError> {
        Ok(Vec::new())
    }

    async fn lesson_completed(
        &self,
        _user: UserId,
        _topic_completed: bool,
    ) -> Result<Vec<AchievementCode>, AchievementServiceError> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Duration;
    use uuid::Uuid;

    use study_core::model::{StudySession, TopicId};
    use study_core::time::{fixed_clock, fixed_now};
    use storage::repository::InMemoryRepository;

    fn service(repo: &InMemoryRepository) -> AchievementService {
        AchievementService::new(fixed_clock(), Arc::new(repo.clone()), Arc::new(repo.clone()))
    }

    fn attempt(user: UserId, score: u32, total: u32) -> QuizAttempt {
        QuizAttempt::from_score(Uuid::new_v4(), user, TopicId::new(), score, total, fixed_now())
            .unwrap()
    }

    #[tokio::test]
    async fn first_quiz_unlocks_exactly_once() {
        let repo = InMemoryRepository::new();
        let service = service(&repo);
        let user = UserId::new();

        let first = service.quiz_finished(&attempt(user, 1, 4)).await.unwrap();
        assert!(first.iter().any(|c| c.as_str() == CODE_FIRST_QUIZ));

        let second = service.quiz_finished(&attempt(user, 2, 4)).await.unwrap();
        assert!(second.is_empty());
        assert_eq!(service.unlocked(user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn perfect_quiz_earns_perfect_and_topic_badges() {
        let repo = InMemoryRepository::new();
        let service = service(&repo);
        let user = UserId::new();

        let newly = service.quiz_finished(&attempt(user, 4, 4)).await.unwrap();
        let codes: Vec<&str> = newly.iter().map(AchievementCode::as_str).collect();
        assert!(codes.contains(&CODE_FIRST_QUIZ));
        assert!(codes.contains(&CODE_QUIZ_PERFECT));
        assert!(codes.contains(&CODE_TOPIC_COMPLETE));
    }

    #[tokio::test]
    async fn three_day_streak_unlocks_after_lesson() {
        let repo = InMemoryRepository::new();
        let service = service(&repo);
        let user = UserId::new();

        for days_ago in 0..3 {
            let at = fixed_now() - Duration::days(days_ago);
            repo.append_session(&StudySession::new(user, 10, at).unwrap())
                .await
                .unwrap();
        }

        let newly = service.lesson_completed(user, false).await.unwrap();
        let codes: Vec<&str> = newly.iter().map(AchievementCode::as_str).collect();
        assert_eq!(codes, vec![CODE_STREAK_THREE]);
    }

    #[tokio::test]
    async fn noop_check_never_unlocks() {
        let user = UserId::new();
        let newly = NoopAchievementCheck
            .quiz_finished(&attempt(user, 4, 4))
            .await
            .unwrap();
        assert!(newly.is_empty());
        assert!(
            NoopAchievementCheck
                .lesson_completed(user, true)
                .await
                .unwrap()
                .is_empty()
        );
    }
}
