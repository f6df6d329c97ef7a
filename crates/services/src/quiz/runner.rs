use std::sync::Arc;

use uuid::Uuid;

use study_core::model::{
    AchievementCode, QUIZ_PASS_PERCENT, QuizAttempt, StudySession, TopicId, TopicProgress, UserId,
};
use storage::repository::{
    CatalogRepository, QuizAttemptRepository, StudySessionRepository, TopicProgressRepository,
};

use crate::Clock;
use crate::achievement_service::AchievementCheck;
use crate::error::QuizError;
use crate::session_state_service::SessionStateService;
use super::engine::{Advance, CheckOutcome, QuizSession};

/// Study minutes credited per quiz question, before clamping.
const MINUTES_PER_QUESTION: f64 = 1.5;
const MIN_QUIZ_MINUTES: u32 = 5;
const MAX_QUIZ_MINUTES: u32 = 10;

/// Everything recorded for one finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizOutcome {
    pub attempt: QuizAttempt,
    pub topic_completed: bool,
    pub minutes_recorded: u32,
    pub unlocked: Vec<AchievementCode>,
}

/// Result of advancing past a checked question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizAdvance {
    Next,
    Finished(QuizOutcome),
}

/// Orchestrates quiz start, persisted resume state and finish side
/// effects around the in-memory [`QuizSession`].
#[derive(Clone)]
pub struct QuizRunner {
    clock: Clock,
    catalog: Arc<dyn CatalogRepository>,
    attempts: Arc<dyn QuizAttemptRepository>,
    topic_progress: Arc<dyn TopicProgressRepository>,
    study_sessions: Arc<dyn StudySessionRepository>,
    session_state: SessionStateService,
    achievements: Arc<dyn AchievementCheck>,
}

impl QuizRunner {
    #[must_use]
    pub fn new(
        clock: Clock,
        catalog: Arc<dyn CatalogRepository>,
        attempts: Arc<dyn QuizAttemptRepository>,
        topic_progress: Arc<dyn TopicProgressRepository>,
        study_sessions: Arc<dyn StudySessionRepository>,
        session_state: SessionStateService,
        achievements: Arc<dyn AchievementCheck>,
    ) -> Self {
        Self {
            clock,
            catalog,
            attempts,
            topic_progress,
            study_sessions,
            session_state,
            achievements,
        }
    }

    /// Start a run over the topic's questions, picking up saved mid-quiz
    /// state when a live resume point exists.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Unavailable` when the topic has no questions;
    /// no attempt is ever recorded for such a topic. Storage failures
    /// surface as `QuizError::Storage`.
    pub async fn start(&self, user: UserId, topic: TopicId) -> Result<QuizSession, QuizError> {
        let now = self.clock.now();
        let questions = self.catalog.questions_for_topic(topic).await?;
        if questions.is_empty() {
            return Err(QuizError::Unavailable);
        }

        match self.session_state.resume(user, topic).await {
            Some(point) if point.has_quiz_state() => {
                if (point.question_index as usize) >= questions.len() {
                    tracing::warn!(
                        "saved quiz position {} for user {user} is out of range; starting fresh",
                        point.question_index
                    );
                    QuizSession::new(user, topic, questions, now)
                } else {
                    QuizSession::resume(user, topic, questions, &point, now)
                }
            }
            _ => QuizSession::new(user, topic, questions, now),
        }
    }

    /// Grade the current draft and save the run's position so an
    /// interrupted quiz can come back to it.
    ///
    /// # Errors
    ///
    /// Propagates the engine's check errors; the position save itself is
    /// best-effort and never fails the check.
    pub async fn check_current(
        &self,
        session: &mut QuizSession,
    ) -> Result<CheckOutcome, QuizError> {
        let outcome = session.check_answer()?;
        self.session_state
            .save_quiz_position(session.snapshot(self.clock.now()))
            .await;
        Ok(outcome)
    }

    /// Move the run forward. Finishing triggers the persistence chain:
    /// one attempt row, the topic rollup on a pass, the study time log,
    /// achievement checks and finally the resume point delete.
    ///
    /// # Errors
    ///
    /// Propagates the engine's advance errors and any storage failure in
    /// the finish chain.
    pub async fn advance(&self, session: &mut QuizSession) -> Result<QuizAdvance, QuizError> {
        let now = self.clock.now();
        match session.advance(now)? {
            Advance::Next => {
                self.session_state
                    .save_quiz_position(session.snapshot(now))
                    .await;
                Ok(QuizAdvance::Next)
            }
            Advance::Finished => {
                let outcome = self.finalize(session).await?;
                Ok(QuizAdvance::Finished(outcome))
            }
        }
    }

    /// Throw away saved state and hand back a fresh run over the same
    /// topic. Recorded attempts are history and stay untouched.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Unavailable` when the topic has no questions
    /// and `QuizError::State` when the resume point cannot be cleared.
    pub async fn retry(&self, user: UserId, topic: TopicId) -> Result<QuizSession, QuizError> {
        self.session_state.clear(user, topic).await?;
        let questions = self.catalog.questions_for_topic(topic).await?;
        QuizSession::new(user, topic, questions, self.clock.now())
    }

    async fn finalize(&self, session: &QuizSession) -> Result<QuizOutcome, QuizError> {
        let now = self.clock.now();
        let user = session.user_id();
        let topic = session.topic_id();
        let total = u32::try_from(session.total_questions()).unwrap_or(u32::MAX);

        let attempt =
            QuizAttempt::from_score(Uuid::new_v4(), user, topic, session.score(), total, now)?;
        self.attempts.append_attempt(&attempt).await?;

        let topic_completed = attempt.percentage() >= QUIZ_PASS_PERCENT;
        if topic_completed {
            let passed = TopicProgress::quiz_passed(user, topic, now);
            self.topic_progress.upsert_topic_progress(&passed).await?;
        }

        let minutes = quiz_minutes(total);
        let study = StudySession::new(user, minutes, now)?;
        self.study_sessions.append_session(&study).await?;

        let unlocked = match self.achievements.quiz_finished(&attempt).await {
            Ok(unlocked) => unlocked,
            Err(err) => {
                tracing::warn!("achievement check failed after quiz for user {user}: {err}");
                Vec::new()
            }
        };

        // a resume point must never describe a finished quiz
        self.session_state.clear(user, topic).await?;

        Ok(QuizOutcome {
            attempt,
            topic_completed,
            minutes_recorded: minutes,
            unlocked,
        })
    }
}

/// Study minutes credited for a quiz of `total` questions.
fn quiz_minutes(total: u32) -> u32 {
    let raw = (f64::from(total) * MINUTES_PER_QUESTION).round() as u32;
    raw.clamp(MIN_QUIZ_MINUTES, MAX_QUIZ_MINUTES)
}
