use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::model::{TopicId, UserId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StudySessionError {
    #[error("study session minutes must be at least 1, got {minutes}")]
    InvalidMinutes { minutes: u32 },
}

/// One logged block of study activity, immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudySession {
    user_id: UserId,
    minutes: u32,
    recorded_at: DateTime<Utc>,
}

impl StudySession {
    /// Creates a study session of `minutes` minutes ending at `recorded_at`.
    ///
    /// # Errors
    ///
    /// Returns `StudySessionError::InvalidMinutes` when `minutes` is zero.
    pub fn new(
        user_id: UserId,
        minutes: u32,
        recorded_at: DateTime<Utc>,
    ) -> Result<Self, StudySessionError> {
        if minutes == 0 {
            return Err(StudySessionError::InvalidMinutes { minutes });
        }
        Ok(Self {
            user_id,
            minutes,
            recorded_at,
        })
    }

    /// Rehydrate a study session from persisted storage.
    ///
    /// # Errors
    ///
    /// Same validation as [`StudySession::new`].
    pub fn from_persisted(
        user_id: UserId,
        minutes: u32,
        recorded_at: DateTime<Utc>,
    ) -> Result<Self, StudySessionError> {
        Self::new(user_id, minutes, recorded_at)
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn minutes(&self) -> u32 {
        self.minutes
    }

    #[must_use]
    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizAttemptError {
    #[error("a quiz attempt needs at least one question")]
    NoQuestions,

    #[error("score ({score}) exceeds total questions ({total})")]
    ScoreExceedsTotal { score: u32, total: u32 },

    #[error("stored percentage ({stored}) does not match score/total ({computed})")]
    PercentageMismatch { stored: u8, computed: u8 },
}

/// The immutable record of one finished quiz run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizAttempt {
    id: Uuid,
    user_id: UserId,
    topic_id: TopicId,
    score: u32,
    total_questions: u32,
    percentage: u8,
    recorded_at: DateTime<Utc>,
}

impl QuizAttempt {
    /// Build an attempt from a raw score, deriving the rounded percentage.
    ///
    /// # Errors
    ///
    /// Returns `QuizAttemptError::NoQuestions` when `total_questions` is zero
    /// and `QuizAttemptError::ScoreExceedsTotal` when the score is impossible.
    pub fn from_score(
        id: Uuid,
        user_id: UserId,
        topic_id: TopicId,
        score: u32,
        total_questions: u32,
        recorded_at: DateTime<Utc>,
    ) -> Result<Self, QuizAttemptError> {
        if total_questions == 0 {
            return Err(QuizAttemptError::NoQuestions);
        }
        if score > total_questions {
            return Err(QuizAttemptError::ScoreExceedsTotal {
                score,
                total: total_questions,
            });
        }
        let percentage = score_percentage(score, total_questions);

        Ok(Self {
            id,
            user_id,
            topic_id,
            score,
            total_questions,
            percentage,
            recorded_at,
        })
    }

    /// Rehydrate an attempt from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `QuizAttemptError::PercentageMismatch` if the stored percentage
    /// does not agree with the stored score and total.
    pub fn from_persisted(
        id: Uuid,
        user_id: UserId,
        topic_id: TopicId,
        score: u32,
        total_questions: u32,
        percentage: u8,
        recorded_at: DateTime<Utc>,
    ) -> Result<Self, QuizAttemptError> {
        let attempt = Self::from_score(id, user_id, topic_id, score, total_questions, recorded_at)?;
        if attempt.percentage != percentage {
            return Err(QuizAttemptError::PercentageMismatch {
                stored: percentage,
                computed: attempt.percentage,
            });
        }
        Ok(attempt)
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
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
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn total_questions(&self) -> u32 {
        self.total_questions
    }

    #[must_use]
    pub fn percentage(&self) -> u8 {
        self.percentage
    }

    #[must_use]
    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }
}

/// A quiz run at or above this percentage completes its topic.
pub const QUIZ_PASS_PERCENT: u8 = 90;

/// Rounded percentage for `score` out of `total` questions.
///
/// Callers must ensure `total > 0` and `score <= total`.
#[must_use]
pub fn score_percentage(score: u32, total: u32) -> u8 {
    let ratio = f64::from(score) / f64::from(total);
    (ratio * 100.0).round() as u8
}
