use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::model::ids::{LessonId, QuestionId, TopicId, UserId};

/// A learner's saved response to one question, kept so a resumed quiz can
/// restore both the answer box and the working-out notes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedAnswer {
    pub answer: String,
    pub working: String,
}

impl SavedAnswer {
    #[must_use]
    pub fn new(answer: impl Into<String>, working: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            working: working.into(),
        }
    }
}

/// Where a learner left off inside a topic. One row per (user, topic);
/// every save overwrites the previous one.
///
/// Covers both halves of a topic: `lesson_id` points at reading material,
/// the quiz fields describe an unfinished quiz run. A finished quiz never
/// leaves a resume point behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumePoint {
    pub user_id: UserId,
    pub topic_id: TopicId,
    pub lesson_id: Option<LessonId>,
    pub question_index: u32,
    pub answers: HashMap<QuestionId, SavedAnswer>,
    pub score: u32,
    pub updated_at: DateTime<Utc>,
}

impl ResumePoint {
    /// A fresh resume point with nothing saved yet.
    #[must_use]
    pub fn new(user_id: UserId, topic_id: TopicId, updated_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            topic_id,
            lesson_id: None,
            question_index: 0,
            answers: HashMap::new(),
            score: 0,
            updated_at,
        }
    }

    /// True when the point carries mid-quiz state worth restoring.
    #[must_use]
    pub fn has_quiz_state(&self) -> bool {
        self.question_index > 0 || !self.answers.is_empty()
    }

    /// The saved response for a question, if any.
    #[must_use]
    pub fn saved_answer(&self, question: QuestionId) -> Option<&SavedAnswer> {
        self.answers.get(&question)
    }
}
