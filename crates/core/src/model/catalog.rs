use thiserror::Error;

use crate::model::ids::{LessonId, QuestionId, TopicId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("topic name cannot be empty")]
    EmptyTopicName,

    #[error("lesson title cannot be empty")]
    EmptyLessonTitle,

    #[error("question prompt cannot be empty")]
    EmptyPrompt,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum AnswerKeyError {
    #[error("correct answer cannot be empty")]
    EmptyAnswer,

    #[error("correct answer cannot contain the '|' separator")]
    AnswerContainsSeparator,
}

//
// ─── ANSWER KEY ────────────────────────────────────────────────────────────────
//

/// The persisted answer field of a question.
///
/// Stored as a single string where everything before the first `|` is the
/// correct answer and everything after it is the explanation shown on a
/// miss. `"4|because 2+2=4"` has answer `4` and explanation
/// `because 2+2=4`; a string without `|` has an empty explanation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerKey {
    raw: String,
}

impl AnswerKey {
    /// Wraps a persisted raw value. Any string is accepted; the split is
    /// applied on access.
    #[must_use]
    pub fn parse(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    /// Builds a key from a separate answer and explanation.
    ///
    /// # Errors
    ///
    /// Returns `AnswerKeyError::EmptyAnswer` for a blank answer and
    /// `AnswerKeyError::AnswerContainsSeparator` when the answer itself
    /// contains `|`, which would corrupt the encoding.
    pub fn from_parts(answer: &str, explanation: &str) -> Result<Self, AnswerKeyError> {
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(AnswerKeyError::EmptyAnswer);
        }
        if answer.contains('|') {
            return Err(AnswerKeyError::AnswerContainsSeparator);
        }
        let raw = if explanation.is_empty() {
            answer.to_string()
        } else {
            format!("{answer}|{explanation}")
        };
        Ok(Self { raw })
    }

    /// The correct answer: the segment before the first `|`, or the whole
    /// string when there is none.
    #[must_use]
    pub fn answer(&self) -> &str {
        match self.raw.split_once('|') {
            Some((answer, _)) => answer,
            None => &self.raw,
        }
    }

    /// The explanation: everything after the first `|`. Further `|`
    /// characters belong to the explanation text.
    #[must_use]
    pub fn explanation(&self) -> &str {
        match self.raw.split_once('|') {
            Some((_, explanation)) => explanation,
            None => "",
        }
    }

    /// The raw persisted encoding.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

//
// ─── CATALOG ENTITIES ──────────────────────────────────────────────────────────
//

/// A subject area grouping lessons and quiz questions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    id: TopicId,
    name: String,
    position: u32,
}

impl Topic {
    /// Creates a topic with a trimmed, non-empty name.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::EmptyTopicName` when the name is blank.
    pub fn new(id: TopicId, name: &str, position: u32) -> Result<Self, CatalogError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(CatalogError::EmptyTopicName);
        }
        Ok(Self {
            id,
            name: name.to_string(),
            position,
        })
    }

    #[must_use]
    pub fn id(&self) -> TopicId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn position(&self) -> u32 {
        self.position
    }
}

/// One unit of reading material inside a topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lesson {
    id: LessonId,
    topic_id: TopicId,
    title: String,
    body: String,
    position: u32,
}

impl Lesson {
    /// Creates a lesson with a trimmed, non-empty title. The body may be
    /// empty while content is still being authored.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::EmptyLessonTitle` when the title is blank.
    pub fn new(
        id: LessonId,
        topic_id: TopicId,
        title: &str,
        body: &str,
        position: u32,
    ) -> Result<Self, CatalogError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(CatalogError::EmptyLessonTitle);
        }
        Ok(Self {
            id,
            topic_id,
            title: title.to_string(),
            body: body.to_string(),
            position,
        })
    }

    #[must_use]
    pub fn id(&self) -> LessonId {
        self.id
    }

    #[must_use]
    pub fn topic_id(&self) -> TopicId {
        self.topic_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    #[must_use]
    pub fn position(&self) -> u32 {
        self.position
    }
}

/// A free-text quiz question belonging to a topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    id: QuestionId,
    topic_id: TopicId,
    prompt: String,
    key: AnswerKey,
    position: u32,
}

impl Question {
    /// Creates a question with a trimmed, non-empty prompt.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::EmptyPrompt` when the prompt is blank.
    pub fn new(
        id: QuestionId,
        topic_id: TopicId,
        prompt: &str,
        key: AnswerKey,
        position: u32,
    ) -> Result<Self, CatalogError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(CatalogError::EmptyPrompt);
        }
        Ok(Self {
            id,
            topic_id,
            prompt: prompt.to_string(),
            key,
            position,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn topic_id(&self) -> TopicId {
        self.topic_id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub fn key(&self) -> &AnswerKey {
        &self.key
    }

    #[must_use]
    pub fn position(&self) -> u32 {
        self.position
    }
}

// ─── Tests ─────────────────────────────────────────────────────────────────────
