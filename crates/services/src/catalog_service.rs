use std::sync::Arc;

use study_core::model::{
    AnswerKey, Lesson, LessonId, Question, QuestionId, Topic, TopicId,
};
use storage::repository::{CatalogRepository, StorageError};

use crate::error::CatalogServiceError;

/// Orchestrates curriculum authoring: topics, their lessons and their
/// quiz questions, each appended at the next free position.
#[derive(Clone)]
pub struct CatalogService {
    catalog: Arc<dyn CatalogRepository>,
}

impl CatalogService {
    #[must_use]
    pub fn new(catalog: Arc<dyn CatalogRepository>) -> Self {
        Self { catalog }
    }

    /// Create a topic at the end of the catalog.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Catalog` for validation failures and
    /// `CatalogServiceError::Storage` if persistence fails.
    pub async fn create_topic(&self, name: &str) -> Result<Topic, CatalogServiceError> {
        let topics = self.catalog.list_topics().await?;
        let position = next_position(topics.iter().map(Topic::position));
        let topic = Topic::new(TopicId::new(), name, position)?;
        self.catalog.upsert_topic(&topic).await?;
        Ok(topic)
    }

    /// All topics in catalog order.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` if repository access fails.
    pub async fn list_topics(&self) -> Result<Vec<Topic>, CatalogServiceError> {
        let topics = self.catalog.list_topics().await?;
        Ok(topics)
    }

    /// Fetch a topic by id.
    ///
    /// Returns `Ok(None)` when the topic does not exist.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` if repository access fails.
    pub async fn get_topic(&self, id: TopicId) -> Result<Option<Topic>, CatalogServiceError> {
        let topic = self.catalog.get_topic(id).await?;
        Ok(topic)
    }

    /// Append a lesson to an existing topic.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage(StorageError::NotFound)` for
    /// an unknown topic and `CatalogServiceError::Catalog` for validation
    /// failures.
    pub async fn add_lesson(
        &self,
        topic: TopicId,
        title: &str,
        body: &str,
    ) -> Result<Lesson, CatalogServiceError> {
        self.catalog
            .get_topic(topic)
            .await?
            .ok_or(StorageError::NotFound)?;

        let lessons = self.catalog.lessons_for_topic(topic).await?;
        let position = next_position(lessons.iter().map(Lesson::position));
        let lesson = Lesson::new(LessonId::new(), topic, title, body, position)?;
        self.catalog.upsert_lesson(&lesson).await?;
        Ok(lesson)
    }

    /// Lessons of a topic in reading order.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` if repository access fails.
    pub async fn lessons(&self, topic: TopicId) -> Result<Vec<Lesson>, CatalogServiceError> {
        let lessons = self.catalog.lessons_for_topic(topic).await?;
        Ok(lessons)
    }

    /// Append a free-text question to an existing topic. The answer and
    /// its explanation are stored as one piped key.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Key` when the answer is blank or
    /// contains the separator, `CatalogServiceError::Storage(NotFound)`
    /// for an unknown topic.
    pub async fn add_question(
        &self,
        topic: TopicId,
        prompt: &str,
        answer: &str,
        explanation: &str,
    ) -> Result<Question, CatalogServiceError> {
        self.catalog
            .get_topic(topic)
            .await?
            .ok_or(StorageError::NotFound)?;

        let key = AnswerKey::from_parts(answer, explanation)?;
        let questions = self.catalog.questions_for_topic(topic).await?;
        let position = next_position(questions.iter().map(Question::position));
        let question = Question::new(QuestionId::new(), topic, prompt, key, position)?;
        self.catalog.upsert_question(&question).await?;
        Ok(question)
    }

    /// Questions of a topic in quiz order.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` if repository access fails.
    pub async fn questions(&self, topic: TopicId) -> Result<Vec<Question>, CatalogServiceError> {
        let questions = self.catalog.questions_for_topic(topic).await?;
        Ok(questions)
    }
}

fn next_position(existing: impl Iterator<Item = u32>) -> u32 {
    existing.max().map_or(0, |p| p + 1)
}
