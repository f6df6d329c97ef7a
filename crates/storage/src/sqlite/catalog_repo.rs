use study_core::model::{Lesson, Question, Topic, TopicId};

use super::SqliteRepository;
use super::mapping::{map_lesson_row, map_question_row, map_topic_row};
use crate::repository::{CatalogRepository, StorageError};

#[async_trait::async_trait]
impl CatalogRepository for SqliteRepository {
    async fn upsert_topic(&self, topic: &Topic) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO topics (id, name, position)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(id) DO UPDATE SET
                    name = excluded.name,
                    position = excluded.position
            ",
        )
        .bind(topic.id().to_string())
        .bind(topic.name())
        .bind(i64::from(topic.position()))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn get_topic(&self, id: TopicId) -> Result<Option<Topic>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT id, name, position
                FROM topics
                WHERE id = ?1
            ",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_topic_row).transpose()
    }

    async fn list_topics(&self) -> Result<Vec<Topic>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, name, position
                FROM topics
                ORDER BY position ASC, name ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_topic_row(&row)?);
        }

        Ok(out)
    }

    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO lessons (id, topic_id, title, body, position)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(id) DO UPDATE SET
                    topic_id = excluded.topic_id,
                    title = excluded.title,
                    body = excluded.body,
                    position = excluded.position
            ",
        )
        .bind(lesson.id().to_string())
        .bind(lesson.topic_id().to_string())
        .bind(lesson.title())
        .bind(lesson.body())
        .bind(i64::from(lesson.position()))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn lessons_for_topic(&self, topic: TopicId) -> Result<Vec<Lesson>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, topic_id, title, body, position
                FROM lessons
                WHERE topic_id = ?1
                ORDER BY position ASC, id ASC
            ",
        )
        .bind(topic.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_lesson_row(&row)?);
        }

        Ok(out)
    }

    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO questions (id, topic_id, prompt, answer_key, position)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(id) DO UPDATE SET
                    topic_id = excluded.topic_id,
                    prompt = excluded.prompt,
                    answer_key = excluded.answer_key,
                    position = excluded.position
            ",
        )
        .bind(question.id().to_string())
        .bind(question.topic_id().to_string())
        .bind(question.prompt())
        .bind(question.key().raw())
        .bind(i64::from(question.position()))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn questions_for_topic(&self, topic: TopicId) -> Result<Vec<Question>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, topic_id, prompt, answer_key, position
                FROM questions
                WHERE topic_id = ?1
                ORDER BY position ASC, id ASC
            ",
        )
        .bind(topic.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_question_row(&row)?);
        }

        Ok(out)
    }
}
