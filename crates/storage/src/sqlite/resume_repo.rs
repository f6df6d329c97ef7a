use study_core::model::{ResumePoint, TopicId, UserId};

use super::SqliteRepository;
use super::mapping::{answers_to_json, map_resume_row};
use crate::repository::{ResumeRepository, StorageError};

#[async_trait::async_trait]
impl ResumeRepository for SqliteRepository {
    async fn save_resume_point(&self, point: &ResumePoint) -> Result<(), StorageError> {
        let answers = answers_to_json(&point.answers)?;

        sqlx::query(
            r"
                INSERT INTO user_session_state (
                    user_id, topic_id, lesson_id, question_index, answers, score, updated_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                ON CONFLICT(user_id, topic_id) DO UPDATE SET
                    lesson_id = excluded.lesson_id,
                    question_index = excluded.question_index,
                    answers = excluded.answers,
                    score = excluded.score,
                    updated_at = excluded.updated_at
            ",
        )
        .bind(point.user_id.to_string())
        .bind(point.topic_id.to_string())
        .bind(point.lesson_id.map(|id| id.to_string()))
        .bind(i64::from(point.question_index))
        .bind(answers)
        .bind(i64::from(point.score))
        .bind(point.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn get_resume_point(
        &self,
        user: UserId,
        topic: TopicId,
    ) -> Result<Option<ResumePoint>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT user_id, topic_id, lesson_id, question_index, answers, score, updated_at
                FROM user_session_state
                WHERE user_id = ?1 AND topic_id = ?2
            ",
        )
        .bind(user.to_string())
        .bind(topic.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_resume_row).transpose()
    }

    async fn clear_resume_point(&self, user: UserId, topic: TopicId) -> Result<(), StorageError> {
        sqlx::query(
            r"
                DELETE FROM user_session_state
                WHERE user_id = ?1 AND topic_id = ?2
            ",
        )
        .bind(user.to_string())
        .bind(topic.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }
}
