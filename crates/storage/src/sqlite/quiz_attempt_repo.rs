use study_core::model::{QuizAttempt, TopicId, UserId};

use super::SqliteRepository;
use super::mapping::map_attempt_row;
use crate::repository::{QuizAttemptRepository, StorageError};

#[async_trait::async_trait]
impl QuizAttemptRepository for SqliteRepository {
    async fn append_attempt(&self, attempt: &QuizAttempt) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO quiz_attempts (
                    id, user_id, topic_id, score, total_questions, percentage, recorded_at
                )
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(attempt.id().to_string())
        .bind(attempt.user_id().to_string())
        .bind(attempt.topic_id().to_string())
        .bind(i64::from(attempt.score()))
        .bind(i64::from(attempt.total_questions()))
        .bind(i64::from(attempt.percentage()))
        .bind(attempt.recorded_at())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn attempts_for_user(&self, user: UserId) -> Result<Vec<QuizAttempt>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, user_id, topic_id, score, total_questions, percentage, recorded_at
                FROM quiz_attempts
                WHERE user_id = ?1
                ORDER BY recorded_at ASC, id ASC
            ",
        )
        .bind(user.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_attempt_row(&row)?);
        }

        Ok(out)
    }

    async fn attempts_for_topic(
        &self,
        user: UserId,
        topic: TopicId,
    ) -> Result<Vec<QuizAttempt>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT id, user_id, topic_id, score, total_questions, percentage, recorded_at
                FROM quiz_attempts
                WHERE user_id = ?1 AND topic_id = ?2
                ORDER BY recorded_at ASC, id ASC
            ",
        )
        .bind(user.to_string())
        .bind(topic.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_attempt_row(&row)?);
        }

        Ok(out)
    }
}
