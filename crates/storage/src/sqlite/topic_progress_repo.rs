use study_core::model::{TopicId, TopicProgress, UserId};

use super::SqliteRepository;
use super::mapping::map_topic_progress_row;
use crate::repository::{StorageError, TopicProgressRepository};

#[async_trait::async_trait]
impl TopicProgressRepository for SqliteRepository {
    async fn upsert_topic_progress(&self, progress: &TopicProgress) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO user_topic_progress (user_id, topic_id, percent, completed, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT(user_id, topic_id) DO UPDATE SET
                    percent = excluded.percent,
                    completed = excluded.completed,
                    updated_at = excluded.updated_at
            ",
        )
        .bind(progress.user_id().to_string())
        .bind(progress.topic_id().to_string())
        .bind(i64::from(progress.percent()))
        .bind(progress.is_completed())
        .bind(progress.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn get_topic_progress(
        &self,
        user: UserId,
        topic: TopicId,
    ) -> Result<Option<TopicProgress>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT user_id, topic_id, percent, completed, updated_at
                FROM user_topic_progress
                WHERE user_id = ?1 AND topic_id = ?2
            ",
        )
        .bind(user.to_string())
        .bind(topic.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_topic_progress_row).transpose()
    }

    async fn topic_progress_for_user(
        &self,
        user: UserId,
    ) -> Result<Vec<TopicProgress>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT user_id, topic_id, percent, completed, updated_at
                FROM user_topic_progress
                WHERE user_id = ?1
            ",
        )
        .bind(user.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_topic_progress_row(&row)?);
        }

        Ok(out)
    }
}
