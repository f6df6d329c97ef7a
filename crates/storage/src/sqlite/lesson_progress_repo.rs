use study_core::model::{LessonId, LessonProgress, UserId};

use super::SqliteRepository;
use super::mapping::map_lesson_progress_row;
use crate::repository::{LessonProgressRepository, StorageError};

#[async_trait::async_trait]
impl LessonProgressRepository for SqliteRepository {
    async fn upsert_lesson_progress(&self, progress: &LessonProgress) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO user_lesson_progress (user_id, lesson_id, completed, updated_at)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(user_id, lesson_id) DO UPDATE SET
                    completed = excluded.completed,
                    updated_at = excluded.updated_at
            ",
        )
        .bind(progress.user_id().to_string())
        .bind(progress.lesson_id().to_string())
        .bind(progress.is_completed())
        .bind(progress.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn get_lesson_progress(
        &self,
        user: UserId,
        lesson: LessonId,
    ) -> Result<Option<LessonProgress>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT user_id, lesson_id, completed, updated_at
                FROM user_lesson_progress
                WHERE user_id = ?1 AND lesson_id = ?2
            ",
        )
        .bind(user.to_string())
        .bind(lesson.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_lesson_progress_row).transpose()
    }

    async fn lesson_progress_for_user(
        &self,
        user: UserId,
    ) -> Result<Vec<LessonProgress>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT user_id, lesson_id, completed, updated_at
                FROM user_lesson_progress
                WHERE user_id = ?1
            ",
        )
        .bind(user.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_lesson_progress_row(&row)?);
        }

        Ok(out)
    }
}
