use study_core::model::{StudySession, UserId};

use super::SqliteRepository;
use super::mapping::map_session_row;
use crate::repository::{StorageError, StudySessionRepository};

#[async_trait::async_trait]
impl StudySessionRepository for SqliteRepository {
    async fn append_session(&self, session: &StudySession) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO study_sessions (user_id, minutes, recorded_at)
                VALUES (?1, ?2, ?3)
            ",
        )
        .bind(session.user_id().to_string())
        .bind(i64::from(session.minutes()))
        .bind(session.recorded_at())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn sessions_for_user(&self, user: UserId) -> Result<Vec<StudySession>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT user_id, minutes, recorded_at
                FROM study_sessions
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
            out.push(map_session_row(&row)?);
        }

        Ok(out)
    }
}
