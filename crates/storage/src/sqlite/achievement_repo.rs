use chrono::{DateTime, Utc};
use study_core::model::{AchievementCode, UserId};

use super::SqliteRepository;
use super::mapping::map_achievement_row;
use crate::repository::{AchievementRepository, StorageError, UnlockedAchievement};

#[async_trait::async_trait]
impl AchievementRepository for SqliteRepository {
    async fn unlock(
        &self,
        user: UserId,
        code: &AchievementCode,
        at: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        // DO NOTHING keeps the first unlock timestamp on repeats.
        let res = sqlx::query(
            r"
                INSERT INTO user_achievements (user_id, code, unlocked_at)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(user_id, code) DO NOTHING
            ",
        )
        .bind(user.to_string())
        .bind(code.as_str())
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(res.rows_affected() > 0)
    }

    async fn unlocked_for_user(
        &self,
        user: UserId,
    ) -> Result<Vec<UnlockedAchievement>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT code, unlocked_at
                FROM user_achievements
                WHERE user_id = ?1
                ORDER BY unlocked_at ASC, code ASC
            ",
        )
        .bind(user.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_achievement_row(&row)?);
        }

        Ok(out)
    }
}
