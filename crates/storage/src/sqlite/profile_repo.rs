use study_core::model::{Profile, UserId};

use super::SqliteRepository;
use super::mapping::map_profile_row;
use crate::repository::{ProfileRepository, StorageError};

#[async_trait::async_trait]
impl ProfileRepository for SqliteRepository {
    async fn upsert_profile(&self, profile: &Profile) -> Result<(), StorageError> {
        sqlx::query(
            r"
                INSERT INTO profiles (user_id, display_name, grade_level)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(user_id) DO UPDATE SET
                    display_name = excluded.display_name,
                    grade_level = excluded.grade_level
            ",
        )
        .bind(profile.user_id().to_string())
        .bind(profile.display_name())
        .bind(profile.grade_level().map(i64::from))
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn get_profile(&self, user: UserId) -> Result<Option<Profile>, StorageError> {
        let row = sqlx::query(
            r"
                SELECT user_id, display_name, grade_level
                FROM profiles
                WHERE user_id = ?1
            ",
        )
        .bind(user.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_profile_row).transpose()
    }

    async fn list_profiles(&self, limit: u32) -> Result<Vec<Profile>, StorageError> {
        let rows = sqlx::query(
            r"
                SELECT user_id, display_name, grade_level
                FROM profiles
                ORDER BY display_name ASC, user_id ASC
                LIMIT ?1
            ",
        )
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(map_profile_row(&row)?);
        }

        Ok(out)
    }
}
