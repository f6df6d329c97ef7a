use std::sync::Arc;
use std::time::Duration;

use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use thiserror::Error;

use crate::realtime::ChatFeed;
use crate::repository::{
    AchievementRepository, CatalogRepository, ChatMessageRepository, LessonProgressRepository,
    ProfileRepository, QuizAttemptRepository, ResumeRepository, Storage, StudySessionRepository,
    TopicProgressRepository,
};

mod achievement_repo;
mod catalog_repo;
mod chat_repo;
mod lesson_progress_repo;
mod mapping;
mod migrate;
mod profile_repo;
mod quiz_attempt_repo;
mod resume_repo;
mod study_session_repo;
mod topic_progress_repo;

#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
    feed: ChatFeed,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl SqliteRepository {
    /// Connect to `SQLite` using the given URL.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the connection cannot be established or if
    /// enforcing foreign key constraints fails during setup.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA foreign_keys = ON;")
                        .execute(&mut *conn)
                        .await?;
                    sqlx::query("PRAGMA journal_mode = WAL;")
                        .execute(&mut *conn)
                        .await?;
                    sqlx::query("PRAGMA busy_timeout = 5000;")
                        .execute(&mut *conn)
                        .await?;
                    Ok(())
                })
            })
            .connect(database_url)
            .await?;
        Ok(Self {
            pool,
            feed: ChatFeed::new(),
        })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// The live feed this backend publishes chat inserts to.
    #[must_use]
    pub fn feed(&self) -> ChatFeed {
        self.feed.clone()
    }

    /// Create tables if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if migration queries fail.
    pub async fn migrate(&self) -> Result<(), SqliteInitError> {
        migrate::run_migrations(&self.pool).await
    }
}

impl Storage {
    /// Build a `Storage` backed by `SQLite`.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if connection or migrations cannot be
    /// completed.
    pub async fn sqlite(database_url: &str) -> Result<Self, SqliteInitError> {
        let repo = SqliteRepository::connect(database_url).await?;
        repo.migrate().await?;
        let chat_feed = repo.feed();
        let profiles: Arc<dyn ProfileRepository> = Arc::new(repo.clone());
        let catalog: Arc<dyn CatalogRepository> = Arc::new(repo.clone());
        let study_sessions: Arc<dyn StudySessionRepository> = Arc::new(repo.clone());
        let quiz_attempts: Arc<dyn QuizAttemptRepository> = Arc::new(repo.clone());
        let lesson_progress: Arc<dyn LessonProgressRepository> = Arc::new(repo.clone());
        let topic_progress: Arc<dyn TopicProgressRepository> = Arc::new(repo.clone());
        let resume: Arc<dyn ResumeRepository> = Arc::new(repo.clone());
        let achievements: Arc<dyn AchievementRepository> = Arc::new(repo.clone());
        let chat: Arc<dyn ChatMessageRepository> = Arc::new(repo);
        Ok(Self {
            profiles,
            catalog,
            study_sessions,
            quiz_attempts,
            lesson_progress,
            topic_progress,
            resume,
            achievements,
            chat,
            chat_feed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SqliteRepository>();
    }
}
