//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;
use study_core::model::{
    AchievementError, AnswerKeyError, CatalogError, ChatError, ProfileError, QuizAttemptError,
    StudySessionError,
};

/// Errors emitted by the quiz engine and runner.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizError {
    #[error("no questions available for this topic")]
    Unavailable,
    #[error("quiz already finished")]
    Completed,
    #[error("answer is empty")]
    EmptyAnswer,
    #[error("current question was already checked")]
    AlreadyChecked,
    #[error("current question has not been checked yet")]
    NotChecked,
    #[error(transparent)]
    Attempt(#[from] QuizAttemptError),
    #[error(transparent)]
    Study(#[from] StudySessionError),
    #[error(transparent)]
    State(#[from] SessionStateError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `LessonFlowService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LessonError {
    #[error("lesson dwell of {seconds}s is too short to complete")]
    DwellTooShort { seconds: u32 },
    #[error(transparent)]
    Study(#[from] StudySessionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `SessionStateService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionStateError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `CatalogService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogServiceError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Key(#[from] AnswerKeyError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `AchievementService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AchievementServiceError {
    #[error(transparent)]
    Achievement(#[from] AchievementError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ChatService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ChatServiceError {
    #[error(transparent)]
    Chat(#[from] ChatError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ContentGenService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ContentGenError {
    #[error("content generation is not configured")]
    Disabled,
    #[error("content generation returned an empty or unusable response")]
    EmptyResponse,
    #[error("content generation request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error("storage is not configured; set a database url")]
    NotConfigured,
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Profile(#[from] ProfileError),
}
