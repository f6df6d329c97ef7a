#![forbid(unsafe_code)]

pub mod achievement_service;
pub mod app_services;
pub mod catalog_service;
pub mod chat_service;
pub mod content_gen_service;
pub mod error;
pub mod lesson_service;
pub mod progress_service;
pub mod quiz;
pub mod session_state_service;

pub use study_core::Clock;

pub use error::{
    AchievementServiceError, AppServicesError, CatalogServiceError, ChatServiceError,
    ContentGenError, LessonError, QuizError, SessionStateError,
};

pub use achievement_service::{AchievementCheck, AchievementService, NoopAchievementCheck};
pub use app_services::AppServices;
pub use catalog_service::CatalogService;
pub use chat_service::ChatService;
pub use content_gen_service::{ContentGenService, GeneratedQuestion, GeneratedTopicContent};
pub use lesson_service::{LessonFlowService, LessonOutcome};
pub use progress_service::{Leaderboard, LeaderboardEntry, ProgressService};
pub use quiz::{
    Advance, CheckOutcome, QuizAdvance, QuizOutcome, QuizProgress, QuizRunner, QuizSession,
};
pub use session_state_service::{LessonTarget, SessionStateService};
