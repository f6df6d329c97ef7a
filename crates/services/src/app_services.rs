use std::sync::Arc;

use study_core::Clock;
use study_core::model::{Profile, UserId};
use storage::repository::{ProfileRepository, Storage};

use crate::achievement_service::{AchievementCheck, AchievementService};
use crate::catalog_service::CatalogService;
use crate::chat_service::ChatService;
use crate::content_gen_service::ContentGenService;
use crate::error::AppServicesError;
use crate::lesson_service::LessonFlowService;
use crate::progress_service::ProgressService;
use crate::quiz::QuizRunner;
use crate::session_state_service::SessionStateService;

const DEFAULT_DISPLAY_NAME: &str = "Learner";

/// Assembles app-facing services and resolves a usable learner id.
#[derive(Clone)]
pub struct AppServices {
    user_id: UserId,
    created_profile: bool,
    progress: Arc<ProgressService>,
    session_state: SessionStateService,
    quiz: Arc<QuizRunner>,
    lessons: Arc<LessonFlowService>,
    catalog: Arc<CatalogService>,
    achievements: Arc<AchievementService>,
    chat: Arc<ChatService>,
    content_gen: Arc<ContentGenService>,
}

impl std::fmt::Debug for AppServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppServices")
            .field("user_id", &self.user_id)
            .field("created_profile", &self.created_profile)
            .finish_non_exhaustive()
    }
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError::NotConfigured` for a blank database url,
    /// otherwise errors from storage initialization or profile setup.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        preferred_user_id: Option<UserId>,
    ) -> Result<Self, AppServicesError> {
        if db_url.trim().is_empty() {
            return Err(AppServicesError::NotConfigured);
        }
        let storage = Storage::sqlite(db_url).await?;
        Self::build(storage, clock, preferred_user_id).await
    }

    /// Build services over the in-memory backend, for tests and demos.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if default profile setup fails.
    pub async fn new_in_memory(
        clock: Clock,
        preferred_user_id: Option<UserId>,
    ) -> Result<Self, AppServicesError> {
        Self::build(Storage::in_memory(), clock, preferred_user_id).await
    }

    async fn build(
        storage: Storage,
        clock: Clock,
        preferred_user_id: Option<UserId>,
    ) -> Result<Self, AppServicesError> {
        let (user_id, created_profile) =
            ensure_default_profile(storage.profiles.as_ref(), preferred_user_id).await?;

        let achievements = Arc::new(AchievementService::new(
            clock,
            Arc::clone(&storage.achievements),
            Arc::clone(&storage.study_sessions),
        ));
        let achievement_check: Arc<dyn AchievementCheck> = achievements.clone();

        let session_state = SessionStateService::new(clock, Arc::clone(&storage.resume));
        let progress = Arc::new(ProgressService::new(
            clock,
            Arc::clone(&storage.profiles),
            Arc::clone(&storage.study_sessions),
            Arc::clone(&storage.quiz_attempts),
            Arc::clone(&storage.topic_progress),
        ));
        let quiz = Arc::new(QuizRunner::new(
            clock,
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.quiz_attempts),
            Arc::clone(&storage.topic_progress),
            Arc::clone(&storage.study_sessions),
            session_state.clone(),
            Arc::clone(&achievement_check),
        ));
        let lessons = Arc::new(LessonFlowService::new(
            clock,
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.lesson_progress),
            Arc::clone(&storage.topic_progress),
            Arc::clone(&storage.study_sessions),
            achievement_check,
        ));
        let catalog = Arc::new(CatalogService::new(Arc::clone(&storage.catalog)));
        let chat = Arc::new(ChatService::new(
            clock,
            Arc::clone(&storage.chat),
            storage.chat_feed.clone(),
        ));
        let content_gen = Arc::new(ContentGenService::from_env());

        Ok(Self {
            user_id,
            created_profile,
            progress,
            session_state,
            quiz,
            lessons,
            catalog,
            achievements,
            chat,
            content_gen,
        })
    }

    /// The learner every command in this process acts as.
    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    /// True when bootstrap had to create the profile.
    #[must_use]
    pub fn created_profile(&self) -> bool {
        self.created_profile
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn session_state(&self) -> SessionStateService {
        self.session_state.clone()
    }

    #[must_use]
    pub fn quiz(&self) -> Arc<QuizRunner> {
        Arc::clone(&self.quiz)
    }

    #[must_use]
    pub fn lessons(&self) -> Arc<LessonFlowService> {
        Arc::clone(&self.lessons)
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<CatalogService> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn achievements(&self) -> Arc<AchievementService> {
        Arc::clone(&self.achievements)
    }

    #[must_use]
    pub fn chat(&self) -> Arc<ChatService> {
        Arc::clone(&self.chat)
    }

    #[must_use]
    pub fn content_gen(&self) -> Arc<ContentGenService> {
        Arc::clone(&self.content_gen)
    }
}

async fn ensure_default_profile(
    profiles: &dyn ProfileRepository,
    preferred_user_id: Option<UserId>,
) -> Result<(UserId, bool), AppServicesError> {
    if let Some(preferred) = preferred_user_id {
        if profiles.get_profile(preferred).await?.is_some() {
            return Ok((preferred, false));
        }
        // A configured id pins the learner's identity across runs even
        // against a fresh database.
        let profile = Profile::new(preferred, DEFAULT_DISPLAY_NAME, None)?;
        profiles.upsert_profile(&profile).await?;
        return Ok((preferred, true));
    }

    let existing = profiles.list_profiles(1).await?;
    if let Some(first) = existing.first() {
        return Ok((first.user_id(), false));
    }

    let profile = Profile::new(UserId::new(), DEFAULT_DISPLAY_NAME, None)?;
    profiles.upsert_profile(&profile).await?;
    Ok((profile.user_id(), true))
}

#[cfg(test)]
mod tests {
    use super::*;

    use study_core::time::fixed_clock;

    #[tokio::test]
    async fn bootstrap_creates_a_default_profile_once() {
        let services = AppServices::new_in_memory(fixed_clock(), None)
            .await
            .unwrap();
        assert!(services.created_profile());

        let stats = services.progress().refresh_stats(services.user_id()).await;
        assert_eq!(stats.streak_days, 0);
    }

    #[tokio::test]
    async fn a_preferred_user_id_is_adopted_when_missing() {
        let wanted = UserId::new();
        let services = AppServices::new_in_memory(fixed_clock(), Some(wanted))
            .await
            .unwrap();
        assert_eq!(services.user_id(), wanted);
        assert!(services.created_profile());
    }

    #[tokio::test]
    async fn a_blank_database_url_is_rejected() {
        let err = AppServices::new_sqlite("  ", fixed_clock(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppServicesError::NotConfigured));
    }
}
