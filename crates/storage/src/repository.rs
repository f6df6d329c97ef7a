use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use study_core::model::{
    AchievementCode, ChatMessage, Lesson, LessonId, LessonProgress, Profile, Question, QuestionId,
    QuizAttempt, ResumePoint, StudySession, Topic, TopicId, TopicProgress, UserId,
};

use crate::realtime::{ChangeKind, ChatEvent, ChatFeed};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Persisted shape for one unlocked achievement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnlockedAchievement {
    pub code: AchievementCode,
    pub unlocked_at: DateTime<Utc>,
}

//
// ─── REPOSITORY CONTRACTS ──────────────────────────────────────────────────────
//

/// Repository contract for learner profiles.
#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Persist or update a profile.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the profile cannot be stored.
    async fn upsert_profile(&self, profile: &Profile) -> Result<(), StorageError>;

    /// Fetch a profile by user id, `None` when absent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn get_profile(&self, user: UserId) -> Result<Option<Profile>, StorageError>;

    /// List up to `limit` profiles, ordered by display name.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn list_profiles(&self, limit: u32) -> Result<Vec<Profile>, StorageError>;
}

/// Repository contract for the curriculum catalog: topics, lessons and
/// quiz questions.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Persist or update a topic.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the topic cannot be stored.
    async fn upsert_topic(&self, topic: &Topic) -> Result<(), StorageError>;

    /// Fetch a topic by id, `None` when absent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn get_topic(&self, id: TopicId) -> Result<Option<Topic>, StorageError>;

    /// List all topics ordered by position.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn list_topics(&self) -> Result<Vec<Topic>, StorageError>;

    /// Persist or update a lesson.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the lesson cannot be stored.
    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError>;

    /// Lessons of a topic ordered by position.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn lessons_for_topic(&self, topic: TopicId) -> Result<Vec<Lesson>, StorageError>;

    /// Persist or update a question.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the question cannot be stored.
    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError>;

    /// Questions of a topic ordered by position. The quiz presents them in
    /// exactly this order, so saved question indexes stay meaningful.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn questions_for_topic(&self, topic: TopicId) -> Result<Vec<Question>, StorageError>;
}

/// Repository contract for the append-only study time log.
#[async_trait]
pub trait StudySessionRepository: Send + Sync {
    /// Append one study session row.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the row cannot be stored.
    async fn append_session(&self, session: &StudySession) -> Result<(), StorageError>;

    /// All study sessions for a user, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn sessions_for_user(&self, user: UserId) -> Result<Vec<StudySession>, StorageError>;
}

/// Repository contract for the append-only quiz attempt history.
#[async_trait]
pub trait QuizAttemptRepository: Send + Sync {
    /// Append one finished attempt.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the row cannot be stored.
    async fn append_attempt(&self, attempt: &QuizAttempt) -> Result<(), StorageError>;

    /// All attempts for a user, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn attempts_for_user(&self, user: UserId) -> Result<Vec<QuizAttempt>, StorageError>;

    /// A user's attempts on one topic, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn attempts_for_topic(
        &self,
        user: UserId,
        topic: TopicId,
    ) -> Result<Vec<QuizAttempt>, StorageError>;
}

/// Repository contract for per-lesson completion rows, unique per
/// (user, lesson).
#[async_trait]
pub trait LessonProgressRepository: Send + Sync {
    /// Persist or overwrite the row for (user, lesson).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the row cannot be stored.
    async fn upsert_lesson_progress(&self, progress: &LessonProgress) -> Result<(), StorageError>;

    /// Fetch the row for (user, lesson), `None` when absent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn get_lesson_progress(
        &self,
        user: UserId,
        lesson: LessonId,
    ) -> Result<Option<LessonProgress>, StorageError>;

    /// All lesson rows for a user.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn lesson_progress_for_user(
        &self,
        user: UserId,
    ) -> Result<Vec<LessonProgress>, StorageError>;
}

/// Repository contract for per-topic rollups, unique per (user, topic).
#[async_trait]
pub trait TopicProgressRepository: Send + Sync {
    /// Persist or overwrite the row for (user, topic).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the row cannot be stored.
    async fn upsert_topic_progress(&self, progress: &TopicProgress) -> Result<(), StorageError>;

    /// Fetch the row for (user, topic), `None` when absent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn get_topic_progress(
        &self,
        user: UserId,
        topic: TopicId,
    ) -> Result<Option<TopicProgress>, StorageError>;

    /// All topic rows for a user.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn topic_progress_for_user(
        &self,
        user: UserId,
    ) -> Result<Vec<TopicProgress>, StorageError>;
}

/// Repository contract for resume points, unique per (user, topic).
/// Every save overwrites the previous row; last write wins.
#[async_trait]
pub trait ResumeRepository: Send + Sync {
    /// Persist or overwrite the resume point.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the row cannot be stored.
    async fn save_resume_point(&self, point: &ResumePoint) -> Result<(), StorageError>;

    /// Fetch the resume point for (user, topic), `None` when absent.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn get_resume_point(
        &self,
        user: UserId,
        topic: TopicId,
    ) -> Result<Option<ResumePoint>, StorageError>;

    /// Delete the resume point for (user, topic). Deleting an absent row
    /// is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn clear_resume_point(&self, user: UserId, topic: TopicId) -> Result<(), StorageError>;
}

/// Repository contract for unlocked achievements, unique per (user, code).
#[async_trait]
pub trait AchievementRepository: Send + Sync {
    /// Record an unlock. Returns `true` when the code was newly unlocked;
    /// repeating an unlock keeps the original timestamp and returns
    /// `false`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the row cannot be stored.
    async fn unlock(
        &self,
        user: UserId,
        code: &AchievementCode,
        at: DateTime<Utc>,
    ) -> Result<bool, StorageError>;

    /// All unlocks for a user, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn unlocked_for_user(
        &self,
        user: UserId,
    ) -> Result<Vec<UnlockedAchievement>, StorageError>;
}

/// Repository contract for the support-chat message log.
#[async_trait]
pub trait ChatMessageRepository: Send + Sync {
    /// Append one message and publish it on the live feed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the row cannot be stored.
    async fn append_message(&self, message: &ChatMessage) -> Result<(), StorageError>;

    /// The most recent `limit` messages of a user's thread, in
    /// chronological order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failure.
    async fn messages_for_user(
        &self,
        user: UserId,
        limit: u32,
    ) -> Result<Vec<ChatMessage>, StorageError>;
}

//
// ─── IN-MEMORY BACKEND ─────────────────────────────────────────────────────────
//

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone)]
pub struct InMemoryRepository {
    profiles: Arc<Mutex<HashMap<UserId, Profile>>>,
    topics: Arc<Mutex<HashMap<TopicId, Topic>>>,
    lessons: Arc<Mutex<HashMap<LessonId, Lesson>>>,
    questions: Arc<Mutex<HashMap<QuestionId, Question>>>,
    study_sessions: Arc<Mutex<Vec<StudySession>>>,
    quiz_attempts: Arc<Mutex<Vec<QuizAttempt>>>,
    lesson_progress: Arc<Mutex<HashMap<(UserId, LessonId), LessonProgress>>>,
    topic_progress: Arc<Mutex<HashMap<(UserId, TopicId), TopicProgress>>>,
    resume_points: Arc<Mutex<HashMap<(UserId, TopicId), ResumePoint>>>,
    achievements: Arc<Mutex<HashMap<(UserId, String), UnlockedAchievement>>>,
    chat_messages: Arc<Mutex<Vec<ChatMessage>>>,
    feed: ChatFeed,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            profiles: Arc::new(Mutex::new(HashMap::new())),
            topics: Arc::new(Mutex::new(HashMap::new())),
            lessons: Arc::new(Mutex::new(HashMap::new())),
            questions: Arc::new(Mutex::new(HashMap::new())),
            study_sessions: Arc::new(Mutex::new(Vec::new())),
            quiz_attempts: Arc::new(Mutex::new(Vec::new())),
            lesson_progress: Arc::new(Mutex::new(HashMap::new())),
            topic_progress: Arc::new(Mutex::new(HashMap::new())),
            resume_points: Arc::new(Mutex::new(HashMap::new())),
            achievements: Arc::new(Mutex::new(HashMap::new())),
            chat_messages: Arc::new(Mutex::new(Vec::new())),
            feed: ChatFeed::new(),
        }
    }

    /// The live feed this backend publishes chat inserts to.
    #[must_use]
    pub fn feed(&self) -> ChatFeed {
        self.feed.clone()
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

fn lock_err<T>(err: std::sync::PoisonError<T>) -> StorageError {
    StorageError::Connection(err.to_string())
}

#[async_trait]
impl ProfileRepository for InMemoryRepository {
    async fn upsert_profile(&self, profile: &Profile) -> Result<(), StorageError> {
        let mut guard = self.profiles.lock().map_err(lock_err)?;
        guard.insert(profile.user_id(), profile.clone());
        Ok(())
    }

    async fn get_profile(&self, user: UserId) -> Result<Option<Profile>, StorageError> {
        let guard = self.profiles.lock().map_err(lock_err)?;
        Ok(guard.get(&user).cloned())
    }

    async fn list_profiles(&self, limit: u32) -> Result<Vec<Profile>, StorageError> {
        let guard = self.profiles.lock().map_err(lock_err)?;
        let mut profiles: Vec<Profile> = guard.values().cloned().collect();
        profiles.sort_by(|a, b| a.display_name().cmp(b.display_name()));
        profiles.truncate(limit as usize);
        Ok(profiles)
    }
}

#[async_trait]
impl CatalogRepository for InMemoryRepository {
    async fn upsert_topic(&self, topic: &Topic) -> Result<(), StorageError> {
        let mut guard = self.topics.lock().map_err(lock_err)?;
        guard.insert(topic.id(), topic.clone());
        Ok(())
    }

    async fn get_topic(&self, id: TopicId) -> Result<Option<Topic>, StorageError> {
        let guard = self.topics.lock().map_err(lock_err)?;
        Ok(guard.get(&id).cloned())
    }

    async fn list_topics(&self) -> Result<Vec<Topic>, StorageError> {
        let guard = self.topics.lock().map_err(lock_err)?;
        let mut topics: Vec<Topic> = guard.values().cloned().collect();
        topics.sort_by_key(Topic::position);
        Ok(topics)
    }

    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
        let mut guard = self.lessons.lock().map_err(lock_err)?;
        guard.insert(lesson.id(), lesson.clone());
        Ok(())
    }

    async fn lessons_for_topic(&self, topic: TopicId) -> Result<Vec<Lesson>, StorageError> {
        let guard = self.lessons.lock().map_err(lock_err)?;
        let mut lessons: Vec<Lesson> = guard
            .values()
            .filter(|l| l.topic_id() == topic)
            .cloned()
            .collect();
        lessons.sort_by_key(Lesson::position);
        Ok(lessons)
    }

    async fn upsert_question(&self, question: &Question) -> Result<(), StorageError> {
        let mut guard = self.questions.lock().map_err(lock_err)?;
        guard.insert(question.id(), question.clone());
        Ok(())
    }

    async fn questions_for_topic(&self, topic: TopicId) -> Result<Vec<Question>, StorageError> {
        let guard = self.questions.lock().map_err(lock_err)?;
        let mut questions: Vec<Question> = guard
            .values()
            .filter(|q| q.topic_id() == topic)
            .cloned()
            .collect();
        questions.sort_by_key(Question::position);
        Ok(questions)
    }
}

#[async_trait]
impl StudySessionRepository for InMemoryRepository {
    async fn append_session(&self, session: &StudySession) -> Result<(), StorageError> {
        let mut guard = self.study_sessions.lock().map_err(lock_err)?;
        guard.push(session.clone());
        Ok(())
    }

    async fn sessions_for_user(&self, user: UserId) -> Result<Vec<StudySession>, StorageError> {
        let guard = self.study_sessions.lock().map_err(lock_err)?;
        let mut sessions: Vec<StudySession> = guard
            .iter()
            .filter(|s| s.user_id() == user)
            .cloned()
            .collect();
        sessions.sort_by_key(StudySession::recorded_at);
        Ok(sessions)
    }
}

#[async_trait]
impl QuizAttemptRepository for InMemoryRepository {
    async fn append_attempt(&self, attempt: &QuizAttempt) -> Result<(), StorageError> {
        let mut guard = self.quiz_attempts.lock().map_err(lock_err)?;
        guard.push(attempt.clone());
        Ok(())
    }

    async fn attempts_for_user(&self, user: UserId) -> Result<Vec<QuizAttempt>, StorageError> {
        let guard = self.quiz_attempts.lock().map_err(lock_err)?;
        let mut attempts: Vec<QuizAttempt> = guard
            .iter()
            .filter(|a| a.user_id() == user)
            .cloned()
            .collect();
        attempts.sort_by_key(QuizAttempt::recorded_at);
        Ok(attempts)
    }

    async fn attempts_for_topic(
        &self,
        user: UserId,
        topic: TopicId,
    ) -> Result<Vec<QuizAttempt>, StorageError> {
        let guard = self.quiz_attempts.lock().map_err(lock_err)?;
        let mut attempts: Vec<QuizAttempt> = guard
            .iter()
            .filter(|a| a.user_id() == user && a.topic_id() == topic)
            .cloned()
            .collect();
        attempts.sort_by_key(QuizAttempt::recorded_at);
        Ok(attempts)
    }
}

#[async_trait]
impl LessonProgressRepository for InMemoryRepository {
    async fn upsert_lesson_progress(&self, progress: &LessonProgress) -> Result<(), StorageError> {
        let mut guard = self.lesson_progress.lock().map_err(lock_err)?;
        guard.insert(
            (progress.user_id(), progress.lesson_id()),
            progress.clone(),
        );
        Ok(())
    }

    async fn get_lesson_progress(
        &self,
        user: UserId,
        lesson: LessonId,
    ) -> Result<Option<LessonProgress>, StorageError> {
        let guard = self.lesson_progress.lock().map_err(lock_err)?;
        Ok(guard.get(&(user, lesson)).cloned())
    }

    async fn lesson_progress_for_user(
        &self,
        user: UserId,
    ) -> Result<Vec<LessonProgress>, StorageError> {
        let guard = self.lesson_progress.lock().map_err(lock_err)?;
        Ok(guard
            .values()
            .filter(|p| p.user_id() == user)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl TopicProgressRepository for InMemoryRepository {
    async fn upsert_topic_progress(&self, progress: &TopicProgress) -> Result<(), StorageError> {
        let mut guard = self.topic_progress.lock().map_err(lock_err)?;
        guard.insert((progress.user_id(), progress.topic_id()), progress.clone());
        Ok(())
    }

    async fn get_topic_progress(
        &self,
        user: UserId,
        topic: TopicId,
    ) -> Result<Option<TopicProgress>, StorageError> {
        let guard = self.topic_progress.lock().map_err(lock_err)?;
        Ok(guard.get(&(user, topic)).cloned())
    }

    async fn topic_progress_for_user(
        &self,
        user: UserId,
    ) -> Result<Vec<TopicProgress>, StorageError> {
        let guard = self.topic_progress.lock().map_err(lock_err)?;
        Ok(guard
            .values()
            .filter(|p| p.user_id() == user)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ResumeRepository for InMemoryRepository {
    async fn save_resume_point(&self, point: &ResumePoint) -> Result<(), StorageError> {
        let mut guard = self.resume_points.lock().map_err(lock_err)?;
        guard.insert((point.user_id, point.topic_id), point.clone());
        Ok(())
    }

    async fn get_resume_point(
        &self,
        user: UserId,
        topic: TopicId,
    ) -> Result<Option<ResumePoint>, StorageError> {
        let guard = self.resume_points.lock().map_err(lock_err)?;
        Ok(guard.get(&(user, topic)).cloned())
    }

    async fn clear_resume_point(&self, user: UserId, topic: TopicId) -> Result<(), StorageError> {
        let mut guard = self.resume_points.lock().map_err(lock_err)?;
        guard.remove(&(user, topic));
        Ok(())
    }
}

#[async_trait]
impl AchievementRepository for InMemoryRepository {
    async fn unlock(
        &self,
        user: UserId,
        code: &AchievementCode,
        at: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        let mut guard = self.achievements.lock().map_err(lock_err)?;
        let key = (user, code.as_str().to_string());
        if guard.contains_key(&key) {
            return Ok(false);
        }
        guard.insert(
            key,
            UnlockedAchievement {
                code: code.clone(),
                unlocked_at: at,
            },
        );
        Ok(true)
    }

    async fn unlocked_for_user(
        &self,
        user: UserId,
    ) -> Result<Vec<UnlockedAchievement>, StorageError> {
        let guard = self.achievements.lock().map_err(lock_err)?;
        let mut unlocked: Vec<UnlockedAchievement> = guard
            .iter()
            .filter(|((u, _), _)| *u == user)
            .map(|(_, a)| a.clone())
            .collect();
        unlocked.sort_by(|a, b| {
            a.unlocked_at
                .cmp(&b.unlocked_at)
                .then_with(|| a.code.as_str().cmp(b.code.as_str()))
        });
        Ok(unlocked)
    }
}

#[async_trait]
impl ChatMessageRepository for InMemoryRepository {
    async fn append_message(&self, message: &ChatMessage) -> Result<(), StorageError> {
        {
            let mut guard = self.chat_messages.lock().map_err(lock_err)?;
            guard.push(message.clone());
        }
        self.feed.publish(ChatEvent {
            kind: ChangeKind::Insert,
            message: message.clone(),
        });
        Ok(())
    }

    async fn messages_for_user(
        &self,
        user: UserId,
        limit: u32,
    ) -> Result<Vec<ChatMessage>, StorageError> {
        let guard = self.chat_messages.lock().map_err(lock_err)?;
        let mut messages: Vec<ChatMessage> = guard
            .iter()
            .filter(|m| m.user_id() == user)
            .cloned()
            .collect();
        messages.sort_by_key(ChatMessage::sent_at);
        let skip = messages.len().saturating_sub(limit as usize);
        Ok(messages.split_off(skip))
    }
}

//
// ─── STORAGE AGGREGATE ─────────────────────────────────────────────────────────
//

/// Aggregates the repositories behind trait objects for easy backend
/// swapping.
#[derive(Clone)]
pub struct Storage {
    pub profiles: Arc<dyn ProfileRepository>,
    pub catalog: Arc<dyn CatalogRepository>,
    pub study_sessions: Arc<dyn StudySessionRepository>,
    pub quiz_attempts: Arc<dyn QuizAttemptRepository>,
    pub lesson_progress: Arc<dyn LessonProgressRepository>,
    pub topic_progress: Arc<dyn TopicProgressRepository>,
    pub resume: Arc<dyn ResumeRepository>,
    pub achievements: Arc<dyn AchievementRepository>,
    pub chat: Arc<dyn ChatMessageRepository>,
    pub chat_feed: ChatFeed,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let chat_feed = repo.feed();
        Self {
            profiles: Arc::new(repo.clone()),
            catalog: Arc::new(repo.clone()),
            study_sessions: Arc::new(repo.clone()),
            quiz_attempts: Arc::new(repo.clone()),
            lesson_progress: Arc::new(repo.clone()),
            topic_progress: Arc::new(repo.clone()),
            resume: Arc::new(repo.clone()),
            achievements: Arc::new(repo.clone()),
            chat: Arc::new(repo),
            chat_feed,
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use study_core::model::{AnswerKey, SavedAnswer};
    use study_core::time::fixed_now;
    use uuid::Uuid;

    #[tokio::test]
    async fn resume_point_round_trips_and_clears() {
        let repo = InMemoryRepository::new();
        let user = UserId::new();
        let topic = TopicId::new();
        let question = QuestionId::new();

        let mut point = ResumePoint::new(user, topic, fixed_now());
        point.question_index = 2;
        point.score = 1;
        point.answers.insert(question, SavedAnswer::new("4", "2+2"));
        repo.save_resume_point(&point).await.unwrap();

        let fetched = repo.get_resume_point(user, topic).await.unwrap().unwrap();
        assert_eq!(fetched.question_index, 2);
        assert_eq!(fetched.saved_answer(question).unwrap().answer, "4");

        repo.clear_resume_point(user, topic).await.unwrap();
        assert!(repo.get_resume_point(user, topic).await.unwrap().is_none());
        // clearing again is fine
        repo.clear_resume_point(user, topic).await.unwrap();
    }

    #[tokio::test]
    async fn attempts_filter_by_topic() {
        let repo = InMemoryRepository::new();
        let user = UserId::new();
        let algebra = TopicId::new();
        let geometry = TopicId::new();

        for (topic, score) in [(algebra, 3), (geometry, 1), (algebra, 4)] {
            let attempt =
                QuizAttempt::from_score(Uuid::new_v4(), user, topic, score, 4, fixed_now())
                    .unwrap();
            repo.append_attempt(&attempt).await.unwrap();
        }

        assert_eq!(repo.attempts_for_user(user).await.unwrap().len(), 3);
        assert_eq!(
            repo.attempts_for_topic(user, algebra).await.unwrap().len(),
            2
        );
    }

    #[tokio::test]
    async fn questions_come_back_in_position_order() {
        let repo = InMemoryRepository::new();
        let topic = TopicId::new();
        for position in [2_u32, 0, 1] {
            let question = Question::new(
                QuestionId::new(),
                topic,
                &format!("Q{position}"),
                AnswerKey::parse("4"),
                position,
            )
            .unwrap();
            repo.upsert_question(&question).await.unwrap();
        }

        let questions = repo.questions_for_topic(topic).await.unwrap();
        let positions: Vec<u32> = questions.iter().map(Question::position).collect();
        assert_eq!(positions, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn achievement_unlock_is_idempotent() {
        let repo = InMemoryRepository::new();
        let user = UserId::new();
        let code = AchievementCode::new("first-quiz").unwrap();

        assert!(repo.unlock(user, &code, fixed_now()).await.unwrap());
        assert!(!repo.unlock(user, &code, fixed_now()).await.unwrap());
        assert_eq!(repo.unlocked_for_user(user).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn chat_history_keeps_most_recent_messages() {
        let repo = InMemoryRepository::new();
        let user = UserId::new();
        for i in 0..5 {
            let message = ChatMessage::new(
                study_core::model::MessageId::new(),
                user,
                study_core::model::ChatSender::Student,
                &format!("message {i}"),
                fixed_now() + chrono::Duration::seconds(i),
            )
            .unwrap();
            repo.append_message(&message).await.unwrap();
        }

        let history = repo.messages_for_user(user, 3).await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].body(), "message 2");
        assert_eq!(history[2].body(), "message 4");
    }
}
