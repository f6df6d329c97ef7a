mod achievement;
mod catalog;
mod chat;
mod ids;
mod profile;
mod progress;
mod resume;
mod study;

pub use ids::{LessonId, MessageId, ParseIdError, QuestionId, TopicId, UserId};

pub use achievement::{AchievementCode, AchievementError};
pub use catalog::{AnswerKey, AnswerKeyError, CatalogError, Lesson, Question, Topic};
pub use chat::{ChatError, ChatMessage, ChatSender};
pub use profile::{Profile, ProfileError};
pub use progress::{LessonProgress, ProgressError, TopicProgress};
pub use resume::{ResumePoint, SavedAnswer};
pub use study::{
    QUIZ_PASS_PERCENT, QuizAttempt, QuizAttemptError, StudySession, StudySessionError,
    score_percentage,
};
