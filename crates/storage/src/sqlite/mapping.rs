use sqlx::Row;
use std::collections::HashMap;
use uuid::Uuid;

use study_core::model::{
    AchievementCode, AnswerKey, ChatMessage, ChatSender, Lesson, LessonId, LessonProgress,
    MessageId, Profile, Question, QuestionId, QuizAttempt, ResumePoint, SavedAnswer, StudySession,
    Topic, TopicId, TopicProgress, UserId,
};

use crate::repository::{StorageError, UnlockedAchievement};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn uuid_from_text(field: &'static str, v: &str) -> Result<Uuid, StorageError> {
    Uuid::parse_str(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn user_id_from_text(v: &str) -> Result<UserId, StorageError> {
    Ok(UserId::from_uuid(uuid_from_text("user_id", v)?))
}

pub(crate) fn topic_id_from_text(v: &str) -> Result<TopicId, StorageError> {
    Ok(TopicId::from_uuid(uuid_from_text("topic_id", v)?))
}

pub(crate) fn lesson_id_from_text(v: &str) -> Result<LessonId, StorageError> {
    Ok(LessonId::from_uuid(uuid_from_text("lesson_id", v)?))
}

pub(crate) fn question_id_from_text(v: &str) -> Result<QuestionId, StorageError> {
    Ok(QuestionId::from_uuid(uuid_from_text("question_id", v)?))
}

pub(crate) fn message_id_from_text(v: &str) -> Result<MessageId, StorageError> {
    Ok(MessageId::from_uuid(uuid_from_text("message_id", v)?))
}

pub(crate) fn i64_to_u32(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn i64_to_u8(field: &'static str, v: i64) -> Result<u8, StorageError> {
    u8::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn map_profile_row(row: &sqlx::sqlite::SqliteRow) -> Result<Profile, StorageError> {
    let user_id = user_id_from_text(&row.try_get::<String, _>("user_id").map_err(ser)?)?;
    let display_name: String = row.try_get("display_name").map_err(ser)?;
    let grade_level = row
        .try_get::<Option<i64>, _>("grade_level")
        .map_err(ser)?
        .map(|v| i64_to_u8("grade_level", v))
        .transpose()?;

    Profile::from_persisted(user_id, &display_name, grade_level).map_err(ser)
}

pub(crate) fn map_topic_row(row: &sqlx::sqlite::SqliteRow) -> Result<Topic, StorageError> {
    let id = topic_id_from_text(&row.try_get::<String, _>("id").map_err(ser)?)?;
    let name: String = row.try_get("name").map_err(ser)?;
    let position = i64_to_u32("position", row.try_get::<i64, _>("position").map_err(ser)?)?;

    Topic::new(id, &name, position).map_err(ser)
}

pub(crate) fn map_lesson_row(row: &sqlx::sqlite::SqliteRow) -> Result<Lesson, StorageError> {
    let id = lesson_id_from_text(&row.try_get::<String, _>("id").map_err(ser)?)?;
    let topic_id = topic_id_from_text(&row.try_get::<String, _>("topic_id").map_err(ser)?)?;
    let title: String = row.try_get("title").map_err(ser)?;
    let body: String = row.try_get("body").map_err(ser)?;
    let position = i64_to_u32("position", row.try_get::<i64, _>("position").map_err(ser)?)?;

    Lesson::new(id, topic_id, &title, &body, position).map_err(ser)
}

pub(crate) fn map_question_row(row: &sqlx::sqlite::SqliteRow) -> Result<Question, StorageError> {
    let id = question_id_from_text(&row.try_get::<String, _>("id").map_err(ser)?)?;
    let topic_id = topic_id_from_text(&row.try_get::<String, _>("topic_id").map_err(ser)?)?;
    let prompt: String = row.try_get("prompt").map_err(ser)?;
    let key = AnswerKey::parse(row.try_get::<String, _>("answer_key").map_err(ser)?);
    let position = i64_to_u32("position", row.try_get::<i64, _>("position").map_err(ser)?)?;

    Question::new(id, topic_id, &prompt, key, position).map_err(ser)
}

pub(crate) fn map_session_row(row: &sqlx::sqlite::SqliteRow) -> Result<StudySession, StorageError> {
    let user_id = user_id_from_text(&row.try_get::<String, _>("user_id").map_err(ser)?)?;
    let minutes = i64_to_u32("minutes", row.try_get::<i64, _>("minutes").map_err(ser)?)?;
    let recorded_at = row.try_get("recorded_at").map_err(ser)?;

    StudySession::from_persisted(user_id, minutes, recorded_at).map_err(ser)
}

pub(crate) fn map_attempt_row(row: &sqlx::sqlite::SqliteRow) -> Result<QuizAttempt, StorageError> {
    let id = uuid_from_text("attempt_id", &row.try_get::<String, _>("id").map_err(ser)?)?;
    let user_id = user_id_from_text(&row.try_get::<String, _>("user_id").map_err(ser)?)?;
    let topic_id = topic_id_from_text(&row.try_get::<String, _>("topic_id").map_err(ser)?)?;
    let score = i64_to_u32("score", row.try_get::<i64, _>("score").map_err(ser)?)?;
    let total = i64_to_u32(
        "total_questions",
        row.try_get::<i64, _>("total_questions").map_err(ser)?,
    )?;
    let percentage = i64_to_u8("percentage", row.try_get::<i64, _>("percentage").map_err(ser)?)?;
    let recorded_at = row.try_get("recorded_at").map_err(ser)?;

    QuizAttempt::from_persisted(id, user_id, topic_id, score, total, percentage, recorded_at)
        .map_err(ser)
}

pub(crate) fn map_lesson_progress_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<LessonProgress, StorageError> {
    let user_id = user_id_from_text(&row.try_get::<String, _>("user_id").map_err(ser)?)?;
    let lesson_id = lesson_id_from_text(&row.try_get::<String, _>("lesson_id").map_err(ser)?)?;
    let completed: bool = row.try_get("completed").map_err(ser)?;
    let updated_at = row.try_get("updated_at").map_err(ser)?;

    Ok(LessonProgress::from_persisted(
        user_id, lesson_id, completed, updated_at,
    ))
}

pub(crate) fn map_topic_progress_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<TopicProgress, StorageError> {
    let user_id = user_id_from_text(&row.try_get::<String, _>("user_id").map_err(ser)?)?;
    let topic_id = topic_id_from_text(&row.try_get::<String, _>("topic_id").map_err(ser)?)?;
    let percent = i64_to_u8("percent", row.try_get::<i64, _>("percent").map_err(ser)?)?;
    let completed: bool = row.try_get("completed").map_err(ser)?;
    let updated_at = row.try_get("updated_at").map_err(ser)?;

    TopicProgress::from_persisted(user_id, topic_id, percent, completed, updated_at).map_err(ser)
}

pub(crate) fn answers_to_json(
    answers: &HashMap<QuestionId, SavedAnswer>,
) -> Result<String, StorageError> {
    serde_json::to_string(answers).map_err(ser)
}

pub(crate) fn map_resume_row(row: &sqlx::sqlite::SqliteRow) -> Result<ResumePoint, StorageError> {
    let user_id = user_id_from_text(&row.try_get::<String, _>("user_id").map_err(ser)?)?;
    let topic_id = topic_id_from_text(&row.try_get::<String, _>("topic_id").map_err(ser)?)?;
    let lesson_id = row
        .try_get::<Option<String>, _>("lesson_id")
        .map_err(ser)?
        .map(|v| lesson_id_from_text(&v))
        .transpose()?;
    let question_index = i64_to_u32(
        "question_index",
        row.try_get::<i64, _>("question_index").map_err(ser)?,
    )?;
    let answers: HashMap<QuestionId, SavedAnswer> =
        serde_json::from_str(&row.try_get::<String, _>("answers").map_err(ser)?).map_err(ser)?;
    let score = i64_to_u32("score", row.try_get::<i64, _>("score").map_err(ser)?)?;
    let updated_at = row.try_get("updated_at").map_err(ser)?;

    Ok(ResumePoint {
        user_id,
        topic_id,
        lesson_id,
        question_index,
        answers,
        score,
        updated_at,
    })
}

pub(crate) fn map_achievement_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<UnlockedAchievement, StorageError> {
    let code = AchievementCode::new(&row.try_get::<String, _>("code").map_err(ser)?).map_err(ser)?;
    let unlocked_at = row.try_get("unlocked_at").map_err(ser)?;

    Ok(UnlockedAchievement { code, unlocked_at })
}

pub(crate) fn map_chat_row(row: &sqlx::sqlite::SqliteRow) -> Result<ChatMessage, StorageError> {
    let id = message_id_from_text(&row.try_get::<String, _>("id").map_err(ser)?)?;
    let user_id = user_id_from_text(&row.try_get::<String, _>("user_id").map_err(ser)?)?;
    let sender =
        ChatSender::parse(&row.try_get::<String, _>("sender").map_err(ser)?).map_err(ser)?;
    let body: String = row.try_get("body").map_err(ser)?;
    let sent_at = row.try_get("sent_at").map_err(ser)?;

    ChatMessage::new(id, user_id, sender, &body, sent_at).map_err(ser)
}
