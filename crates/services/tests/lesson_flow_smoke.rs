use study_core::model::{Lesson, LessonId, Topic, TopicId, UserId};
use study_core::time::fixed_clock;
use services::achievement_service::{AchievementService, CODE_TOPIC_COMPLETE};
use services::{LessonError, LessonFlowService, LessonTarget, SessionStateService};
use storage::repository::{
    AchievementRepository, CatalogRepository, InMemoryRepository, StorageError,
    StudySessionRepository,
};

use std::sync::Arc;

async fn seed_topic(repo: &InMemoryRepository, lesson_count: u32) -> (TopicId, Vec<LessonId>) {
    let topic = Topic::new(TopicId::new(), "Smoke Topic", 0).unwrap();
    repo.upsert_topic(&topic).await.unwrap();

    let mut lessons = Vec::new();
    for i in 0..lesson_count {
        let lesson = Lesson::new(
            LessonId::new(),
            topic.id(),
            &format!("Lesson {i}"),
            "body",
            i,
        )
        .unwrap();
        repo.upsert_lesson(&lesson).await.unwrap();
        lessons.push(lesson.id());
    }
    (topic.id(), lessons)
}

fn service(repo: &InMemoryRepository) -> LessonFlowService {
    let clock = fixed_clock();
    let achievements = Arc::new(AchievementService::new(
        clock,
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
    ));
    LessonFlowService::new(
        clock,
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
        achievements,
    )
}

#[tokio::test]
async fn a_short_dwell_is_rejected_and_records_nothing() {
    let repo = InMemoryRepository::new();
    let (topic, lessons) = seed_topic(&repo, 1).await;
    let user = UserId::new();

    let err = service(&repo)
        .complete_lesson(user, topic, lessons[0], 9)
        .await
        .unwrap_err();
    assert!(matches!(err, LessonError::DwellTooShort { seconds: 9 }));
    assert!(repo.sessions_for_user(user).await.unwrap().is_empty());
}

#[tokio::test]
async fn completing_every_lesson_completes_the_topic() {
    let repo = InMemoryRepository::new();
    let (topic, lessons) = seed_topic(&repo, 2).await;
    let user = UserId::new();
    let service = service(&repo);

    let first = service
        .complete_lesson(user, topic, lessons[0], 300)
        .await
        .unwrap();
    assert!(first.newly_completed);
    assert_eq!(first.topic_percent, 50);
    assert!(!first.topic_completed);
    assert_eq!(first.minutes_recorded, 5);

    let second = service
        .complete_lesson(user, topic, lessons[1], 60)
        .await
        .unwrap();
    assert_eq!(second.topic_percent, 100);
    assert!(second.topic_completed);

    assert_eq!(repo.sessions_for_user(user).await.unwrap().len(), 2);
    let unlocked = repo.unlocked_for_user(user).await.unwrap();
    assert!(
        unlocked
            .iter()
            .any(|row| row.code.as_str() == CODE_TOPIC_COMPLETE)
    );
}

#[tokio::test]
async fn repeat_completion_keeps_the_ratio_but_still_logs_time() {
    let repo = InMemoryRepository::new();
    let (topic, lessons) = seed_topic(&repo, 2).await;
    let user = UserId::new();
    let service = service(&repo);

    service
        .complete_lesson(user, topic, lessons[0], 300)
        .await
        .unwrap();
    let again = service
        .complete_lesson(user, topic, lessons[0], 90)
        .await
        .unwrap();

    assert!(!again.newly_completed);
    assert_eq!(again.topic_percent, 50);
    assert_eq!(again.minutes_recorded, 2);
    assert_eq!(repo.sessions_for_user(user).await.unwrap().len(), 2);
}

#[tokio::test]
async fn a_lesson_outside_the_topic_is_not_found() {
    let repo = InMemoryRepository::new();
    let (topic, _) = seed_topic(&repo, 1).await;

    let err = service(&repo)
        .complete_lesson(UserId::new(), topic, LessonId::new(), 60)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        LessonError::Storage(StorageError::NotFound)
    ));
}

#[tokio::test]
async fn reopening_the_topic_lands_on_the_saved_lesson() {
    let repo = InMemoryRepository::new();
    let (topic, lessons) = seed_topic(&repo, 2).await;
    let user = UserId::new();

    let state = SessionStateService::new(fixed_clock(), Arc::new(repo.clone()));
    state.save_lesson_position(user, topic, lessons[1]).await;

    let target = state.resolve_lesson(user, topic, lessons[0]).await;
    assert_eq!(target, LessonTarget::Saved(lessons[1]));
    assert_eq!(target.lesson_id(), lessons[1]);
}
