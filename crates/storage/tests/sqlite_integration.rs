use chrono::Duration;
use study_core::model::{
    AchievementCode, AnswerKey, ChatMessage, ChatSender, Lesson, LessonId, LessonProgress,
    MessageId, Profile, Question, QuestionId, QuizAttempt, ResumePoint, SavedAnswer, StudySession,
    Topic, TopicId, TopicProgress, UserId,
};
use study_core::time::fixed_now;
use storage::repository::{
    AchievementRepository, CatalogRepository, ChatMessageRepository, LessonProgressRepository,
    ProfileRepository, QuizAttemptRepository, ResumeRepository, StudySessionRepository,
    TopicProgressRepository,
};
use storage::sqlite::SqliteRepository;
use uuid::Uuid;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

async fn seed_topic(repo: &SqliteRepository) -> Topic {
    let topic = Topic::new(TopicId::new(), "Algebra", 0).unwrap();
    repo.upsert_topic(&topic).await.unwrap();
    topic
}

#[tokio::test]
async fn sqlite_roundtrip_persists_resume_state() {
    let repo = connect("memdb_resume").await;
    let topic = seed_topic(&repo).await;
    let user = UserId::new();
    let question = QuestionId::new();

    let mut point = ResumePoint::new(user, topic.id(), fixed_now());
    point.lesson_id = Some(LessonId::new());
    point.question_index = 3;
    point.score = 2;
    point
        .answers
        .insert(question, SavedAnswer::new("x=4", "moved the 2 across"));
    repo.save_resume_point(&point).await.expect("save");

    let fetched = repo
        .get_resume_point(user, topic.id())
        .await
        .expect("get")
        .expect("present");
    assert_eq!(fetched.question_index, 3);
    assert_eq!(fetched.score, 2);
    assert_eq!(fetched.lesson_id, point.lesson_id);
    let saved = fetched.saved_answer(question).expect("answer kept");
    assert_eq!(saved.answer, "x=4");
    assert_eq!(saved.working, "moved the 2 across");

    // second save overwrites, last write wins
    point.question_index = 4;
    repo.save_resume_point(&point).await.expect("save again");
    let fetched = repo
        .get_resume_point(user, topic.id())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fetched.question_index, 4);

    repo.clear_resume_point(user, topic.id()).await.expect("clear");
    assert!(
        repo.get_resume_point(user, topic.id())
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn sqlite_orders_catalog_rows_by_position() {
    let repo = connect("memdb_catalog").await;
    let topic = seed_topic(&repo).await;

    for (title, position) in [("Later", 1_u32), ("First", 0), ("Last", 2)] {
        let lesson = Lesson::new(LessonId::new(), topic.id(), title, "body", position).unwrap();
        repo.upsert_lesson(&lesson).await.unwrap();
    }
    for position in [1_u32, 0] {
        let question = Question::new(
            QuestionId::new(),
            topic.id(),
            &format!("Q{position}"),
            AnswerKey::from_parts("4", "because").unwrap(),
            position,
        )
        .unwrap();
        repo.upsert_question(&question).await.unwrap();
    }

    let lessons = repo.lessons_for_topic(topic.id()).await.unwrap();
    let titles: Vec<&str> = lessons.iter().map(Lesson::title).collect();
    assert_eq!(titles, vec!["First", "Later", "Last"]);

    let questions = repo.questions_for_topic(topic.id()).await.unwrap();
    assert_eq!(questions.len(), 2);
    assert_eq!(questions[0].prompt(), "Q0");
    assert_eq!(questions[0].key().answer(), "4");
    assert_eq!(questions[0].key().explanation(), "because");
}

#[tokio::test]
async fn sqlite_upserts_progress_rows() {
    let repo = connect("memdb_progress").await;
    let topic = seed_topic(&repo).await;
    let user = UserId::new();

    let lesson = Lesson::new(LessonId::new(), topic.id(), "Intro", "body", 0).unwrap();
    repo.upsert_lesson(&lesson).await.unwrap();

    let mut lesson_progress = LessonProgress::new(user, lesson.id(), fixed_now());
    repo.upsert_lesson_progress(&lesson_progress).await.unwrap();
    lesson_progress.mark_completed(fixed_now() + Duration::minutes(5));
    repo.upsert_lesson_progress(&lesson_progress).await.unwrap();

    let fetched = repo
        .get_lesson_progress(user, lesson.id())
        .await
        .unwrap()
        .expect("row present");
    assert!(fetched.is_completed());
    assert_eq!(repo.lesson_progress_for_user(user).await.unwrap().len(), 1);

    let rollup = TopicProgress::from_lesson_ratio(user, topic.id(), 1, 1, fixed_now());
    repo.upsert_topic_progress(&rollup).await.unwrap();
    let fetched = repo
        .get_topic_progress(user, topic.id())
        .await
        .unwrap()
        .expect("row present");
    assert_eq!(fetched.percent(), 100);
    assert!(fetched.is_completed());
}

#[tokio::test]
async fn sqlite_keeps_activity_history() {
    let repo = connect("memdb_activity").await;
    let topic = seed_topic(&repo).await;
    let other = Topic::new(TopicId::new(), "Geometry", 1).unwrap();
    repo.upsert_topic(&other).await.unwrap();
    let user = UserId::new();

    let profile = Profile::new(user, "Ada", Some(7)).unwrap();
    repo.upsert_profile(&profile).await.unwrap();
    assert_eq!(
        repo.get_profile(user)
            .await
            .unwrap()
            .unwrap()
            .display_name(),
        "Ada"
    );

    for minutes in [10_u32, 25] {
        let session = StudySession::new(user, minutes, fixed_now()).unwrap();
        repo.append_session(&session).await.unwrap();
    }
    let sessions = repo.sessions_for_user(user).await.unwrap();
    let total: u32 = sessions.iter().map(StudySession::minutes).sum();
    assert_eq!(total, 35);

    for (topic_id, score) in [(topic.id(), 3_u32), (other.id(), 2), (topic.id(), 4)] {
        let attempt =
            QuizAttempt::from_score(Uuid::new_v4(), user, topic_id, score, 4, fixed_now()).unwrap();
        repo.append_attempt(&attempt).await.unwrap();
    }
    assert_eq!(repo.attempts_for_user(user).await.unwrap().len(), 3);
    assert_eq!(
        repo.attempts_for_topic(user, topic.id()).await.unwrap().len(),
        2
    );

    let code = AchievementCode::new("first-quiz").unwrap();
    assert!(repo.unlock(user, &code, fixed_now()).await.unwrap());
    assert!(!repo.unlock(user, &code, fixed_now()).await.unwrap());
    let unlocked = repo.unlocked_for_user(user).await.unwrap();
    assert_eq!(unlocked.len(), 1);
    assert_eq!(unlocked[0].code.as_str(), "first-quiz");
}

#[tokio::test]
async fn sqlite_chat_history_is_chronological_and_limited() {
    let repo = connect("memdb_chat").await;
    let user = UserId::new();

    for i in 0..4_i64 {
        let message = ChatMessage::new(
            MessageId::new(),
            user,
            if i % 2 == 0 {
                ChatSender::Student
            } else {
                ChatSender::Tutor
            },
            &format!("message {i}"),
            fixed_now() + Duration::seconds(i),
        )
        .unwrap();
        repo.append_message(&message).await.unwrap();
    }

    let history = repo.messages_for_user(user, 2).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].body(), "message 2");
    assert_eq!(history[1].body(), "message 3");
    assert_eq!(history[1].sender(), ChatSender::Tutor);
}
