use study_core::model::{AnswerKey, Question, QuestionId, ResumePoint, Topic, TopicId, UserId};
use study_core::time::{fixed_clock, fixed_now};
use services::achievement_service::{
    AchievementService, CODE_FIRST_QUIZ, CODE_QUIZ_PERFECT, CODE_TOPIC_COMPLETE,
};
use services::{QuizAdvance, QuizError, QuizRunner, SessionStateService};
use storage::repository::{
    CatalogRepository, InMemoryRepository, QuizAttemptRepository, ResumeRepository,
    StudySessionRepository, TopicProgressRepository,
};

use std::sync::Arc;

async fn seed_topic(repo: &InMemoryRepository, keys: &[&str]) -> TopicId {
    let topic = Topic::new(TopicId::new(), "Smoke Topic", 0).unwrap();
    repo.upsert_topic(&topic).await.unwrap();
    for (i, key) in keys.iter().enumerate() {
        let question = Question::new(
            QuestionId::new(),
            topic.id(),
            &format!("Q{i}"),
            AnswerKey::parse(*key),
            u32::try_from(i).unwrap(),
        )
        .unwrap();
        repo.upsert_question(&question).await.unwrap();
    }
    topic.id()
}

fn runner(repo: &InMemoryRepository) -> QuizRunner {
    let clock = fixed_clock();
    let session_state = SessionStateService::new(clock, Arc::new(repo.clone()));
    let achievements = Arc::new(AchievementService::new(
        clock,
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
    ));
    QuizRunner::new(
        clock,
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
        Arc::new(repo.clone()),
        session_state,
        achievements,
    )
}

#[tokio::test]
async fn perfect_run_records_attempt_rollup_time_and_badges() {
    let repo = InMemoryRepository::new();
    let topic = seed_topic(&repo, &["4|because 2+2=4", "9", "paris"]).await;
    let user = UserId::new();
    let runner = runner(&repo);

    let mut session = runner.start(user, topic).await.unwrap();
    let mut finished = None;
    for answer in ["4", "9", "Paris"] {
        session.set_answer(answer);
        let check = runner.check_current(&mut session).await.unwrap();
        assert!(check.correct);
        match runner.advance(&mut session).await.unwrap() {
            QuizAdvance::Next => {}
            QuizAdvance::Finished(outcome) => finished = Some(outcome),
        }
    }
    let outcome = finished.expect("run finished");

    assert_eq!(outcome.attempt.percentage(), 100);
    assert!(outcome.topic_completed);
    assert_eq!(outcome.minutes_recorded, 5);
    let codes: Vec<&str> = outcome.unlocked.iter().map(|c| c.as_str()).collect();
    assert!(codes.contains(&CODE_FIRST_QUIZ));
    assert!(codes.contains(&CODE_QUIZ_PERFECT));
    assert!(codes.contains(&CODE_TOPIC_COMPLETE));

    let attempts = repo.attempts_for_user(user).await.unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].score(), 3);

    let rollup = repo.get_topic_progress(user, topic).await.unwrap().unwrap();
    assert!(rollup.is_completed());
    assert_eq!(rollup.percent(), 100);

    let sessions = repo.sessions_for_user(user).await.unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].minutes(), 5);

    assert!(repo.get_resume_point(user, topic).await.unwrap().is_none());
}

#[tokio::test]
async fn empty_topic_reports_unavailable_and_records_nothing() {
    let repo = InMemoryRepository::new();
    let topic = seed_topic(&repo, &[]).await;
    let user = UserId::new();

    let err = runner(&repo).start(user, topic).await.unwrap_err();
    assert!(matches!(err, QuizError::Unavailable));
    assert!(repo.attempts_for_user(user).await.unwrap().is_empty());
    assert!(repo.sessions_for_user(user).await.unwrap().is_empty());
}

#[tokio::test]
async fn interrupted_run_resumes_at_the_saved_question() {
    let repo = InMemoryRepository::new();
    let topic = seed_topic(&repo, &["4", "9", "16"]).await;
    let user = UserId::new();
    let runner = runner(&repo);

    let mut first = runner.start(user, topic).await.unwrap();
    first.set_answer("4");
    runner.check_current(&mut first).await.unwrap();
    assert!(matches!(
        runner.advance(&mut first).await.unwrap(),
        QuizAdvance::Next
    ));
    drop(first);

    let mut resumed = runner.start(user, topic).await.unwrap();
    assert_eq!(resumed.current_index(), 1);
    assert_eq!(resumed.score(), 1);
    assert_eq!(resumed.progress().answered, 1);

    resumed.set_answer("wrong");
    assert!(!runner.check_current(&mut resumed).await.unwrap().correct);
    runner.advance(&mut resumed).await.unwrap();
    resumed.set_answer("16");
    runner.check_current(&mut resumed).await.unwrap();
    let outcome = match runner.advance(&mut resumed).await.unwrap() {
        QuizAdvance::Finished(outcome) => outcome,
        QuizAdvance::Next => panic!("expected the run to finish"),
    };

    assert_eq!(outcome.attempt.percentage(), 67);
    assert!(!outcome.topic_completed);
    assert!(repo.get_resume_point(user, topic).await.unwrap().is_none());
}

#[tokio::test]
async fn stale_saved_position_starts_fresh() {
    let repo = InMemoryRepository::new();
    let topic = seed_topic(&repo, &["4"]).await;
    let user = UserId::new();

    let mut stale = ResumePoint::new(user, topic, fixed_now());
    stale.question_index = 7;
    stale.score = 3;
    repo.save_resume_point(&stale).await.unwrap();

    let session = runner(&repo).start(user, topic).await.unwrap();
    assert_eq!(session.current_index(), 0);
    assert_eq!(session.score(), 0);
}

#[tokio::test]
async fn retry_clears_saved_state_but_keeps_attempt_history() {
    let repo = InMemoryRepository::new();
    let topic = seed_topic(&repo, &["4", "9"]).await;
    let user = UserId::new();
    let runner = runner(&repo);

    let mut session = runner.start(user, topic).await.unwrap();
    for answer in ["4", "9"] {
        session.set_answer(answer);
        runner.check_current(&mut session).await.unwrap();
        runner.advance(&mut session).await.unwrap();
    }
    assert_eq!(repo.attempts_for_user(user).await.unwrap().len(), 1);

    let mut second = runner.start(user, topic).await.unwrap();
    second.set_answer("4");
    runner.check_current(&mut second).await.unwrap();
    assert!(repo.get_resume_point(user, topic).await.unwrap().is_some());

    let fresh = runner.retry(user, topic).await.unwrap();
    assert_eq!(fresh.current_index(), 0);
    assert_eq!(fresh.score(), 0);
    assert!(repo.get_resume_point(user, topic).await.unwrap().is_none());
    assert_eq!(repo.attempts_for_user(user).await.unwrap().len(), 1);
}
