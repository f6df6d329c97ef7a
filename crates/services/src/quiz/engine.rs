use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;

use study_core::answer;
use study_core::model::{
    Question, QuestionId, ResumePoint, SavedAnswer, TopicId, UserId, score_percentage,
};

use crate::error::QuizError;
use super::progress::QuizProgress;

//
// ─── CHECK OUTCOME ─────────────────────────────────────────────────────────────
//

/// Feedback for one checked answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckOutcome {
    pub correct: bool,
    pub expected: String,
    pub explanation: String,
}

/// What happened when the learner moved past a checked question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    Next,
    Finished,
}

//
// ─── QUIZ SESSION ──────────────────────────────────────────────────────────────
//

/// In-memory quiz run over one topic's questions.
///
/// Each question moves `Answering -> Checked` exactly once; advancing past
/// the last question finishes the run. The machine holds no storage
/// handles, so the runner decides what to persist and when.
pub struct QuizSession {
    user_id: UserId,
    topic_id: TopicId,
    questions: Vec<Question>,
    current: usize,
    answer_draft: String,
    working_draft: String,
    checked: Option<CheckOutcome>,
    answers: HashMap<QuestionId, SavedAnswer>,
    score: u32,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl QuizSession {
    /// Start a fresh run over `questions`, which must already be in
    /// presentation order.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Unavailable` if there are no questions.
    pub fn new(
        user_id: UserId,
        topic_id: TopicId,
        questions: Vec<Question>,
        started_at: DateTime<Utc>,
    ) -> Result<Self, QuizError> {
        if questions.is_empty() {
            return Err(QuizError::Unavailable);
        }
        Ok(Self {
            user_id,
            topic_id,
            questions,
            current: 0,
            answer_draft: String::new(),
            working_draft: String::new(),
            checked: None,
            answers: HashMap::new(),
            score: 0,
            started_at,
            finished_at: None,
        })
    }

    /// Rebuild a run from a saved resume point: position, score, every
    /// saved answer, and the current question's drafts. A question that
    /// was already checked comes back in its checked state, so resuming
    /// can never double-count the score.
    ///
    /// A saved index past the end of the question list is ignored and the
    /// run starts fresh.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Unavailable` if there are no questions.
    pub fn resume(
        user_id: UserId,
        topic_id: TopicId,
        questions: Vec<Question>,
        point: &ResumePoint,
        started_at: DateTime<Utc>,
    ) -> Result<Self, QuizError> {
        let mut session = Self::new(user_id, topic_id, questions, started_at)?;
        let index = usize::try_from(point.question_index).unwrap_or(usize::MAX);
        if index < session.questions.len() {
            session.current = index;
            session.score = point.score;
            session.answers = point.answers.clone();
            session.load_state_for_current();
        }
        Ok(session)
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn topic_id(&self) -> TopicId {
        self.topic_id
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    /// Total number of questions in this run.
    #[must_use]
    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    /// Zero-based index of the question being worked on.
    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.current)
    }

    #[must_use]
    pub fn answer_draft(&self) -> &str {
        &self.answer_draft
    }

    #[must_use]
    pub fn working_draft(&self) -> &str {
        &self.working_draft
    }

    /// The feedback for the current question, `None` while answering.
    #[must_use]
    pub fn checked(&self) -> Option<&CheckOutcome> {
        self.checked.as_ref()
    }

    /// Returns a summary of the current run progress.
    #[must_use]
    pub fn progress(&self) -> QuizProgress {
        let total = self.total_questions();
        let answered = self.answers.len();
        QuizProgress {
            total,
            answered,
            remaining: total.saturating_sub(answered),
            is_complete: self.is_finished(),
        }
    }

    /// Rounded score percentage. Meaningful once the run is finished;
    /// the question list is never empty by construction.
    #[must_use]
    pub fn percentage(&self) -> u8 {
        let total = u32::try_from(self.questions.len()).unwrap_or(u32::MAX);
        score_percentage(self.score, total)
    }

    /// Edit the answer box. Ignored once the answer has been checked.
    pub fn set_answer(&mut self, text: impl Into<String>) {
        if self.checked.is_none() && !self.is_finished() {
            self.answer_draft = text.into();
        }
    }

    /// Edit the working-out notes. Ignored once the answer has been checked.
    pub fn set_working(&mut self, text: impl Into<String>) {
        if self.checked.is_none() && !self.is_finished() {
            self.working_draft = text.into();
        }
    }

    /// Grade the current draft against the question's answer key.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Completed` after the run finished,
    /// `QuizError::EmptyAnswer` for a blank draft, and
    /// `QuizError::AlreadyChecked` when the question was already graded.
    pub fn check_answer(&mut self) -> Result<CheckOutcome, QuizError> {
        if self.is_finished() {
            return Err(QuizError::Completed);
        }
        if self.checked.is_some() {
            return Err(QuizError::AlreadyChecked);
        }
        if self.answer_draft.trim().is_empty() {
            return Err(QuizError::EmptyAnswer);
        }

        let Some(question) = self.questions.get(self.current) else {
            return Err(QuizError::Completed);
        };
        let outcome = outcome_for(question, &self.answer_draft);
        if outcome.correct {
            self.score += 1;
        }
        self.answers.insert(
            question.id(),
            SavedAnswer::new(self.answer_draft.clone(), self.working_draft.clone()),
        );
        self.checked = Some(outcome.clone());
        Ok(outcome)
    }

    /// Move past a checked question, finishing the run on the last one.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Completed` after the run finished and
    /// `QuizError::NotChecked` before the current answer was graded.
    pub fn advance(&mut self, at: DateTime<Utc>) -> Result<Advance, QuizError> {
        if self.is_finished() {
            return Err(QuizError::Completed);
        }
        if self.checked.is_none() {
            return Err(QuizError::NotChecked);
        }

        self.current += 1;
        if self.current >= self.questions.len() {
            self.finished_at = Some(at);
            return Ok(Advance::Finished);
        }
        self.load_state_for_current();
        Ok(Advance::Next)
    }

    /// Wipe the run back to its first question for a retry.
    pub fn reset(&mut self, started_at: DateTime<Utc>) {
        self.current = 0;
        self.score = 0;
        self.answers.clear();
        self.answer_draft.clear();
        self.working_draft.clear();
        self.checked = None;
        self.started_at = started_at;
        self.finished_at = None;
    }

    /// The persistable shape of this run, keyed to resume at the current
    /// question.
    #[must_use]
    pub fn snapshot(&self, now: DateTime<Utc>) -> ResumePoint {
        let mut point = ResumePoint::new(self.user_id, self.topic_id, now);
        point.question_index = u32::try_from(self.current).unwrap_or(u32::MAX);
        point.answers = self.answers.clone();
        point.score = self.score;
        point
    }

    /// Restores drafts and checked state for the current question from the
    /// saved answers map, or clears them when nothing was saved.
    fn load_state_for_current(&mut self) {
        let restored = match self.current_question() {
            Some(question) => self
                .answers
                .get(&question.id())
                .map(|saved| (saved.clone(), outcome_for(question, &saved.answer))),
            None => None,
        };
        match restored {
            Some((saved, outcome)) => {
                self.answer_draft = saved.answer;
                self.working_draft = saved.working;
                self.checked = Some(outcome);
            }
            None => {
                self.answer_draft.clear();
                self.working_draft.clear();
                self.checked = None;
            }
        }
    }
}

fn outcome_for(question: &Question, given: &str) -> CheckOutcome {
    let key = question.key();
    CheckOutcome {
        correct: answer::is_correct(given, key.answer()),
        expected: key.answer().to_string(),
        explanation: key.explanation().to_string(),
    }
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("user_id", &self.user_id)
            .field("topic_id", &self.topic_id)
            .field("questions_len", &self.questions.len())
            .field("current", &self.current)
            .field("score", &self.score)
            .field("started_at", &self.started_at)
            .field("finished_at", &self.finished_at)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use study_core::model::AnswerKey;
    use study_core::time::fixed_now;

    fn build_questions(keys: &[&str]) -> Vec<Question> {
        keys.iter()
            .enumerate()
            .map(|(i, key)| {
                Question::new(
                    QuestionId::new(),
                    TopicId::new(),
                    &format!("Q{i}"),
                    AnswerKey::parse(*key),
                    u32::try_from(i).unwrap(),
                )
                .unwrap()
            })
            .collect()
    }

    fn build_session(keys: &[&str]) -> QuizSession {
        QuizSession::new(UserId::new(), TopicId::new(), build_questions(keys), fixed_now()).unwrap()
    }

    #[test]
    fn empty_topic_is_unavailable() {
        let err =
            QuizSession::new(UserId::new(), TopicId::new(), Vec::new(), fixed_now()).unwrap_err();
        assert!(matches!(err, QuizError::Unavailable));
    }

    #[test]
    fn run_checks_and_finishes_with_percentage() {
        let mut session = build_session(&["4|because 2+2=4", "9"]);

        session.set_answer("4");
        let first = session.check_answer().unwrap();
        assert!(first.correct);
        assert_eq!(session.advance(fixed_now()).unwrap(), Advance::Next);

        session.set_answer("7");
        session.set_working("6+1");
        let second = session.check_answer().unwrap();
        assert!(!second.correct);
        assert_eq!(second.expected, "9");

        assert_eq!(session.advance(fixed_now()).unwrap(), Advance::Finished);
        assert!(session.is_finished());
        assert_eq!(session.score(), 1);
        assert_eq!(session.percentage(), 50);
    }

    #[test]
    fn normalization_forgives_spacing_and_case() {
        let mut session = build_session(&["1,2,3"]);
        session.set_answer(" 1, 2, 3 ");
        assert!(session.check_answer().unwrap().correct);
    }

    #[test]
    fn blank_answer_cannot_be_checked() {
        let mut session = build_session(&["4"]);
        session.set_answer("   ");
        assert!(matches!(session.check_answer(), Err(QuizError::EmptyAnswer)));
    }

    #[test]
    fn double_check_and_early_advance_are_rejected() {
        let mut session = build_session(&["4", "9"]);

        assert!(matches!(
            session.advance(fixed_now()),
            Err(QuizError::NotChecked)
        ));

        session.set_answer("4");
        session.check_answer().unwrap();
        assert!(matches!(
            session.check_answer(),
            Err(QuizError::AlreadyChecked)
        ));
    }

    #[test]
    fn drafts_are_frozen_once_checked() {
        let mut session = build_session(&["4", "9"]);
        session.set_answer("4");
        session.check_answer().unwrap();

        session.set_answer("5");
        assert_eq!(session.answer_draft(), "4");

        session.advance(fixed_now()).unwrap();
        assert_eq!(session.answer_draft(), "");
        assert!(session.checked().is_none());
    }

    #[test]
    fn snapshot_and_resume_restore_the_run() {
        let mut session = build_session(&["4", "9", "16"]);
        let questions: Vec<Question> = session.questions.clone();

        session.set_answer("4");
        session.set_working("2+2");
        session.check_answer().unwrap();
        session.advance(fixed_now()).unwrap();
        let point = session.snapshot(fixed_now());
        assert_eq!(point.question_index, 1);
        assert_eq!(point.score, 1);

        let resumed = QuizSession::resume(
            session.user_id(),
            session.topic_id(),
            questions,
            &point,
            fixed_now(),
        )
        .unwrap();
        assert_eq!(resumed.current_index(), 1);
        assert_eq!(resumed.score(), 1);
        assert_eq!(resumed.answer_draft(), "");
        assert!(resumed.checked().is_none());
        assert_eq!(resumed.progress().answered, 1);
    }

    #[test]
    fn resume_on_a_checked_question_cannot_double_count() {
        let mut session = build_session(&["4", "9"]);
        let questions: Vec<Question> = session.questions.clone();

        session.set_answer("4");
        session.set_working("2+2");
        session.check_answer().unwrap();
        // snapshot taken right after the check, before advancing
        let point = session.snapshot(fixed_now());
        assert_eq!(point.question_index, 0);

        let mut resumed = QuizSession::resume(
            session.user_id(),
            session.topic_id(),
            questions,
            &point,
            fixed_now(),
        )
        .unwrap();
        assert_eq!(resumed.answer_draft(), "4");
        assert_eq!(resumed.working_draft(), "2+2");
        assert!(resumed.checked().unwrap().correct);
        assert!(matches!(
            resumed.check_answer(),
            Err(QuizError::AlreadyChecked)
        ));
        assert_eq!(resumed.score(), 1);

        resumed.advance(fixed_now()).unwrap();
        resumed.set_answer("9");
        resumed.check_answer().unwrap();
        resumed.advance(fixed_now()).unwrap();
        assert_eq!(resumed.score(), 2);
        assert_eq!(resumed.percentage(), 100);
    }

    #[test]
    fn out_of_range_resume_index_starts_fresh() {
        let questions = build_questions(&["4"]);
        let mut point = ResumePoint::new(UserId::new(), TopicId::new(), fixed_now());
        point.question_index = 5;
        point.score = 1;

        let session =
            QuizSession::resume(point.user_id, point.topic_id, questions, &point, fixed_now())
                .unwrap();
        assert_eq!(session.current_index(), 0);
        assert_eq!(session.score(), 0);
        assert!(!session.progress().is_complete);
    }

    #[test]
    fn reset_wipes_everything_for_a_retry() {
        let mut session = build_session(&["4"]);
        session.set_answer("4");
        session.check_answer().unwrap();
        session.advance(fixed_now()).unwrap();
        assert!(session.is_finished());

        let restarted_at = fixed_now() + chrono::Duration::minutes(5);
        session.reset(restarted_at);
        assert!(!session.is_finished());
        assert_eq!(session.score(), 0);
        assert_eq!(session.current_index(), 0);
        assert_eq!(session.progress().answered, 0);
        assert_eq!(session.started_at(), restarted_at);
    }
}
