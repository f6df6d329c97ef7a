use std::sync::Arc;

use chrono::NaiveDate;

use study_core::metrics::{self, LeaderboardMetric, RankedUser, UserStats};
use study_core::model::{Profile, QuizAttempt, StudySession, TopicProgress, UserId};
use storage::repository::{
    ProfileRepository, QuizAttemptRepository, StudySessionRepository, TopicProgressRepository,
};

use crate::Clock;

/// How many profiles feed one leaderboard computation.
const LEADERBOARD_POOL: u32 = 128;

/// One leaderboard row with the learner's display name attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub display_name: String,
    pub stats: UserStats,
}

/// A ranked board plus the viewer's own row when it fell outside the top.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leaderboard {
    pub metric: LeaderboardMetric,
    pub entries: Vec<LeaderboardEntry>,
    pub viewer: Option<LeaderboardEntry>,
}

/// Derives dashboard stats and leaderboards from raw activity rows.
///
/// Every read recomputes from scratch, so calling it after any trigger
/// (quiz finished, lesson completed, page opened) is idempotent. Reads
/// never fail: a fetch error degrades that slice of the stats to "no
/// data yet" and logs a warning.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    profiles: Arc<dyn ProfileRepository>,
    study_sessions: Arc<dyn StudySessionRepository>,
    quiz_attempts: Arc<dyn QuizAttemptRepository>,
    topic_progress: Arc<dyn TopicProgressRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(
        clock: Clock,
        profiles: Arc<dyn ProfileRepository>,
        study_sessions: Arc<dyn StudySessionRepository>,
        quiz_attempts: Arc<dyn QuizAttemptRepository>,
        topic_progress: Arc<dyn TopicProgressRepository>,
    ) -> Self {
        Self {
            clock,
            profiles,
            study_sessions,
            quiz_attempts,
            topic_progress,
        }
    }

    /// Recompute the dashboard numbers for one learner.
    pub async fn refresh_stats(&self, user: UserId) -> UserStats {
        let today = self.clock.today();
        let sessions = self.sessions_or_empty(user).await;
        let attempts = self.attempts_or_empty(user).await;
        let topics = self.topics_or_empty(user).await;

        stats_from_rows(user, today, &sessions, &attempts, &topics)
    }

    /// Rank every known learner by `metric` and keep the top `limit` rows.
    ///
    /// When the viewer placed below the cut their row is returned
    /// separately so a dashboard can still show "you are #14".
    pub async fn leaderboard(
        &self,
        metric: LeaderboardMetric,
        limit: usize,
        viewer: UserId,
    ) -> Leaderboard {
        let profiles = match self.profiles.list_profiles(LEADERBOARD_POOL).await {
            Ok(profiles) => profiles,
            Err(err) => {
                tracing::warn!("profile listing failed for leaderboard: {err}");
                Vec::new()
            }
        };

        let mut stats = Vec::with_capacity(profiles.len());
        for profile in &profiles {
            stats.push(self.refresh_stats(profile.user_id()).await);
        }
        let ranked = metrics::rank_users(stats, metric);

        let viewer_entry = ranked
            .iter()
            .find(|row| row.stats.user_id == viewer)
            .filter(|row| row.rank as usize > limit)
            .map(|row| entry_for(row, &profiles));

        let entries = ranked
            .iter()
            .take(limit)
            .map(|row| entry_for(row, &profiles))
            .collect();

        Leaderboard {
            metric,
            entries,
            viewer: viewer_entry,
        }
    }

    async fn sessions_or_empty(&self, user: UserId) -> Vec<StudySession> {
        match self.study_sessions.sessions_for_user(user).await {
            Ok(sessions) => sessions,
            Err(err) => {
                tracing::warn!("study session fetch failed for user {user}: {err}");
                Vec::new()
            }
        }
    }

    async fn attempts_or_empty(&self, user: UserId) -> Vec<QuizAttempt> {
        match self.quiz_attempts.attempts_for_user(user).await {
            Ok(attempts) => attempts,
            Err(err) => {
                tracing::warn!("quiz attempt fetch failed for user {user}: {err}");
                Vec::new()
            }
        }
    }

    async fn topics_or_empty(&self, user: UserId) -> Vec<TopicProgress> {
        match self.topic_progress.topic_progress_for_user(user).await {
            Ok(topics) => topics,
            Err(err) => {
                tracing::warn!("topic progress fetch failed for user {user}: {err}");
                Vec::new()
            }
        }
    }
}

fn stats_from_rows(
    user: UserId,
    today: NaiveDate,
    sessions: &[StudySession],
    attempts: &[QuizAttempt],
    topics: &[TopicProgress],
) -> UserStats {
    let activity_dates: Vec<NaiveDate> = sessions
        .iter()
        .map(|s| s.recorded_at().date_naive())
        .collect();
    let percentages: Vec<u8> = attempts.iter().map(QuizAttempt::percentage).collect();
    let topics_completed = topics.iter().filter(|t| t.is_completed()).count();

    UserStats {
        user_id: user,
        streak_days: metrics::current_streak(&activity_dates, today),
        total_minutes: sessions.iter().map(StudySession::minutes).sum(),
        topics_completed: u32::try_from(topics_completed).unwrap_or(u32::MAX),
        average_score: metrics::average_score(&percentages),
        quiz_count: u32::try_from(attempts.len()).unwrap_or(u32::MAX),
    }
}

fn entry_for(row: &RankedUser, profiles: &[Profile]) -> LeaderboardEntry {
    let display_name = profiles
        .iter()
        .find(|p| p.user_id() == row.stats.user_id)
        .map_or_else(String::new, |p| p.display_name().to_string());
    LeaderboardEntry {
        rank: row.rank,
        display_name,
        stats: row.stats.clone(),
    }
}
