//! Pure dashboard math: streaks, hours, averages and leaderboard ranking.
//!
//! Everything here is derived on demand from raw activity rows; nothing is
//! cached or mutated, so a recomputation after any trigger is idempotent.

use chrono::NaiveDate;

use crate::model::UserId;

//
// ─── STREAK ────────────────────────────────────────────────────────────────────
//

/// Number of consecutive calendar days with study activity, counting
/// backward from `today`.
///
/// Multiple sessions on one day count once. The streak is alive only if
/// the most recent activity is today or yesterday; otherwise it is 0.
/// Activity today with no earlier history is a streak of 1.
#[must_use]
pub fn current_streak(activity_dates: &[NaiveDate], today: NaiveDate) -> u32 {
    let mut days: Vec<NaiveDate> = activity_dates.to_vec();
    days.sort_unstable_by(|a, b| b.cmp(a));
    days.dedup();

    let Some(&latest) = days.first() else {
        return 0;
    };
    let yesterday = today.pred_opt().unwrap_or(today);
    if latest != today && latest != yesterday {
        return 0;
    }

    let mut streak = 1_u32;
    let mut expected = latest.pred_opt();
    for &day in &days[1..] {
        match expected {
            Some(e) if day == e => {
                streak += 1;
                expected = day.pred_opt();
            }
            _ => break,
        }
    }
    streak
}

//
// ─── HOURS AND SCORES ──────────────────────────────────────────────────────────
//

/// Total study time in hours, rounded to one decimal place.
#[must_use]
pub fn total_hours(total_minutes: u32) -> f64 {
    (f64::from(total_minutes) / 60.0 * 10.0).round() / 10.0
}

/// Rounded mean of quiz percentages; 0 when there are no attempts yet.
#[must_use]
pub fn average_score(percentages: &[u8]) -> u8 {
    if percentages.is_empty() {
        return 0;
    }
    let sum: u32 = percentages.iter().map(|&p| u32::from(p)).sum();
    (f64::from(sum) / percentages.len() as f64).round() as u8
}

//
// ─── LEADERBOARD ───────────────────────────────────────────────────────────────
//

/// The derived dashboard numbers for one learner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserStats {
    pub user_id: UserId,
    pub streak_days: u32,
    pub total_minutes: u32,
    pub topics_completed: u32,
    pub average_score: u8,
    pub quiz_count: u32,
}

impl UserStats {
    /// Stats for a learner with no recorded activity.
    #[must_use]
    pub fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            streak_days: 0,
            total_minutes: 0,
            topics_completed: 0,
            average_score: 0,
            quiz_count: 0,
        }
    }

    /// Study time as display hours, one decimal place.
    #[must_use]
    pub fn total_hours(&self) -> f64 {
        total_hours(self.total_minutes)
    }
}

/// Which stat a leaderboard is sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaderboardMetric {
    StreakDays,
    TotalHours,
    TopicsCompleted,
    AverageScore,
}

impl LeaderboardMetric {
    /// Parses the metric tag used by query parameters and the CLI.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "streak" => Some(Self::StreakDays),
            "hours" => Some(Self::TotalHours),
            "topics" => Some(Self::TopicsCompleted),
            "score" => Some(Self::AverageScore),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StreakDays => "streak",
            Self::TotalHours => "hours",
            Self::TopicsCompleted => "topics",
            Self::AverageScore => "score",
        }
    }

    /// The sortable value of `stats` under this metric. Hours sort by raw
    /// minutes so display rounding cannot reorder entries.
    #[must_use]
    pub fn value_of(self, stats: &UserStats) -> u32 {
        match self {
            Self::StreakDays => stats.streak_days,
            Self::TotalHours => stats.total_minutes,
            Self::TopicsCompleted => stats.topics_completed,
            Self::AverageScore => u32::from(stats.average_score),
        }
    }
}

/// One leaderboard row: a 1-based rank attached to a learner's stats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankedUser {
    pub rank: u32,
    pub stats: UserStats,
}

/// Ranks learners by the chosen metric, highest first.
///
/// The sort is stable, so learners with equal values keep their input
/// order and still receive distinct consecutive ranks (1, 2, 3, ...).
#[must_use]
pub fn rank_users(stats: Vec<UserStats>, metric: LeaderboardMetric) -> Vec<RankedUser> {
    let mut stats = stats;
    stats.sort_by(|a, b| metric.value_of(b).cmp(&metric.value_of(a)));
    stats
        .into_iter()
        .enumerate()
        .map(|(i, stats)| RankedUser {
            rank: i as u32 + 1,
            stats,
        })
        .collect()
}

// ─── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn single_session_today_is_a_streak_of_one() {
        let today = date(2024, 3, 10);
        assert_eq!(current_streak(&[today], today), 1);
    }

    #[test]
    fn three_consecutive_days_count_three() {
        let today = date(2024, 3, 10);
        let days = [date(2024, 3, 8), date(2024, 3, 9), today];
        assert_eq!(current_streak(&days, today), 3);
    }

    #[test]
    fn streak_survives_when_latest_is_yesterday() {
        let today = date(2024, 3, 10);
        let days = [date(2024, 3, 8), date(2024, 3, 9)];
        assert_eq!(current_streak(&days, today), 2);
    }

    #[test]
    fn gap_before_today_breaks_the_streak() {
        let today = date(2024, 3, 10);
        let days = [date(2024, 3, 6), date(2024, 3, 7), today];
        assert_eq!(current_streak(&days, today), 1);
    }

    #[test]
    fn stale_activity_means_no_streak() {
        let today = date(2024, 3, 10);
        let days = [date(2024, 3, 7), date(2024, 3, 8)];
        assert_eq!(current_streak(&days, today), 0);
        assert_eq!(current_streak(&[], today), 0);
    }

    #[test]
    fn same_day_sessions_collapse() {
        let today = date(2024, 3, 10);
        let days = [today, today, date(2024, 3, 9), date(2024, 3, 9)];
        assert_eq!(current_streak(&days, today), 2);
    }

    #[test]
    fn hours_round_to_one_decimal() {
        assert_eq!(total_hours(90), 1.5);
        assert_eq!(total_hours(100), 1.7);
        assert_eq!(total_hours(0), 0.0);
    }

    #[test]
    fn average_score_rounds_and_defaults_to_zero() {
        assert_eq!(average_score(&[80, 90, 100]), 90);
        assert_eq!(average_score(&[50, 75]), 63);
        assert_eq!(average_score(&[]), 0);
    }

    #[test]
    fn ranking_is_descending_with_consecutive_ranks() {
        let a = UserStats {
            streak_days: 5,
            ..UserStats::empty(UserId::new())
        };
        let b = UserStats {
            streak_days: 9,
            ..UserStats::empty(UserId::new())
        };
        let c = UserStats {
            streak_days: 1,
            ..UserStats::empty(UserId::new())
        };

        let ranked = rank_users(vec![a, b.clone(), c], LeaderboardMetric::StreakDays);
        assert_eq!(ranked[0].stats.user_id, b.user_id);
        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[1].rank, 2);
        assert_eq!(ranked[2].rank, 3);
    }

    #[test]
    fn ties_keep_input_order_and_distinct_ranks() {
        let first = UserStats {
            streak_days: 4,
            ..UserStats::empty(UserId::new())
        };
        let second = UserStats {
            streak_days: 4,
            ..UserStats::empty(UserId::new())
        };

        let ranked = rank_users(
            vec![first.clone(), second.clone()],
            LeaderboardMetric::StreakDays,
        );
        assert_eq!(ranked[0].stats.user_id, first.user_id);
        assert_eq!(ranked[1].stats.user_id, second.user_id);
        assert_eq!((ranked[0].rank, ranked[1].rank), (1, 2));
    }

    #[test]
    fn hours_metric_sorts_by_raw_minutes() {
        let close = UserStats {
            total_minutes: 93,
            ..UserStats::empty(UserId::new())
        };
        let closer = UserStats {
            total_minutes: 94,
            ..UserStats::empty(UserId::new())
        };

        let ranked = rank_users(
            vec![close, closer.clone()],
            LeaderboardMetric::TotalHours,
        );
        assert_eq!(ranked[0].stats.user_id, closer.user_id);
    }
}
