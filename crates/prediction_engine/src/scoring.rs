//! Scoring Engine — body za tip + streak bonus + achievementy.

use chrono::{DateTime, Utc};

use crate::model::{AchievementKind, Outcome, UserStats};

#[derive(Debug, Clone)]
pub struct ScoringRules {
    pub exact:            u32,
    pub goal_difference:  u32,
    pub result:           u32,
    pub streak_bonus:     u32,
    pub streak_threshold: u32,
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self {
            exact: 5,
            goal_difference: 3,
            result: 1,
            streak_bonus: 2,
            streak_threshold: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Award {
    pub points:  u32,
    pub outcome: Outcome,
}

/// What `apply_result` did to the stats.
#[derive(Debug, Clone, PartialEq)]
pub struct Applied {
    pub base:             u32,
    pub bonus:            u32,
    pub total:            u32,
    pub streak:           u32,
    pub new_achievements: Vec<AchievementKind>,
}

impl ScoringRules {
    /// Pure and total. First matching tier wins: exact > goal difference > outcome > miss.
    pub fn score(&self, predicted_home: u32, predicted_away: u32, actual_home: u32, actual_away: u32) -> Award {
        if predicted_home == actual_home && predicted_away == actual_away {
            return Award { points: self.exact, outcome: Outcome::Exact };
        }

        let predicted_margin = predicted_home as i64 - predicted_away as i64;
        let actual_margin = actual_home as i64 - actual_away as i64;

        if predicted_margin == actual_margin {
            return Award { points: self.goal_difference, outcome: Outcome::Partial };
        }
        if predicted_margin.signum() == actual_margin.signum() {
            return Award { points: self.result, outcome: Outcome::Result };
        }

        Award { points: 0, outcome: Outcome::Miss }
    }

    /// Fold one resolved prediction into the user's running stats.
    ///
    /// The streak bonus needs the post-increment streak at or above the
    /// threshold *and* a positive base award; eligibility keys off the base
    /// points, not the outcome class.
    pub fn apply_result(&self, stats: &mut UserStats, award: &Award, now: DateTime<Utc>) -> Applied {
        match award.outcome {
            Outcome::Exact => stats.exact += 1,
            Outcome::Partial => stats.partial += 1,
            Outcome::Result => stats.result += 1,
            Outcome::Miss => stats.miss += 1,
        }
        stats.pending = stats.pending.saturating_sub(1);

        if award.outcome == Outcome::Miss {
            stats.current_streak = 0;
        } else {
            stats.current_streak += 1;
            stats.best_streak = stats.best_streak.max(stats.current_streak);
        }

        let bonus = if award.points > 0 && stats.current_streak >= self.streak_threshold {
            self.streak_bonus
        } else {
            0
        };
        let total = award.points + bonus;

        stats.total_points += total;
        stats.weekly_points += total;
        stats.monthly_points += total;

        let mut new_achievements = Vec::new();
        let mut grant = |stats: &mut UserStats, kind: AchievementKind, earned: bool| {
            if earned && stats.grant(kind, now) {
                new_achievements.push(kind);
            }
        };
        grant(stats, AchievementKind::FirstExact, stats.exact >= 1);
        grant(stats, AchievementKind::Sharpshooter, stats.exact >= 10);
        grant(stats, AchievementKind::HotStreak, stats.current_streak >= 5);
        grant(stats, AchievementKind::Unstoppable, stats.current_streak >= 10);
        grant(stats, AchievementKind::Centurion, stats.total_points >= 100);

        Applied {
            base: award.points,
            bonus,
            total,
            streak: stats.current_streak,
            new_achievements,
        }
    }
}
