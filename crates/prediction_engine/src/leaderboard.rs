//! Leaderboard Aggregator — pořadí podle celkových a týdenních bodů.

use chrono::{DateTime, Datelike, Utc};
use std::collections::HashMap;

use crate::model::UserStats;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankAssignment {
    pub user_id:     String,
    pub global_rank: Option<u32>,
    pub weekly_rank: Option<u32>,
}

/// 1-based positions over users with positive points; ties fall back to
/// user id so repeated runs over the same data give identical ranks.
/// Users at zero get no rank.
pub fn compute_ranks(stats: &[UserStats]) -> Vec<RankAssignment> {
    let global = rank_by(stats, |s| s.total_points);
    let weekly = rank_by(stats, |s| s.weekly_points);

    let mut out: Vec<RankAssignment> = stats
        .iter()
        .map(|s| RankAssignment {
            user_id: s.user_id.clone(),
            global_rank: global.get(s.user_id.as_str()).copied(),
            weekly_rank: weekly.get(s.user_id.as_str()).copied(),
        })
        .collect();
    out.sort_by(|a, b| a.user_id.cmp(&b.user_id));
    out
}

fn rank_by(stats: &[UserStats], points: impl Fn(&UserStats) -> u32) -> HashMap<&str, u32> {
    let mut eligible: Vec<(&str, u32)> = stats
        .iter()
        .map(|s| (s.user_id.as_str(), points(s)))
        .filter(|(_, p)| *p > 0)
        .collect();
    eligible.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    eligible
        .into_iter()
        .enumerate()
        .map(|(i, (user, _))| (user, i as u32 + 1))
        .collect()
}

/// Keys of the current ISO week and calendar month ("2024-W20", "2024-05").
pub fn period_keys(now: DateTime<Utc>) -> (String, String) {
    let week = now.iso_week();
    (
        format!("{}-W{:02}", week.year(), week.week()),
        format!("{}-{:02}", now.year(), now.month()),
    )
}

/// Which period counters must be zeroed given the last recorded keys.
/// A missing key (first run) only records the period, it does not reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PeriodRollover {
    pub weekly:  bool,
    pub monthly: bool,
}

pub fn period_rollover(last_week: Option<&str>, last_month: Option<&str>, now: DateTime<Utc>) -> PeriodRollover {
    let (week, month) = period_keys(now);
    PeriodRollover {
        weekly: last_week.is_some_and(|w| w != week),
        monthly: last_month.is_some_and(|m| m != month),
    }
}
