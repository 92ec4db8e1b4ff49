//! Leaderboard timer job: period resets (týden/měsíc) a přepočet pořadí.

use chrono::{DateTime, Utc};
use logger::{now_iso, EventLogger, LeaderboardEvent};
use prediction_engine::{compute_ranks, period_keys, period_rollover, PredictionStore, StoreError};
use std::sync::Arc;
use tracing::{info, warn};

const WEEK_MARKER: &str = "period.week";
const MONTH_MARKER: &str = "period.month";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeaderboardReport {
    pub ranked_total:  usize,
    pub ranked_weekly: usize,
    pub weekly_reset:  bool,
    pub monthly_reset: bool,
}

#[derive(Clone)]
pub struct LeaderboardJob {
    store:  Arc<dyn PredictionStore>,
    logger: Option<EventLogger>,
}

impl LeaderboardJob {
    pub fn new(store: Arc<dyn PredictionStore>, logger: Option<EventLogger>) -> Self {
        Self { store, logger }
    }

    pub async fn run_once(&self, now: DateTime<Utc>) -> Option<LeaderboardReport> {
        match self.recompute(now) {
            Ok(report) => {
                info!(
                    ranked_total = report.ranked_total,
                    ranked_weekly = report.ranked_weekly,
                    weekly_reset = report.weekly_reset,
                    monthly_reset = report.monthly_reset,
                    "leaderboard recomputed"
                );
                self.log(&report);
                Some(report)
            }
            Err(e) => {
                warn!("leaderboard recompute failed: {e}");
                None
            }
        }
    }

    /// Resets first so the weekly ranks reflect the new period.
    pub fn recompute(&self, now: DateTime<Utc>) -> Result<LeaderboardReport, StoreError> {
        let last_week = self.store.marker(WEEK_MARKER)?;
        let last_month = self.store.marker(MONTH_MARKER)?;
        let rollover = period_rollover(last_week.as_deref(), last_month.as_deref(), now);

        if rollover.weekly {
            let users = self.store.reset_weekly_points()?;
            info!(users, "weekly points reset");
        }
        if rollover.monthly {
            let users = self.store.reset_monthly_points()?;
            info!(users, "monthly points reset");
        }
        let (week, month) = period_keys(now);
        self.store.set_marker(WEEK_MARKER, &week)?;
        self.store.set_marker(MONTH_MARKER, &month)?;

        let ranks = compute_ranks(&self.store.all_user_stats()?);
        self.store.save_ranks(&ranks)?;

        Ok(LeaderboardReport {
            ranked_total: ranks.iter().filter(|r| r.global_rank.is_some()).count(),
            ranked_weekly: ranks.iter().filter(|r| r.weekly_rank.is_some()).count(),
            weekly_reset: rollover.weekly,
            monthly_reset: rollover.monthly,
        })
    }

    fn log(&self, report: &LeaderboardReport) {
        let Some(logger) = &self.logger else { return };
        let ev = LeaderboardEvent {
            ts: now_iso(),
            event: "LEADERBOARD_RECOMPUTE",
            ranked_total: report.ranked_total,
            ranked_weekly: report.ranked_weekly,
            weekly_reset: report.weekly_reset,
            monthly_reset: report.monthly_reset,
        };
        if let Err(e) = logger.log(&ev) {
            warn!("event log write failed: {e}");
        }
    }
}
