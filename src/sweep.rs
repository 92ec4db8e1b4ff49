//! Prediction sweep — pending tipy → dohraný zápas → body → notifikace.

use chrono::{DateTime, Utc};
use logger::{now_iso, EventLogger, PredictionSweepEvent};
use match_correlator::{MatchCorrelator, MatchQuery};
use prediction_engine::{Prediction, PredictionResult, PredictionStore, ScoringRules, StoreError, UserStats};
use push_notifier::{Dispatcher, ResultNotice};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct SweepConfig {
    pub batch_limit: usize,
    /// Only predictions whose kickoff is at least this old; a match needs time to finish.
    pub min_age:     chrono::Duration,
    pub item_delay:  Duration,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub attempted: usize,
    pub resolved:  usize,
    pub not_found: usize,
    pub failed:    usize,
}

#[derive(Clone, Copy)]
enum ItemOutcome {
    Resolved,
    NotFound,
    Failed,
}

#[derive(Clone)]
pub struct PredictionSweeper {
    store:      Arc<dyn PredictionStore>,
    correlator: Arc<MatchCorrelator>,
    dispatcher: Arc<Dispatcher>,
    rules:      ScoringRules,
    config:     SweepConfig,
    logger:     Option<EventLogger>,
}

impl PredictionSweeper {
    pub fn new(
        store: Arc<dyn PredictionStore>,
        correlator: Arc<MatchCorrelator>,
        dispatcher: Arc<Dispatcher>,
        rules: ScoringRules,
        config: SweepConfig,
        logger: Option<EventLogger>,
    ) -> Self {
        Self { store, correlator, dispatcher, rules, config, logger }
    }

    /// One pass over the oldest pending predictions. Every failure is per-item;
    /// unresolved predictions stay pending for the next pass.
    pub async fn run_once(&self, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport::default();

        let pending = match self.store.pending_predictions(now - self.config.min_age, self.config.batch_limit) {
            Ok(p) => p,
            Err(e) => {
                warn!("pending prediction query failed: {e}");
                return report;
            }
        };
        if pending.is_empty() {
            debug!("no pending predictions due");
            return report;
        }

        for (i, prediction) in pending.iter().enumerate() {
            if i > 0 && !self.config.item_delay.is_zero() {
                sleep(self.config.item_delay).await;
            }
            report.attempted += 1;
            let outcome = self.process(prediction, now).await;
            match outcome {
                ItemOutcome::Resolved => report.resolved += 1,
                ItemOutcome::NotFound => report.not_found += 1,
                ItemOutcome::Failed => report.failed += 1,
            }
            if !matches!(outcome, ItemOutcome::Resolved) {
                // na konec fronty, ať nevyřešitelné tipy neblokují novější
                if let Err(e) = self.store.mark_attempted(&prediction.id, now) {
                    warn!(prediction = %prediction.id, "marking sweep attempt failed: {e}");
                }
            }
        }

        info!(
            attempted = report.attempted,
            resolved = report.resolved,
            not_found = report.not_found,
            failed = report.failed,
            "prediction sweep done"
        );
        self.log(&report);
        report
    }

    async fn process(&self, prediction: &Prediction, now: DateTime<Utc>) -> ItemOutcome {
        let query = MatchQuery {
            match_id: prediction.match_id.clone(),
            home_team: prediction.home_team.clone(),
            away_team: prediction.away_team.clone(),
            kickoff: prediction.kickoff,
        };
        let Some(finished) = self.correlator.resolve(&query).await else {
            debug!(prediction = %prediction.id, "match not finished or not found, stays pending");
            return ItemOutcome::NotFound;
        };

        let award = self.rules.score(
            prediction.predicted_home,
            prediction.predicted_away,
            finished.home_score,
            finished.away_score,
        );
        let mut applied = None;
        let saved = self.store.resolve_prediction(prediction, &mut |stats: &mut UserStats| {
            let a = self.rules.apply_result(stats, &award, now);
            let result = PredictionResult {
                actual_home: finished.home_score,
                actual_away: finished.away_score,
                points: a.total,
                outcome: award.outcome,
                processed_at: now,
            };
            applied = Some(a);
            result
        });

        let applied = match (saved, applied) {
            (Ok(_), Some(applied)) => applied,
            (Ok(_), None) => {
                warn!(prediction = %prediction.id, "store resolved without scoring");
                return ItemOutcome::Failed;
            }
            (Err(StoreError::AlreadyResolved(id)), _) => {
                debug!(prediction = %id, "resolved concurrently, skipping");
                return ItemOutcome::Failed;
            }
            (Err(e), _) => {
                warn!(prediction = %prediction.id, "saving resolved prediction failed: {e}");
                return ItemOutcome::Failed;
            }
        };

        info!(
            prediction = %prediction.id,
            user = %prediction.user_id,
            outcome = award.outcome.as_str(),
            points = applied.total,
            bonus = applied.bonus,
            "prediction resolved: {}",
            finished.score_line()
        );
        for a in &applied.new_achievements {
            info!(user = %prediction.user_id, achievement = a.as_str(), "achievement unlocked");
        }

        let payload = push_notifier::prediction_result(&ResultNotice {
            user_id: prediction.user_id.clone(),
            prediction_id: prediction.id.clone(),
            match_id: prediction.match_id.clone(),
            home_team: prediction.home_team.clone(),
            away_team: prediction.away_team.clone(),
            actual_home: finished.home_score,
            actual_away: finished.away_score,
            points: applied.total,
            outcome: award.outcome.as_str().to_string(),
            streak: applied.streak,
            streak_bonus: applied.bonus,
        });
        self.dispatcher.dispatch(&payload).await;

        ItemOutcome::Resolved
    }

    fn log(&self, report: &SweepReport) {
        let Some(logger) = &self.logger else { return };
        let ev = PredictionSweepEvent {
            ts: now_iso(),
            event: "PREDICTION_SWEEP",
            attempted: report.attempted,
            resolved: report.resolved,
            not_found: report.not_found,
            failed: report.failed,
        };
        if let Err(e) = logger.log(&ev) {
            warn!("event log write failed: {e}");
        }
    }
}
