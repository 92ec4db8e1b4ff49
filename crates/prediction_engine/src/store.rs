//! Persistence boundary for predictions and user stats.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

use crate::leaderboard::RankAssignment;
use crate::model::{Prediction, PredictionResult, UserStats};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("user {user_id} already has a prediction for match {match_id}")]
    DuplicatePrediction { user_id: String, match_id: String },
    #[error("prediction {0} not found")]
    UnknownPrediction(String),
    #[error("prediction {0} is already resolved")]
    AlreadyResolved(String),
    #[error("store backend: {0}")]
    Backend(String),
}

/// Scoring step run inside `resolve_prediction` against the freshly loaded stats.
/// Mutates the stats and returns the result to store on the prediction.
pub type ScoreFn<'a> = dyn FnMut(&mut UserStats) -> PredictionResult + 'a;

/// Synchronous store. The pipeline calls it from async tasks; every call is short.
pub trait PredictionStore: Send + Sync {
    /// One prediction per (user, match). Bumps the user's total and pending counters.
    fn insert_prediction(&self, prediction: &Prediction) -> Result<(), StoreError>;

    /// Pending predictions with kickoff before `kickoff_before`. Never attempted
    /// ones come first (oldest kickoff first), then the least recently attempted,
    /// so predictions that never resolve cannot starve the rest.
    fn pending_predictions(&self, kickoff_before: DateTime<Utc>, limit: usize) -> Result<Vec<Prediction>, StoreError>;

    /// Stats for a user; a fresh zeroed record if the user has none yet.
    fn user_stats(&self, user_id: &str) -> Result<UserStats, StoreError>;

    fn all_user_stats(&self) -> Result<Vec<UserStats>, StoreError>;

    /// Records a sweep attempt that did not resolve the prediction.
    fn mark_attempted(&self, prediction_id: &str, at: DateTime<Utc>) -> Result<(), StoreError>;

    /// Loads the user's current stats, runs `score` on them and writes the
    /// result and the scoring-owned stats columns back, all in one atomic step.
    /// Rank columns are left alone. Fails with `AlreadyResolved` if the stored
    /// prediction is no longer pending; `score` is not called then.
    fn resolve_prediction(&self, prediction: &Prediction, score: &mut ScoreFn<'_>) -> Result<Prediction, StoreError>;

    fn save_ranks(&self, ranks: &[RankAssignment]) -> Result<(), StoreError>;

    /// Returns the number of users touched.
    fn reset_weekly_points(&self) -> Result<usize, StoreError>;
    fn reset_monthly_points(&self) -> Result<usize, StoreError>;

    fn marker(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set_marker(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

#[derive(Default)]
struct Inner {
    predictions: Vec<Prediction>,
    stats:       HashMap<String, UserStats>,
    markers:     HashMap<String, String>,
    attempts:    HashMap<String, DateTime<Utc>>,
}

/// In-process store, used by tests and dry runs.
#[derive(Default)]
pub struct InMemoryStore {
    inner: Mutex<Inner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Backend("in-memory store mutex poisoned".to_string()))
    }

    pub fn prediction(&self, id: &str) -> Result<Option<Prediction>, StoreError> {
        Ok(self.lock()?.predictions.iter().find(|p| p.id == id).cloned())
    }
}

impl PredictionStore for InMemoryStore {
    fn insert_prediction(&self, prediction: &Prediction) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        let duplicate = inner
            .predictions
            .iter()
            .any(|p| p.user_id == prediction.user_id && p.match_id == prediction.match_id);
        if duplicate {
            return Err(StoreError::DuplicatePrediction {
                user_id: prediction.user_id.clone(),
                match_id: prediction.match_id.clone(),
            });
        }

        inner.predictions.push(prediction.clone());
        let stats = inner
            .stats
            .entry(prediction.user_id.clone())
            .or_insert_with(|| UserStats::new(prediction.user_id.clone()));
        stats.total_predictions += 1;
        if prediction.is_pending() {
            stats.pending += 1;
        }
        Ok(())
    }

    fn pending_predictions(&self, kickoff_before: DateTime<Utc>, limit: usize) -> Result<Vec<Prediction>, StoreError> {
        let inner = self.lock()?;
        let mut pending: Vec<Prediction> = inner
            .predictions
            .iter()
            .filter(|p| p.is_pending() && p.kickoff < kickoff_before)
            .cloned()
            .collect();
        pending.sort_by_key(|p| (inner.attempts.get(&p.id).copied(), p.kickoff));
        pending.truncate(limit);
        Ok(pending)
    }

    fn user_stats(&self, user_id: &str) -> Result<UserStats, StoreError> {
        Ok(self
            .lock()?
            .stats
            .get(user_id)
            .cloned()
            .unwrap_or_else(|| UserStats::new(user_id)))
    }

    fn all_user_stats(&self) -> Result<Vec<UserStats>, StoreError> {
        let mut all: Vec<UserStats> = self.lock()?.stats.values().cloned().collect();
        all.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        Ok(all)
    }

    fn mark_attempted(&self, prediction_id: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.lock()?.attempts.insert(prediction_id.to_string(), at);
        Ok(())
    }

    fn resolve_prediction(&self, prediction: &Prediction, score: &mut ScoreFn<'_>) -> Result<Prediction, StoreError> {
        let mut inner = self.lock()?;
        let inner = &mut *inner;
        let stored = inner
            .predictions
            .iter_mut()
            .find(|p| p.id == prediction.id)
            .ok_or_else(|| StoreError::UnknownPrediction(prediction.id.clone()))?;
        if !stored.is_pending() {
            return Err(StoreError::AlreadyResolved(prediction.id.clone()));
        }

        let stats = inner
            .stats
            .entry(stored.user_id.clone())
            .or_insert_with(|| UserStats::new(stored.user_id.clone()));
        stored.result = Some(score(stats));
        inner.attempts.remove(&prediction.id);
        Ok(stored.clone())
    }

    fn save_ranks(&self, ranks: &[RankAssignment]) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        for r in ranks {
            if let Some(s) = inner.stats.get_mut(&r.user_id) {
                s.global_rank = r.global_rank;
                s.weekly_rank = r.weekly_rank;
            }
        }
        Ok(())
    }

    fn reset_weekly_points(&self) -> Result<usize, StoreError> {
        let mut inner = self.lock()?;
        inner.stats.values_mut().for_each(|s| s.weekly_points = 0);
        Ok(inner.stats.len())
    }

    fn reset_monthly_points(&self) -> Result<usize, StoreError> {
        let mut inner = self.lock()?;
        inner.stats.values_mut().for_each(|s| s.monthly_points = 0);
        Ok(inner.stats.len())
    }

    fn marker(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.lock()?.markers.get(key).cloned())
    }

    fn set_marker(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.lock()?.markers.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
