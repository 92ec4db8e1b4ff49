//! Prediction Engine — vyhodnocení tipů na výsledek, streaky, žebříček.
//!
//! Pure scoring lives in [`scoring`], ranking in [`leaderboard`]; the
//! [`PredictionStore`] trait is the only I/O seam.

pub mod leaderboard;
pub mod model;
pub mod scoring;
pub mod store;

pub use leaderboard::{compute_ranks, period_keys, period_rollover, PeriodRollover, RankAssignment};
pub use model::{Achievement, AchievementKind, Outcome, Prediction, PredictionResult, UserStats};
pub use scoring::{Applied, Award, ScoringRules};
pub use store::{InMemoryStore, PredictionStore, ScoreFn, StoreError};
