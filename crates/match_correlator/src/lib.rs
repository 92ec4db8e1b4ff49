//! Cross-provider match correlation: predikce → dohraný zápas v našem feedu.

pub mod correlator;
pub mod names;

pub use correlator::{CorrelatorConfig, FinishedMatchSource, FixtureProvider, MatchCorrelator, MatchQuery};
pub use names::{normalize_team_name, similarity, MatchPolicy};
