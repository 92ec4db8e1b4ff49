/// KickoffLive — Live Monitor
///
/// Sleduje live fotbal přes ESPN scoreboard + keyEvents a detekuje přechody:
/// - výkop (scheduled → live)
/// - gól (nárůst skóre na jedné straně)
/// - karty / VAR / střídání / penalty z timeline
///
/// Nic neposílá; detekované přechody vrací volajícímu (scheduler → notifier).

pub mod cache;
pub mod detector;
pub mod feed;
pub mod fixtures;
pub mod model;
pub mod status;

pub use cache::{StateCache, StateCacheEntry};
pub use detector::{detect_snapshot, detect_timeline, Transition};
pub use feed::{EspnFeed, FeedError, ScoreFeed, ESPN_SOCCER_BASE};
pub use fixtures::{ApiFootballClient, API_FOOTBALL_BASE};
pub use model::{EventKind, MatchSnapshot, MatchStatus, Side, TimelineEvent};
pub use status::map_status;
