//! KickoffLive — live fotbal: polling skóre, notifikace, vyhodnocení tipů.

pub mod config;
pub mod leaderboard;
pub mod scheduler;
pub mod store;
pub mod sweep;
