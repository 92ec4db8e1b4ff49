//! State Cache — last known score/status per match + už notifikované eventy.
//!
//! Owned by the live-poll loop and passed by `&mut` into the detector, so no
//! locking. Purged wholesale by `reset()` on a fixed interval.

use std::collections::{HashMap, HashSet};

use crate::model::MatchStatus;

/// Upper bound for the start-notified set, which survives `reset()`.
const MAX_STARTED_IDS: usize = 10_000;

#[derive(Debug, Clone, Default)]
pub struct StateCacheEntry {
    pub home_score:      u32,
    pub away_score:      u32,
    pub status:          MatchStatus,
    /// Highest score announced per side; a VAR correction can lower the live
    /// score but never these.
    pub home_high:       u32,
    pub away_high:       u32,
    pub notified_events: HashSet<String>,
    /// First timeline fetch in this cache generation already happened
    pub timeline_seeded: bool,
    /// scheduled → live was observed in this generation (not a mid-match first sighting)
    pub start_observed:  bool,
}

#[derive(Debug, Default)]
pub struct StateCache {
    entries: HashMap<String, StateCacheEntry>,
    started_notified: HashSet<String>,
    resets: u64,
}

impl StateCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, match_id: &str) -> Option<&StateCacheEntry> {
        self.entries.get(match_id)
    }

    pub fn entry_mut(&mut self, match_id: &str) -> &mut StateCacheEntry {
        self.entries.entry(match_id.to_string()).or_default()
    }

    pub fn is_start_notified(&self, match_id: &str) -> bool {
        self.started_notified.contains(match_id)
    }

    /// Returns false when the match was already marked.
    pub fn mark_start_notified(&mut self, match_id: &str) -> bool {
        self.started_notified.insert(match_id.to_string())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn resets(&self) -> u64 {
        self.resets
    }

    /// Drop every per-match entry. The start-notified ids are kept so a purge
    /// never re-announces kickoff of a match that is still running; they are
    /// only cleared once the set grows past `MAX_STARTED_IDS`.
    pub fn reset(&mut self) {
        self.entries.clear();
        if self.started_notified.len() > MAX_STARTED_IDS {
            self.started_notified.clear();
        }
        self.resets += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_clears_entries_but_keeps_started_ids() {
        let mut cache = StateCache::new();
        cache.entry_mut("m1").home_score = 2;
        cache.entry_mut("m1").notified_events.insert("ev".to_string());
        assert!(cache.mark_start_notified("m1"));
        assert!(!cache.mark_start_notified("m1"));

        cache.reset();

        assert!(cache.is_empty());
        assert!(cache.get("m1").is_none());
        assert!(cache.is_start_notified("m1"));
        assert_eq!(cache.resets(), 1);
    }

    #[test]
    fn entry_is_created_on_first_access() {
        let mut cache = StateCache::new();
        let e = cache.entry_mut("m2");
        assert_eq!(e.status, MatchStatus::Scheduled);
        assert_eq!((e.home_score, e.away_score), (0, 0));
        assert_eq!(cache.len(), 1);
    }
}
