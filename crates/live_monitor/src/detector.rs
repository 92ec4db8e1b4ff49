//! Change Detector — diff nového snapshotu proti State Cache.
//!
//! Three independent checks per match: start transition, per-side score
//! increase, and (live only) new timeline events. The cache entry is updated
//! after every check whether or not anything fired.

use tracing::debug;

use crate::cache::StateCache;
use crate::model::{EventKind, MatchSnapshot, MatchStatus, Side, TimelineEvent};

#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    MatchStarted,
    /// One per side per poll, even if the score jumped by more than one.
    Goal { side: Side },
}

pub fn detect_snapshot(cache: &mut StateCache, snap: &MatchSnapshot) -> Vec<Transition> {
    let mut out = Vec::new();
    let prev = cache.get(&snap.id).map(|e| (e.status, e.home_high, e.away_high));
    let prev_status = prev.map(|(status, _, _)| status);

    // 1. start
    let was_pre = matches!(prev_status, None | Some(MatchStatus::Scheduled));
    let mut start_observed = false;
    if was_pre && snap.is_live() && !cache.is_start_notified(&snap.id) {
        cache.mark_start_notified(&snap.id);
        out.push(Transition::MatchStarted);
        start_observed = prev_status.is_some();
    }

    // 2. skóre proti high-water mark — bez baseline (první výskyt v této generaci cache) jen uložíme
    if let Some((_, prev_home, prev_away)) = prev {
        if snap.home_score > prev_home {
            out.push(Transition::Goal { side: Side::Home });
        }
        if snap.away_score > prev_away {
            out.push(Transition::Goal { side: Side::Away });
        }
    }

    let entry = cache.entry_mut(&snap.id);
    entry.home_score = snap.home_score;
    entry.away_score = snap.away_score;
    entry.home_high = entry.home_high.max(snap.home_score);
    entry.away_high = entry.away_high.max(snap.away_score);
    entry.status = snap.status;
    if start_observed {
        entry.start_observed = true;
    }

    out
}

/// Returns the timeline events that should be notified, recording every id as seen.
///
/// The first timeline fetch for a match that was already running when it
/// entered the cache (process start, cache reset) only seeds the seen-set,
/// so history is never replayed. Goal events are recorded but not returned:
/// the score diff already announces goals.
pub fn detect_timeline(cache: &mut StateCache, snap: &MatchSnapshot, events: Vec<TimelineEvent>) -> Vec<TimelineEvent> {
    if !snap.is_live() {
        return vec![];
    }

    let entry = cache.entry_mut(&snap.id);

    if !entry.timeline_seeded {
        entry.timeline_seeded = true;
        if !entry.start_observed {
            let seeded = events.len();
            entry.notified_events.extend(events.into_iter().map(|e| e.id));
            debug!(match_id = %snap.id, seeded, "timeline baseline recorded");
            return vec![];
        }
    }

    let mut fresh = Vec::new();
    for ev in events {
        if !entry.notified_events.insert(ev.id.clone()) {
            continue;
        }
        match &ev.kind {
            EventKind::Goal => {
                debug!(match_id = %snap.id, clock = %ev.clock, players = ?ev.players, "timeline goal (enrichment only)");
            }
            EventKind::Unrecognized(raw) => {
                debug!(match_id = %snap.id, kind = %raw, "unrecognized timeline event dropped");
            }
            _ => fresh.push(ev),
        }
    }
    fresh
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(id: &str, status: MatchStatus, home: u32, away: u32) -> MatchSnapshot {
        MatchSnapshot {
            id: id.to_string(),
            league: "eng.1".to_string(),
            home_team: "Arsenal".to_string(),
            away_team: "Chelsea".to_string(),
            home_team_id: Some("359".to_string()),
            away_team_id: Some("363".to_string()),
            home_score: home,
            away_score: away,
            status,
            status_detail: String::new(),
            kickoff: None,
        }
    }

    fn event(id: &str, kind: EventKind) -> TimelineEvent {
        TimelineEvent {
            id: id.to_string(),
            kind,
            match_id: "m".to_string(),
            clock: "10'".to_string(),
            side: Some(Side::Home),
            players: vec![],
        }
    }

    fn count_starts(t: &[Transition]) -> usize {
        t.iter().filter(|t| **t == Transition::MatchStarted).count()
    }

    #[test]
    fn start_fires_once_per_match() {
        let mut cache = StateCache::new();
        assert!(detect_snapshot(&mut cache, &snap("m", MatchStatus::Scheduled, 0, 0)).is_empty());

        let first = detect_snapshot(&mut cache, &snap("m", MatchStatus::Live, 0, 0));
        assert_eq!(first, vec![Transition::MatchStarted]);

        for _ in 0..3 {
            assert_eq!(count_starts(&detect_snapshot(&mut cache, &snap("m", MatchStatus::Live, 0, 0))), 0);
        }
        // back to "scheduled" (provider glitch) and live again: still only once
        detect_snapshot(&mut cache, &snap("m", MatchStatus::Scheduled, 0, 0));
        assert_eq!(count_starts(&detect_snapshot(&mut cache, &snap("m", MatchStatus::Live, 0, 0))), 0);
    }

    #[test]
    fn start_fires_on_first_sighting_of_live_match() {
        let mut cache = StateCache::new();
        let t = detect_snapshot(&mut cache, &snap("m", MatchStatus::Live, 1, 0));
        assert_eq!(t, vec![Transition::MatchStarted]);
    }

    #[test]
    fn start_not_repeated_after_cache_reset() {
        let mut cache = StateCache::new();
        detect_snapshot(&mut cache, &snap("m", MatchStatus::Live, 0, 0));
        cache.reset();
        assert!(detect_snapshot(&mut cache, &snap("m", MatchStatus::Live, 0, 0)).is_empty());
    }

    #[test]
    fn goal_per_side_and_multi_goal_jump_is_single() {
        let mut cache = StateCache::new();
        detect_snapshot(&mut cache, &snap("m", MatchStatus::Live, 0, 0));

        let t = detect_snapshot(&mut cache, &snap("m", MatchStatus::Live, 2, 0));
        assert_eq!(t, vec![Transition::Goal { side: Side::Home }]);

        let t = detect_snapshot(&mut cache, &snap("m", MatchStatus::Live, 3, 1));
        assert_eq!(t, vec![Transition::Goal { side: Side::Home }, Transition::Goal { side: Side::Away }]);
    }

    #[test]
    fn no_goal_on_repeat_or_decrease() {
        let mut cache = StateCache::new();
        detect_snapshot(&mut cache, &snap("m", MatchStatus::Live, 1, 1));
        assert!(detect_snapshot(&mut cache, &snap("m", MatchStatus::Live, 1, 1)).is_empty());
        // VAR disallowed goal → provider corrects score down
        assert!(detect_snapshot(&mut cache, &snap("m", MatchStatus::Live, 0, 1)).is_empty());
        assert_eq!(cache.get("m").map(|e| e.home_score), Some(0));
        // back to 1: already announced once
        assert!(detect_snapshot(&mut cache, &snap("m", MatchStatus::Live, 1, 1)).is_empty());
        // a genuinely new goal above the mark fires
        assert_eq!(
            detect_snapshot(&mut cache, &snap("m", MatchStatus::Live, 2, 1)),
            vec![Transition::Goal { side: Side::Home }]
        );
    }

    #[test]
    fn disallowed_then_rescored_goal_fires_once() {
        let mut cache = StateCache::new();
        let mut home_fires = 0;
        for h in [0, 1, 0, 1] {
            home_fires += detect_snapshot(&mut cache, &snap("m", MatchStatus::Live, h, 0))
                .iter()
                .filter(|t| matches!(t, Transition::Goal { side: Side::Home }))
                .count();
        }
        assert_eq!(home_fires, 1);
    }

    #[test]
    fn goal_fires_never_exceed_final_score() {
        let mut cache = StateCache::new();
        let polls = [(0, 0), (1, 0), (1, 0), (3, 0), (3, 1), (3, 1), (3, 2)];
        let mut home_fires = 0;
        let mut away_fires = 0;
        for (h, a) in polls {
            for t in detect_snapshot(&mut cache, &snap("m", MatchStatus::Live, h, a)) {
                match t {
                    Transition::Goal { side: Side::Home } => home_fires += 1,
                    Transition::Goal { side: Side::Away } => away_fires += 1,
                    Transition::MatchStarted => {}
                }
            }
        }
        assert!(home_fires <= 3);
        assert!(away_fires <= 2);
        assert_eq!((home_fires, away_fires), (2, 2));
    }

    #[test]
    fn first_sighting_sets_baseline_without_goals() {
        let mut cache = StateCache::new();
        let t = detect_snapshot(&mut cache, &snap("m", MatchStatus::Live, 2, 2));
        assert!(!t.iter().any(|t| matches!(t, Transition::Goal { .. })));
        assert_eq!(cache.get("m").map(|e| (e.home_score, e.away_score)), Some((2, 2)));
    }

    #[test]
    fn timeline_events_notify_once() {
        let mut cache = StateCache::new();
        detect_snapshot(&mut cache, &snap("m", MatchStatus::Scheduled, 0, 0));
        detect_snapshot(&mut cache, &snap("m", MatchStatus::Live, 0, 0));
        let live = snap("m", MatchStatus::Live, 0, 0);

        let batch = vec![event("e1", EventKind::YellowCard), event("e2", EventKind::Var)];
        let fresh = detect_timeline(&mut cache, &live, batch.clone());
        assert_eq!(fresh.len(), 2);

        assert!(detect_timeline(&mut cache, &live, batch.clone()).is_empty());

        let mut more = batch;
        more.push(event("e3", EventKind::RedCard));
        let fresh = detect_timeline(&mut cache, &live, more);
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].kind, EventKind::RedCard);
    }

    #[test]
    fn timeline_goals_and_unknown_kinds_are_not_returned() {
        let mut cache = StateCache::new();
        detect_snapshot(&mut cache, &snap("m", MatchStatus::Scheduled, 0, 0));
        detect_snapshot(&mut cache, &snap("m", MatchStatus::Live, 0, 0));
        let live = snap("m", MatchStatus::Live, 0, 0);

        let fresh = detect_timeline(&mut cache, &live, vec![
            event("g1", EventKind::Goal),
            event("x1", EventKind::Unrecognized("drinks-break".to_string())),
            event("s1", EventKind::Substitution),
        ]);
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].id, "s1");
        // recorded anyway
        assert!(cache.get("m").unwrap().notified_events.contains("g1"));
    }

    #[test]
    fn mid_match_first_sighting_only_seeds_timeline() {
        let mut cache = StateCache::new();
        let live = snap("m", MatchStatus::Live, 1, 0);
        detect_snapshot(&mut cache, &live);

        let history = vec![event("c1", EventKind::YellowCard), event("c2", EventKind::YellowCard)];
        assert!(detect_timeline(&mut cache, &live, history.clone()).is_empty());

        let mut next = history;
        next.push(event("c3", EventKind::RedCard));
        let fresh = detect_timeline(&mut cache, &live, next);
        assert_eq!(fresh.len(), 1);
        assert_eq!(fresh[0].id, "c3");
    }

    #[test]
    fn timeline_ignored_for_non_live_match() {
        let mut cache = StateCache::new();
        let done = snap("m", MatchStatus::Finished, 1, 0);
        assert!(detect_timeline(&mut cache, &done, vec![event("e", EventKind::RedCard)]).is_empty());
    }
}
