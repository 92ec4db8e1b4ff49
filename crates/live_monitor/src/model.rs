use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Hrubý stav zápasu, na který mapujeme všechny slovníky providerů
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    #[default]
    Scheduled,
    Live,
    Finished,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Scheduled => "scheduled",
            MatchStatus::Live => "live",
            MatchStatus::Finished => "finished",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Home,
    Away,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Home => "home",
            Side::Away => "away",
        }
    }
}

/// Point-in-time view of one match from one poll. Rebuilt every tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSnapshot {
    pub id:            String,
    pub league:        String,
    pub home_team:     String,
    pub away_team:     String,
    pub home_team_id:  Option<String>,
    pub away_team_id:  Option<String>,
    pub home_score:    u32,
    pub away_score:    u32,
    pub status:        MatchStatus,
    /// Raw provider wording, kept for logs only
    pub status_detail: String,
    pub kickoff:       Option<DateTime<Utc>>,
}

impl MatchSnapshot {
    pub fn is_live(&self) -> bool {
        self.status == MatchStatus::Live
    }

    pub fn is_finished(&self) -> bool {
        self.status == MatchStatus::Finished
    }

    pub fn score_line(&self) -> String {
        format!("{} {}-{} {}", self.home_team, self.home_score, self.away_score, self.away_team)
    }

    pub fn team(&self, side: Side) -> &str {
        match side {
            Side::Home => &self.home_team,
            Side::Away => &self.away_team,
        }
    }
}

/// Closed set of play-by-play kinds. Anything else lands in `Unrecognized`
/// and is dropped by the detector after a debug log.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Goal,
    YellowCard,
    RedCard,
    SecondYellow,
    PenaltyMissed,
    PenaltySaved,
    Var,
    Substitution,
    Unrecognized(String),
}

impl EventKind {
    /// Klasifikace textového typu od providera ("yellow-card", "Goal - Header", "VAR - Goal disallowed", ...)
    pub fn from_provider(raw: &str) -> Self {
        let t = raw.to_lowercase().replace(['-', '_', '/'], " ");
        let t = t.split_whitespace().collect::<Vec<_>>().join(" ");
        let has = |needle: &str| t.contains(needle);

        if has("second yellow") || has("yellow red") || has("2nd yellow") {
            EventKind::SecondYellow
        } else if has("red card") || t == "red" {
            EventKind::RedCard
        } else if has("yellow") {
            EventKind::YellowCard
        } else if has("penalty") && has("miss") {
            EventKind::PenaltyMissed
        } else if has("penalty") && has("save") {
            EventKind::PenaltySaved
        } else if t == "var" || t.starts_with("var ") || has(" var ") || has("video assistant") {
            EventKind::Var
        } else if has("substitution") || t == "sub" {
            EventKind::Substitution
        } else if has("goal") || has("penalty scored") {
            EventKind::Goal
        } else {
            EventKind::Unrecognized(raw.to_string())
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Goal => "goal",
            EventKind::YellowCard => "yellow_card",
            EventKind::RedCard => "red_card",
            EventKind::SecondYellow => "second_yellow",
            EventKind::PenaltyMissed => "penalty_missed",
            EventKind::PenaltySaved => "penalty_saved",
            EventKind::Var => "var",
            EventKind::Substitution => "substitution",
            EventKind::Unrecognized(_) => "unrecognized",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEvent {
    /// Provider id, or `kind:clock:participant` when the provider gives none
    pub id:       String,
    pub kind:     EventKind,
    pub match_id: String,
    pub clock:    String,
    pub side:     Option<Side>,
    pub players:  Vec<String>,
}

impl TimelineEvent {
    pub fn derived_id(kind: &EventKind, clock: &str, participant: Option<&str>) -> String {
        format!("{}:{}:{}", kind.as_str(), clock, participant.unwrap_or("-"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_provider_event_kinds() {
        assert_eq!(EventKind::from_provider("yellow-card"), EventKind::YellowCard);
        assert_eq!(EventKind::from_provider("Red Card"), EventKind::RedCard);
        assert_eq!(EventKind::from_provider("yellow-red-card"), EventKind::SecondYellow);
        assert_eq!(EventKind::from_provider("Second Yellow Card"), EventKind::SecondYellow);
        assert_eq!(EventKind::from_provider("penalty---missed"), EventKind::PenaltyMissed);
        assert_eq!(EventKind::from_provider("Penalty - Saved"), EventKind::PenaltySaved);
        assert_eq!(EventKind::from_provider("penalty---scored"), EventKind::Goal);
        assert_eq!(EventKind::from_provider("Goal - Header"), EventKind::Goal);
        assert_eq!(EventKind::from_provider("VAR - Goal disallowed"), EventKind::Var);
        assert_eq!(EventKind::from_provider("substitution"), EventKind::Substitution);
    }

    #[test]
    fn unknown_kind_is_kept_verbatim() {
        assert_eq!(
            EventKind::from_provider("drinks-break"),
            EventKind::Unrecognized("drinks-break".to_string())
        );
        // "var" must not fire on words that merely contain it
        assert!(matches!(EventKind::from_provider("various"), EventKind::Unrecognized(_)));
    }

    #[test]
    fn derived_id_is_stable_for_same_tuple() {
        let a = TimelineEvent::derived_id(&EventKind::YellowCard, "34'", Some("Casemiro"));
        let b = TimelineEvent::derived_id(&EventKind::YellowCard, "34'", Some("Casemiro"));
        assert_eq!(a, b);
        assert_eq!(a, "yellow_card:34':Casemiro");
        assert_ne!(a, TimelineEvent::derived_id(&EventKind::YellowCard, "35'", Some("Casemiro")));
    }
}
