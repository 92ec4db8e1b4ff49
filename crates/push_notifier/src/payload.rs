//! Notification payloady — co posíláme a komu.

use live_monitor::{EventKind, MatchSnapshot, Side, TimelineEvent};
use serde_json::{json, Value};

/// Category used for per-user preference filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    MatchStart,
    Goal,
    Card,
    Penalty,
    Var,
    Substitution,
    PredictionResult,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::MatchStart => "match_start",
            NotificationKind::Goal => "goal",
            NotificationKind::Card => "card",
            NotificationKind::Penalty => "penalty",
            NotificationKind::Var => "var",
            NotificationKind::Substitution => "substitution",
            NotificationKind::PredictionResult => "prediction_result",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Audience {
    /// Every user with a registered address, subject to preferences.
    Broadcast,
    User(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct NotificationPayload {
    pub kind:     NotificationKind,
    pub title:    String,
    pub body:     String,
    /// Type tag + correlating ids, passed through to the device.
    pub data:     Value,
    pub audience: Audience,
    /// Teams involved, for favorites filtering. Empty for per-user payloads.
    pub teams:    Vec<String>,
}

fn match_data(kind: NotificationKind, snap: &MatchSnapshot) -> Value {
    json!({
        "type": kind.as_str(),
        "matchId": snap.id,
        "league": snap.league,
    })
}

fn broadcast(kind: NotificationKind, snap: &MatchSnapshot, title: String, body: String) -> NotificationPayload {
    NotificationPayload {
        kind,
        title,
        body,
        data: match_data(kind, snap),
        audience: Audience::Broadcast,
        teams: vec![snap.home_team.clone(), snap.away_team.clone()],
    }
}

pub fn match_started(snap: &MatchSnapshot) -> NotificationPayload {
    broadcast(
        NotificationKind::MatchStart,
        snap,
        "🟢 Kick-off!".to_string(),
        format!("{} vs {} has started", snap.home_team, snap.away_team),
    )
}

pub fn goal(snap: &MatchSnapshot, side: Side) -> NotificationPayload {
    let mut payload = broadcast(
        NotificationKind::Goal,
        snap,
        format!("⚽ GOAL! {}", snap.team(side)),
        snap.score_line(),
    );
    payload.data["side"] = json!(side.as_str());
    payload.data["homeScore"] = json!(snap.home_score);
    payload.data["awayScore"] = json!(snap.away_score);
    payload
}

/// `None` for kinds that are never notified (goals come from the score diff).
pub fn timeline_event(snap: &MatchSnapshot, event: &TimelineEvent) -> Option<NotificationPayload> {
    let (kind, title) = match &event.kind {
        EventKind::YellowCard => (NotificationKind::Card, "🟨 Yellow card"),
        EventKind::SecondYellow => (NotificationKind::Card, "🟨🟥 Second yellow"),
        EventKind::RedCard => (NotificationKind::Card, "🟥 Red card"),
        EventKind::PenaltyMissed => (NotificationKind::Penalty, "❌ Penalty missed"),
        EventKind::PenaltySaved => (NotificationKind::Penalty, "🧤 Penalty saved"),
        EventKind::Var => (NotificationKind::Var, "📺 VAR check"),
        EventKind::Substitution => (NotificationKind::Substitution, "🔄 Substitution"),
        EventKind::Goal | EventKind::Unrecognized(_) => return None,
    };

    let who = if event.players.is_empty() {
        event.side.map(|s| snap.team(s).to_string()).unwrap_or_default()
    } else {
        let players = event.players.join(" ↔ ");
        match event.side {
            Some(s) => format!("{} ({})", players, snap.team(s)),
            None => players,
        }
    };
    let body = if who.is_empty() {
        format!("{} {} · {}", snap.score_line(), event.clock, event.kind.as_str())
    } else {
        format!("{} {} · {}", event.clock, who, snap.score_line())
    };

    let mut payload = broadcast(kind, snap, title.to_string(), body.trim().to_string());
    payload.data["eventId"] = json!(event.id);
    payload.data["eventKind"] = json!(event.kind.as_str());
    Some(payload)
}

/// Everything a prediction-result notification needs, decoupled from the scoring types.
#[derive(Debug, Clone)]
pub struct ResultNotice {
    pub user_id:       String,
    pub prediction_id: String,
    pub match_id:      String,
    pub home_team:     String,
    pub away_team:     String,
    pub actual_home:   u32,
    pub actual_away:   u32,
    pub points:        u32,
    pub outcome:       String,
    pub streak:        u32,
    /// Bonus points the streak earned on this prediction; 0 when below the threshold.
    pub streak_bonus:  u32,
}

pub fn prediction_result(notice: &ResultNotice) -> NotificationPayload {
    let title = match notice.outcome.as_str() {
        "exact" => "🎯 Exact score!".to_string(),
        "miss" => "Prediction missed".to_string(),
        _ => format!("✅ +{} points", notice.points),
    };
    let mut body = format!(
        "{} {}-{} {} · {} pts",
        notice.home_team, notice.actual_home, notice.actual_away, notice.away_team, notice.points
    );
    if notice.streak_bonus > 0 {
        body.push_str(&format!(" · 🔥 streak {} (+{})", notice.streak, notice.streak_bonus));
    }

    NotificationPayload {
        kind: NotificationKind::PredictionResult,
        title,
        body,
        data: json!({
            "type": NotificationKind::PredictionResult.as_str(),
            "predictionId": notice.prediction_id,
            "matchId": notice.match_id,
            "points": notice.points,
            "outcome": notice.outcome,
            "streak": notice.streak,
            "streakBonus": notice.streak_bonus,
        }),
        audience: Audience::User(notice.user_id.clone()),
        teams: vec![],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use live_monitor::MatchStatus;

    fn snap() -> MatchSnapshot {
        MatchSnapshot {
            id: "401".to_string(),
            league: "eng.1".to_string(),
            home_team: "Arsenal".to_string(),
            away_team: "Chelsea".to_string(),
            home_team_id: None,
            away_team_id: None,
            home_score: 2,
            away_score: 1,
            status: MatchStatus::Live,
            status_detail: "67'".to_string(),
            kickoff: None,
        }
    }

    fn event(kind: EventKind) -> TimelineEvent {
        TimelineEvent {
            id: "ev-1".to_string(),
            kind,
            match_id: "401".to_string(),
            clock: "55'".to_string(),
            side: Some(Side::Away),
            players: vec!["Cole Palmer".to_string()],
        }
    }

    #[test]
    fn goal_payload_names_scoring_side() {
        let p = goal(&snap(), Side::Home);
        assert_eq!(p.title, "⚽ GOAL! Arsenal");
        assert_eq!(p.body, "Arsenal 2-1 Chelsea");
        assert_eq!(p.audience, Audience::Broadcast);
        assert_eq!(p.data["type"], "goal");
        assert_eq!(p.data["side"], "home");
    }

    #[test]
    fn timeline_payloads_by_kind() {
        let p = timeline_event(&snap(), &event(EventKind::RedCard)).unwrap();
        assert_eq!(p.kind, NotificationKind::Card);
        assert!(p.body.contains("Cole Palmer (Chelsea)"));
        assert_eq!(p.data["eventId"], "ev-1");

        assert_eq!(timeline_event(&snap(), &event(EventKind::Var)).unwrap().kind, NotificationKind::Var);
        assert!(timeline_event(&snap(), &event(EventKind::Goal)).is_none());
        assert!(timeline_event(&snap(), &event(EventKind::Unrecognized("x".into()))).is_none());
    }

    fn notice(streak: u32, streak_bonus: u32) -> ResultNotice {
        ResultNotice {
            user_id: "u1".to_string(),
            prediction_id: "p1".to_string(),
            match_id: "m1".to_string(),
            home_team: "Palmeiras".to_string(),
            away_team: "Flamengo".to_string(),
            actual_home: 2,
            actual_away: 1,
            points: 5 + streak_bonus,
            outcome: "exact".to_string(),
            streak,
            streak_bonus,
        }
    }

    #[test]
    fn result_payload_targets_one_user() {
        let p = prediction_result(&notice(4, 2));
        assert_eq!(p.audience, Audience::User("u1".to_string()));
        assert_eq!(p.title, "🎯 Exact score!");
        assert!(p.body.contains("streak 4 (+2)"));
        assert_eq!(p.data["streakBonus"], 2);
        assert!(p.teams.is_empty());
    }

    #[test]
    fn streak_line_follows_the_applied_bonus() {
        // dlouhý streak, ale threshold nastavený výš → bez bonusu
        assert!(!prediction_result(&notice(4, 0)).body.contains("streak"));
        // threshold 2 → bonus už na druhém tipu
        assert!(prediction_result(&notice(2, 2)).body.contains("streak 2 (+2)"));
    }
}
