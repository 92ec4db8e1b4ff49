//! League Fetcher + Timeline Fetcher nad ESPN public API (bez klíče).
//!
//!   scoreboard: {base}/{league}/scoreboard[?dates=YYYYMMDD]
//!   timeline:   {base}/{league}/summary?event={id}   → keyEvents[]
//!
//! Payload je rozbitý různě podle ligy (score jednou string, jednou číslo,
//! status jednou na eventu, jednou na competition), proto čteme přes
//! `serde_json::Value::pointer` a chybějící pole nahrazujeme placeholdery.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use logger::{now_iso, ApiStatusEvent, EventLogger};
use serde_json::Value;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

use crate::model::{EventKind, MatchSnapshot, MatchStatus, Side, TimelineEvent};
use crate::status::map_status;

pub const ESPN_SOCCER_BASE: &str = "https://site.api.espn.com/apis/site/v2/sports/soccer";

pub const UNKNOWN_TEAM: &str = "Unknown";

const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
    "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
];

#[derive(thiserror::Error, Debug)]
pub enum FeedError {
    /// Network, DNS, TLS or timeout.
    #[error("http request failed for {url}: {source}")]
    Http {
        url: String,
        source: reqwest::Error,
    },

    #[error("failed to read response body from {url}: {source}")]
    Body {
        url: String,
        source: reqwest::Error,
    },

    #[error("{url} answered {status}")]
    Status {
        url: String,
        status: u16,
    },
}

/// Boundary to the sports data provider. The scheduler only sees this.
#[async_trait]
pub trait ScoreFeed: Send + Sync {
    async fn fetch_league(&self, league: &str) -> Result<Vec<MatchSnapshot>, FeedError>;

    async fn fetch_timeline(&self, snapshot: &MatchSnapshot) -> Result<Vec<TimelineEvent>, FeedError>;
}

pub struct EspnFeed {
    client: reqwest::Client,
    base_url: String,
    ua_index: AtomicUsize,
    limiter: DefaultDirectRateLimiter,
    logger: Option<EventLogger>,
}

impl EspnFeed {
    pub fn new(base_url: impl Into<String>, logger: Option<EventLogger>) -> Self {
        let quota = Quota::with_period(Duration::from_millis(250))
            .unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN));

        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ua_index: AtomicUsize::new(0),
            limiter: RateLimiter::direct(quota),
            logger,
        }
    }

    /// Rotace user-agenta, každý request jiný
    fn next_user_agent(&self) -> &'static str {
        let i = self.ua_index.fetch_add(1, Ordering::Relaxed);
        USER_AGENTS[i % USER_AGENTS.len()]
    }

    /// One GET. Non-success status is an error; malformed JSON → `Ok(None)`
    /// (placeholder data, not a failure).
    async fn get_json(&self, url: &str, scope: &str) -> Result<Option<Value>, FeedError> {
        self.limiter.until_ready().await;

        let resp = self.client
            .get(url)
            .header("User-Agent", self.next_user_agent())
            .header("Accept", "application/json")
            .header("Accept-Language", "en-US,en;q=0.8")
            .send()
            .await
            .map_err(|source| FeedError::Http { url: url.to_string(), source })?;

        let status = resp.status();
        if !status.is_success() {
            warn!(%status, scope, "ESPN request rejected, skipping this cycle");
            self.log_api(scope, false, Some(status.as_u16()), &format!("http_{}", status.as_u16()), 0);
            return Err(FeedError::Status { url: url.to_string(), status: status.as_u16() });
        }

        let raw = resp
            .text()
            .await
            .map_err(|source| FeedError::Body { url: url.to_string(), source })?;

        match serde_json::from_str::<Value>(&raw) {
            Ok(v) => Ok(Some(v)),
            Err(e) => {
                warn!(scope, "ESPN returned malformed JSON: {e}");
                self.log_api(scope, false, Some(status.as_u16()), "malformed_json", 0);
                Ok(None)
            }
        }
    }

    /// Scoreboard for one calendar day; used by the correlator's finished-match scan.
    pub async fn fetch_league_day(&self, league: &str, day: NaiveDate) -> Result<Vec<MatchSnapshot>, FeedError> {
        let url = format!("{}/{}/scoreboard?dates={}", self.base_url, league, day.format("%Y%m%d"));
        let Some(body) = self.get_json(&url, league).await? else {
            return Ok(vec![]);
        };
        let matches = parse_scoreboard(league, &body);
        self.log_api(league, true, Some(200), "ok", matches.len());
        Ok(matches)
    }

    fn log_api(&self, scope: &str, ok: bool, status_code: Option<u16>, message: &str, items: usize) {
        if let Some(logger) = &self.logger {
            let _ = logger.log(&ApiStatusEvent {
                ts: now_iso(),
                event: "API_STATUS",
                source: "espn".to_string(),
                scope: scope.to_string(),
                ok,
                status_code,
                message: message.to_string(),
                items_logged: items,
            });
        }
    }
}

#[async_trait]
impl ScoreFeed for EspnFeed {
    async fn fetch_league(&self, league: &str) -> Result<Vec<MatchSnapshot>, FeedError> {
        let url = format!("{}/{}/scoreboard", self.base_url, league);
        let Some(body) = self.get_json(&url, league).await? else {
            return Ok(vec![]);
        };
        let matches = parse_scoreboard(league, &body);
        debug!(league, count = matches.len(), "scoreboard parsed");
        self.log_api(league, true, Some(200), "ok", matches.len());
        Ok(matches)
    }

    async fn fetch_timeline(&self, snapshot: &MatchSnapshot) -> Result<Vec<TimelineEvent>, FeedError> {
        let url = format!("{}/{}/summary?event={}", self.base_url, snapshot.league, snapshot.id);
        let Some(body) = self.get_json(&url, &snapshot.id).await? else {
            return Ok(vec![]);
        };
        Ok(parse_key_events(snapshot, &body))
    }
}

// ====================================================================
// Parsing (pure)
// ====================================================================

fn str_at<'a>(v: &'a Value, path: &str) -> Option<&'a str> {
    v.pointer(path).and_then(|s| s.as_str()).filter(|s| !s.trim().is_empty())
}

/// Id bývá string i číslo
fn id_at(v: &Value, path: &str) -> Option<String> {
    match v.pointer(path)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Score bývá "2", 2, nebo {"value": 2.0, "displayValue": "2"}
fn score_of(v: Option<&Value>) -> u32 {
    match v {
        Some(Value::Number(n)) => n.as_u64().or_else(|| n.as_f64().map(|f| f.max(0.0) as u64)).unwrap_or(0) as u32,
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        Some(obj @ Value::Object(_)) => score_of(obj.get("value").or_else(|| obj.get("displayValue"))),
        _ => 0,
    }
}

pub fn parse_scoreboard(league: &str, body: &Value) -> Vec<MatchSnapshot> {
    let Some(events) = body.pointer("/events").and_then(|e| e.as_array()) else {
        return vec![];
    };

    events.iter().filter_map(|ev| parse_event(league, ev)).collect()
}

fn parse_event(league: &str, ev: &Value) -> Option<MatchSnapshot> {
    let id = id_at(ev, "/id")?;
    let comp = ev.pointer("/competitions/0").unwrap_or(&Value::Null);
    let competitors = comp.pointer("/competitors").and_then(|c| c.as_array()).cloned().unwrap_or_default();

    let home = competitor(&competitors, "home", 0);
    let away = competitor(&competitors, "away", 1);

    let team_name = |c: Option<&Value>| -> String {
        c.and_then(|c| str_at(c, "/team/displayName").or_else(|| str_at(c, "/team/name")).or_else(|| str_at(c, "/team/shortDisplayName")))
            .unwrap_or(UNKNOWN_TEAM)
            .to_string()
    };
    let team_id = |c: Option<&Value>| c.and_then(|c| id_at(c, "/team/id"));

    // status může být na competition nebo na eventu
    let status = comp.pointer("/status").or_else(|| ev.pointer("/status")).unwrap_or(&Value::Null);
    let short = str_at(status, "/type/state").or_else(|| str_at(status, "/type/shortDetail"));
    let verbose = [str_at(status, "/type/description"), str_at(status, "/type/detail")]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    // `name` (STATUS_POSTPONED, STATUS_CANCELED...) rozliší void zápasy se state "post"
    let vocabulary = match str_at(status, "/type/name") {
        Some(name) => format!("{name} {verbose}"),
        None => verbose.clone(),
    };
    let mut match_status = map_status(short, Some(vocabulary.as_str()));
    if match_status == MatchStatus::Finished && status.pointer("/type/completed").and_then(|c| c.as_bool()) == Some(false) {
        match_status = MatchStatus::Scheduled;
    }

    let kickoff = str_at(ev, "/date")
        .or_else(|| str_at(comp, "/date"))
        .and_then(parse_kickoff);

    Some(MatchSnapshot {
        id,
        league: str_at(ev, "/league/slug").unwrap_or(league).to_string(),
        home_team: team_name(home),
        away_team: team_name(away),
        home_team_id: team_id(home),
        away_team_id: team_id(away),
        home_score: score_of(home.and_then(|c| c.get("score"))),
        away_score: score_of(away.and_then(|c| c.get("score"))),
        status: match_status,
        status_detail: verbose,
        kickoff,
    })
}

/// Podle `homeAway`, jinak pozičně (home první)
fn competitor<'a>(competitors: &'a [Value], wanted: &str, fallback_idx: usize) -> Option<&'a Value> {
    competitors
        .iter()
        .find(|c| c.pointer("/homeAway").and_then(|h| h.as_str()) == Some(wanted))
        .or_else(|| competitors.get(fallback_idx))
}

/// ESPN píše "2024-05-19T15:00Z" (bez sekund), RFC3339 parser to nevezme
pub fn parse_kickoff(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%MZ")
                .ok()
                .map(|n| n.and_utc())
        })
}

pub fn parse_key_events(snapshot: &MatchSnapshot, body: &Value) -> Vec<TimelineEvent> {
    let events = body
        .pointer("/keyEvents")
        .or_else(|| body.pointer("/plays"))
        .and_then(|e| e.as_array());
    let Some(events) = events else {
        return vec![];
    };

    events
        .iter()
        .filter_map(|ev| {
            let raw_kind = str_at(ev, "/type/type").or_else(|| str_at(ev, "/type/text"))?;
            let kind = EventKind::from_provider(raw_kind);
            let clock = str_at(ev, "/clock/displayValue").unwrap_or("?").to_string();

            let players: Vec<String> = ev
                .pointer("/participants")
                .and_then(|p| p.as_array())
                .map(|ps| {
                    ps.iter()
                        .filter_map(|p| str_at(p, "/athlete/displayName").map(str::to_string))
                        .collect()
                })
                .unwrap_or_default();

            let side = resolve_side(snapshot, ev);
            let id = id_at(ev, "/id")
                .unwrap_or_else(|| TimelineEvent::derived_id(&kind, &clock, players.first().map(String::as_str)));

            Some(TimelineEvent {
                id,
                kind,
                match_id: snapshot.id.clone(),
                clock,
                side,
                players,
            })
        })
        .collect()
}

fn resolve_side(snapshot: &MatchSnapshot, ev: &Value) -> Option<Side> {
    if let Some(team_id) = id_at(ev, "/team/id") {
        if snapshot.home_team_id.as_deref() == Some(team_id.as_str()) {
            return Some(Side::Home);
        }
        if snapshot.away_team_id.as_deref() == Some(team_id.as_str()) {
            return Some(Side::Away);
        }
    }
    let name = str_at(ev, "/team/displayName")?;
    if name.eq_ignore_ascii_case(&snapshot.home_team) {
        Some(Side::Home)
    } else if name.eq_ignore_ascii_case(&snapshot.away_team) {
        Some(Side::Away)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scoreboard() -> Value {
        json!({
            "events": [
                {
                    "id": "704512",
                    "date": "2024-05-19T15:00Z",
                    "competitions": [{
                        "competitors": [
                            { "homeAway": "away", "score": "1", "team": { "id": "360", "displayName": "Manchester United" } },
                            { "homeAway": "home", "score": 2, "team": { "id": "364", "displayName": "Liverpool" } }
                        ],
                        "status": { "type": { "state": "in", "description": "Second Half", "detail": "67'" } }
                    }]
                },
                {
                    "id": 704513,
                    "competitions": [{
                        "competitors": [ { "homeAway": "home" }, {} ]
                    }]
                },
                { "name": "no id, skipped" }
            ]
        })
    }

    #[test]
    fn parses_scoreboard_with_mixed_shapes() {
        let matches = parse_scoreboard("eng.1", &scoreboard());
        assert_eq!(matches.len(), 2);

        let m = &matches[0];
        assert_eq!(m.id, "704512");
        assert_eq!(m.home_team, "Liverpool");
        assert_eq!(m.away_team, "Manchester United");
        assert_eq!((m.home_score, m.away_score), (2, 1));
        assert_eq!(m.status, MatchStatus::Live);
        assert_eq!(m.home_team_id.as_deref(), Some("364"));
        assert!(m.kickoff.is_some());
        assert_eq!(m.league, "eng.1");
    }

    #[test]
    fn missing_fields_fall_back_to_placeholders() {
        let matches = parse_scoreboard("eng.1", &scoreboard());
        let m = &matches[1];
        assert_eq!(m.id, "704513");
        assert_eq!(m.home_team, UNKNOWN_TEAM);
        assert_eq!(m.away_team, UNKNOWN_TEAM);
        assert_eq!((m.home_score, m.away_score), (0, 0));
        assert_eq!(m.status, MatchStatus::Scheduled);
        assert!(m.kickoff.is_none());
    }

    #[test]
    fn postponed_post_state_is_not_finished() {
        let event = |name: &str, completed: bool, description: &str| {
            json!({
                "events": [{
                    "id": "900",
                    "competitions": [{
                        "competitors": [
                            { "homeAway": "home", "score": "0", "team": { "displayName": "Santos" } },
                            { "homeAway": "away", "score": "0", "team": { "displayName": "Bahia" } }
                        ],
                        "status": { "type": {
                            "name": name, "state": "post", "completed": completed, "description": description
                        } }
                    }]
                }]
            })
        };

        let postponed = parse_scoreboard("bra.1", &event("STATUS_POSTPONED", false, "Postponed")).remove(0);
        assert_eq!(postponed.status, MatchStatus::Scheduled);

        let canceled = parse_scoreboard("bra.1", &event("STATUS_CANCELED", false, "Canceled")).remove(0);
        assert_eq!(canceled.status, MatchStatus::Scheduled);

        // neznámý název, ale completed=false
        let odd = parse_scoreboard("bra.1", &event("STATUS_SOMETHING", false, "Final")).remove(0);
        assert_eq!(odd.status, MatchStatus::Scheduled);

        let full_time = parse_scoreboard("bra.1", &event("STATUS_FULL_TIME", true, "Full Time")).remove(0);
        assert_eq!(full_time.status, MatchStatus::Finished);
    }

    #[test]
    fn garbage_body_yields_nothing() {
        assert!(parse_scoreboard("eng.1", &json!({"events": "nope"})).is_empty());
        assert!(parse_scoreboard("eng.1", &json!(null)).is_empty());
    }

    #[test]
    fn parses_key_events_and_derives_missing_ids() {
        let snap = parse_scoreboard("eng.1", &scoreboard()).remove(0);
        let body = json!({
            "keyEvents": [
                {
                    "id": "ke-1",
                    "type": { "type": "yellow-card", "text": "Yellow Card" },
                    "clock": { "displayValue": "23'" },
                    "team": { "id": "360" },
                    "participants": [ { "athlete": { "displayName": "Casemiro" } } ]
                },
                {
                    "type": { "text": "Substitution" },
                    "clock": { "displayValue": "60'" },
                    "team": { "displayName": "liverpool" },
                    "participants": [
                        { "athlete": { "displayName": "Darwin Nunez" } },
                        { "athlete": { "displayName": "Diogo Jota" } }
                    ]
                },
                { "clock": { "displayValue": "70'" } }
            ]
        });

        let events = parse_key_events(&snap, &body);
        assert_eq!(events.len(), 2);

        assert_eq!(events[0].id, "ke-1");
        assert_eq!(events[0].kind, EventKind::YellowCard);
        assert_eq!(events[0].side, Some(Side::Away));

        assert_eq!(events[1].kind, EventKind::Substitution);
        assert_eq!(events[1].side, Some(Side::Home));
        assert_eq!(events[1].id, "substitution:60':Darwin Nunez");
        assert_eq!(events[1].players.len(), 2);
        assert_eq!(events[1].match_id, "704512");
    }

    #[test]
    fn kickoff_accepts_minute_precision() {
        let dt = parse_kickoff("2024-05-19T15:00Z").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-05-19T15:00:00+00:00");
        assert!(parse_kickoff("2024-05-19T15:00:00Z").is_some());
        assert!(parse_kickoff("tomorrow").is_none());
    }
}
