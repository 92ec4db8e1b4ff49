//! Alternate fixture provider (API-Football v3), indexed by numeric fixture id.
//! Used only as the first resolution step for predictions recorded against that id scheme.

use serde_json::Value;
use std::time::Duration;
use tracing::warn;

use crate::feed::{parse_kickoff, FeedError, UNKNOWN_TEAM};
use crate::model::MatchSnapshot;
use crate::status::map_status;

pub const API_FOOTBALL_BASE: &str = "https://v3.football.api-sports.io";

pub struct ApiFootballClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl ApiFootballClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    pub async fn fetch_fixture(&self, fixture_id: u64) -> Result<Option<MatchSnapshot>, FeedError> {
        let url = format!("{}/fixtures?id={}", self.base_url, fixture_id);

        let resp = self.client
            .get(&url)
            .header("x-apisports-key", &self.api_key)
            .send()
            .await
            .map_err(|source| FeedError::Http { url: url.clone(), source })?;

        let status = resp.status();
        if !status.is_success() {
            warn!(%status, fixture_id, "API-Football fixture lookup rejected");
            return Err(FeedError::Status { url, status: status.as_u16() });
        }

        let raw = resp
            .text()
            .await
            .map_err(|source| FeedError::Body { url: url.clone(), source })?;
        Ok(parse_fixture_body(fixture_id, &raw))
    }
}

/// Malformed JSON is logged and treated as "no such fixture".
pub fn parse_fixture_body(fixture_id: u64, raw: &str) -> Option<MatchSnapshot> {
    match serde_json::from_str::<Value>(raw) {
        Ok(body) => parse_fixture(&body),
        Err(e) => {
            warn!(fixture_id, "API-Football returned malformed JSON: {e}");
            None
        }
    }
}

pub fn parse_fixture(body: &Value) -> Option<MatchSnapshot> {
    let fx = body.pointer("/response/0")?;

    let id = match fx.pointer("/fixture/id")? {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        _ => return None,
    };
    let text = |path: &str| fx.pointer(path).and_then(|v| v.as_str()).map(str::to_string);
    let num_id = |path: &str| fx.pointer(path).and_then(|v| v.as_u64()).map(|n| n.to_string());
    let goals = |path: &str| fx.pointer(path).and_then(|v| v.as_u64()).unwrap_or(0) as u32;

    let short = text("/fixture/status/short");
    let long = text("/fixture/status/long");

    Some(MatchSnapshot {
        id,
        league: text("/league/name").unwrap_or_default(),
        home_team: text("/teams/home/name").unwrap_or_else(|| UNKNOWN_TEAM.to_string()),
        away_team: text("/teams/away/name").unwrap_or_else(|| UNKNOWN_TEAM.to_string()),
        home_team_id: num_id("/teams/home/id"),
        away_team_id: num_id("/teams/away/id"),
        home_score: goals("/goals/home"),
        away_score: goals("/goals/away"),
        status: map_status(short.as_deref(), long.as_deref()),
        status_detail: long.unwrap_or_default(),
        kickoff: text("/fixture/date").as_deref().and_then(parse_kickoff),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MatchStatus;
    use serde_json::json;

    #[test]
    fn parses_finished_fixture() {
        let body = json!({
            "response": [{
                "fixture": {
                    "id": 1035037,
                    "date": "2024-05-19T15:00:00+00:00",
                    "status": { "short": "FT", "long": "Match Finished" }
                },
                "league": { "name": "Premier League" },
                "teams": {
                    "home": { "id": 40, "name": "Liverpool" },
                    "away": { "id": 39, "name": "Wolves" }
                },
                "goals": { "home": 2, "away": 0 }
            }]
        });

        let m = parse_fixture(&body).unwrap();
        assert_eq!(m.id, "1035037");
        assert_eq!(m.status, MatchStatus::Finished);
        assert_eq!((m.home_score, m.away_score), (2, 0));
        assert_eq!(m.home_team, "Liverpool");
        assert_eq!(m.home_team_id.as_deref(), Some("40"));
    }

    #[test]
    fn not_started_fixture_has_null_goals() {
        let body = json!({
            "response": [{
                "fixture": { "id": 7, "status": { "short": "NS", "long": "Not Started" } },
                "teams": { "home": { "name": "A" }, "away": {} },
                "goals": { "home": null, "away": null }
            }]
        });
        let m = parse_fixture(&body).unwrap();
        assert_eq!(m.status, MatchStatus::Scheduled);
        assert_eq!((m.home_score, m.away_score), (0, 0));
        assert_eq!(m.away_team, UNKNOWN_TEAM);
    }

    #[test]
    fn postponed_fixture_is_not_finished() {
        let body = json!({
            "response": [{
                "fixture": { "id": 8, "status": { "short": "PST", "long": "Match Postponed" } },
                "teams": { "home": { "name": "A" }, "away": { "name": "B" } },
                "goals": { "home": null, "away": null }
            }]
        });
        let m = parse_fixture(&body).unwrap();
        assert_eq!(m.status, MatchStatus::Scheduled);
        assert!(!m.is_finished());
    }

    #[test]
    fn malformed_body_is_no_fixture() {
        assert!(parse_fixture_body(7, "<html>rate limited</html>").is_none());
        assert!(parse_fixture_body(7, "").is_none());
        let ok = r#"{"response":[{"fixture":{"id":7,"status":{"short":"FT"}},"goals":{"home":1,"away":1}}]}"#;
        assert_eq!(parse_fixture_body(7, ok).map(|m| m.status), Some(MatchStatus::Finished));
    }

    #[test]
    fn empty_response_is_none() {
        assert!(parse_fixture(&json!({ "response": [] })).is_none());
        assert!(parse_fixture(&json!({})).is_none());
    }
}
