/// KickoffLive — Logger
/// JSONL event stream (one file per UTC day)

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct EventLogger {
    log_dir: PathBuf,
}

impl EventLogger {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        let dir = log_dir.into();
        fs::create_dir_all(&dir).ok();
        Self { log_dir: dir }
    }

    pub fn log<T: Serialize>(&self, event: &T) -> Result<()> {
        let date  = Utc::now().format("%Y-%m-%d").to_string();
        let path  = self.log_dir.join(format!("{date}.jsonl"));
        let line  = serde_json::to_string(event)?;
        let mut f = OpenOptions::new().create(true).append(true).open(&path)?;
        writeln!(f, "{line}")?;
        Ok(())
    }
}

pub fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

// ── Event typy ────────────────────────────────────────────────────────────────

#[derive(Serialize, Debug)]
pub struct ApiStatusEvent {
    pub ts:            String,
    pub event:         &'static str,   // "API_STATUS"
    pub source:        String,         // "espn" | "api-football"
    pub scope:         String,         // league slug or match id
    pub ok:            bool,
    pub status_code:   Option<u16>,
    pub message:       String,
    pub items_logged:  usize,
}

#[derive(Serialize, Debug)]
pub struct PollHeartbeatEvent {
    pub ts:               String,
    pub event:            &'static str,   // "POLL_HEARTBEAT"
    pub healthy_leagues:  usize,
    pub total_leagues:    usize,
    pub matches_seen:     usize,
    pub live_matches:     usize,
    pub transitions:      usize,
    pub next_interval_secs: u64,
}

#[derive(Serialize, Debug)]
pub struct MatchTransitionEvent {
    pub ts:          String,
    pub event:       &'static str,   // "MATCH_TRANSITION"
    pub kind:        String,         // "match_started" | "goal" | "yellow_card" | ...
    pub match_id:    String,
    pub home:        String,
    pub away:        String,
    pub home_score:  u32,
    pub away_score:  u32,
    pub detail:      Option<String>,
}

#[derive(Serialize, Debug)]
pub struct PredictionSweepEvent {
    pub ts:         String,
    pub event:      &'static str,   // "PREDICTION_SWEEP"
    pub attempted:  usize,
    pub resolved:   usize,
    pub not_found:  usize,
    pub failed:     usize,
}

#[derive(Serialize, Debug)]
pub struct NotificationDispatchEvent {
    pub ts:              String,
    pub event:           &'static str,   // "NOTIFICATION_DISPATCH"
    pub kind:            String,
    pub recipients:      usize,
    pub invalid_dropped: usize,
    pub batches_ok:      usize,
    pub batches_failed:  usize,
}

#[derive(Serialize, Debug)]
pub struct LeaderboardEvent {
    pub ts:            String,
    pub event:         &'static str,   // "LEADERBOARD_RECOMPUTE"
    pub ranked_total:  usize,
    pub ranked_weekly: usize,
    pub weekly_reset:  bool,
    pub monthly_reset: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_one_json_line_per_event() {
        let dir = std::env::temp_dir().join(format!("kickoff-logger-{}", std::process::id()));
        let logger = EventLogger::new(&dir);

        for scope in ["eng.1", "esp.1"] {
            logger.log(&ApiStatusEvent {
                ts: now_iso(),
                event: "API_STATUS",
                source: "espn".to_string(),
                scope: scope.to_string(),
                ok: true,
                status_code: Some(200),
                message: "ok".to_string(),
                items_logged: 3,
            }).unwrap();
        }

        let date = Utc::now().format("%Y-%m-%d").to_string();
        let raw = fs::read_to_string(dir.join(format!("{date}.jsonl"))).unwrap();
        let lines: Vec<serde_json::Value> = raw
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert!(lines.len() >= 2);
        assert_eq!(lines[lines.len() - 1]["scope"], "esp.1");
        assert_eq!(lines[lines.len() - 1]["event"], "API_STATUS");

        fs::remove_dir_all(&dir).ok();
    }
}
