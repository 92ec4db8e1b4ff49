//! Runtime configuration z env (+ volitelný `.env`).

use match_correlator::MatchPolicy;
use prediction_engine::ScoringRules;
use std::time::Duration;

pub const DEFAULT_LEAGUES: &str = "eng.1,esp.1,ita.1,ger.1,fra.1,bra.1,uefa.champions";

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub leagues:            Vec<String>,
    pub live_interval:      Duration,
    pub idle_interval:      Duration,
    pub sweep_interval:     Duration,
    pub cache_reset:        Duration,
    pub leaderboard:        Duration,
    pub jitter_min_ms:      u64,
    pub jitter_max_ms:      u64,
    pub startup_delay_max:  Duration,
    pub sweep_batch_limit:  usize,
    pub sweep_min_age:      chrono::Duration,
    pub sweep_item_delay:   Duration,
    pub league_scan_delay:  Duration,
    pub match_policy:       MatchPolicy,
    pub scoring:            ScoringRules,
    pub push_batch_size:    usize,
    pub push_endpoint:      String,
    pub api_football_key:   Option<String>,
    pub db_path:            String,
    pub log_dir:            String,
}

impl PipelineConfig {
    /// Missing or unparsable values fall back to defaults.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        let leagues = parse_list(&std::env::var("LEAGUES").unwrap_or_else(|_| DEFAULT_LEAGUES.to_string()));

        let jitter_min_ms = parse_env("JITTER_MIN_MS", 400u64);
        let jitter_max_ms = parse_env("JITTER_MAX_MS", 1500u64).max(jitter_min_ms);

        let scoring = ScoringRules {
            exact: parse_env("POINTS_EXACT", 5),
            goal_difference: parse_env("POINTS_GOAL_DIFF", 3),
            result: parse_env("POINTS_RESULT", 1),
            streak_bonus: parse_env("STREAK_BONUS", 2),
            streak_threshold: parse_env("STREAK_THRESHOLD", 3),
        };

        let match_policy = MatchPolicy {
            similarity_threshold: parse_env("NAME_SIMILARITY_THRESHOLD", 0.8),
            ..MatchPolicy::default()
        };

        Self {
            leagues,
            live_interval: secs("LIVE_POLL_SECS", 30),
            idle_interval: secs("IDLE_POLL_SECS", 300),
            sweep_interval: secs("SWEEP_INTERVAL_SECS", 600),
            cache_reset: secs("CACHE_RESET_SECS", 6 * 3600),
            leaderboard: secs("LEADERBOARD_SECS", 3600),
            jitter_min_ms,
            jitter_max_ms,
            startup_delay_max: secs("STARTUP_DELAY_MAX_SECS", 10),
            sweep_batch_limit: parse_env("SWEEP_BATCH_LIMIT", 25),
            sweep_min_age: chrono::Duration::hours(parse_env("SWEEP_MIN_AGE_HOURS", 3)),
            sweep_item_delay: Duration::from_millis(parse_env("SWEEP_ITEM_DELAY_MS", 1000)),
            league_scan_delay: Duration::from_millis(parse_env("CORRELATOR_LEAGUE_DELAY_MS", 500)),
            match_policy,
            scoring,
            push_batch_size: parse_env("PUSH_BATCH_SIZE", 100),
            push_endpoint: std::env::var("PUSH_ENDPOINT")
                .unwrap_or_else(|_| push_notifier::EXPO_PUSH_ENDPOINT.to_string()),
            api_football_key: std::env::var("API_FOOTBALL_KEY").ok().filter(|k| !k.trim().is_empty()),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "data/kickoff.db".to_string()),
            log_dir: std::env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// Zero is not a valid interval; it falls back to the default too.
fn secs(key: &str, default: u64) -> Duration {
    let v = parse_env(key, default);
    Duration::from_secs(if v == 0 { default } else { v })
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
