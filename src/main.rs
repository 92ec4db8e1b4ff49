/// KickoffLive — live pipeline
///
/// Co dělá:
///   1. Polluje ESPN scoreboardy nakonfigurovaných lig (adaptivní interval)
///   2. Detekuje výkop, góly, karty, VAR, střídání → push notifikace (Expo)
///   3. Každých pár minut vyhodnotí pending tipy proti dohraným zápasům
///   4. Jednou za hodinu přepočítá žebříček (+ týdenní/měsíční reset)
///
/// Spuštění:
///   cargo run --bin live-pipeline

use anyhow::{Context, Result};
use kickoff_live::config::PipelineConfig;
use kickoff_live::leaderboard::LeaderboardJob;
use kickoff_live::scheduler::{LivePoller, Orchestrator, PollerConfig, Timers};
use kickoff_live::store::SqliteStore;
use kickoff_live::sweep::{PredictionSweeper, SweepConfig};
use live_monitor::{ApiFootballClient, EspnFeed, ScoreFeed, API_FOOTBALL_BASE, ESPN_SOCCER_BASE};
use logger::EventLogger;
use match_correlator::{CorrelatorConfig, FinishedMatchSource, FixtureProvider, MatchCorrelator};
use prediction_engine::PredictionStore;
use push_notifier::{Dispatcher, ExpoPushSink, PushSink, RecipientDirectory};
use std::env;
use std::fs::File;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cfg = PipelineConfig::from_env();

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .init();

    info!("=== KickoffLive pipeline ===");
    info!("Leagues: {}", cfg.leagues.join(", "));
    info!(
        "Poll: live {}s / idle {}s, sweep {}s, cache reset {}s, leaderboard {}s",
        cfg.live_interval.as_secs(),
        cfg.idle_interval.as_secs(),
        cfg.sweep_interval.as_secs(),
        cfg.cache_reset.as_secs(),
        cfg.leaderboard.as_secs()
    );
    info!("Logs: ./{}/  DB: {}", cfg.log_dir, cfg.db_path);

    // Single instance lock
    let lock_file_path = env::temp_dir().join("kickofflive_pipeline.lock");
    let lock_file = match File::create(&lock_file_path) {
        Ok(f) => f,
        Err(e) => {
            warn!("Failed to create lock file at {:?}: {}", lock_file_path, e);
            return Ok(());
        }
    };

    let mut lock = fd_lock::RwLock::new(lock_file);
    let _write_guard = match lock.try_write() {
        Ok(guard) => {
            info!("Acquired single-instance lock.");
            guard
        }
        Err(_) => {
            warn!("Another instance of live-pipeline is already running! Exiting.");
            return Ok(());
        }
    };

    let logger = EventLogger::new(&cfg.log_dir);
    let store = Arc::new(SqliteStore::open(&cfg.db_path).context("open prediction store")?);

    let espn = Arc::new(EspnFeed::new(ESPN_SOCCER_BASE, Some(logger.clone())));
    let fixtures: Option<Arc<dyn FixtureProvider>> = match &cfg.api_football_key {
        Some(key) => Some(Arc::new(ApiFootballClient::new(API_FOOTBALL_BASE, key.clone()))),
        None => {
            info!("API_FOOTBALL_KEY not set — numeric fixture lookup disabled, name matching only");
            None
        }
    };

    let sink: Arc<dyn PushSink> = Arc::new(ExpoPushSink::new(cfg.push_endpoint.clone()));
    let directory: Arc<dyn RecipientDirectory> = store.clone();
    let dispatcher = Arc::new(Dispatcher::new(sink, directory, cfg.push_batch_size, Some(logger.clone())));

    let feed: Arc<dyn ScoreFeed> = espn.clone();
    let poller = LivePoller::new(
        feed,
        dispatcher.clone(),
        PollerConfig {
            leagues: cfg.leagues.clone(),
            live_interval: cfg.live_interval,
            idle_interval: cfg.idle_interval,
            jitter_min_ms: cfg.jitter_min_ms,
            jitter_max_ms: cfg.jitter_max_ms,
        },
        Some(logger.clone()),
    );

    let finished_source: Arc<dyn FinishedMatchSource> = espn;
    let correlator = Arc::new(MatchCorrelator::new(
        fixtures,
        finished_source,
        CorrelatorConfig {
            leagues: cfg.leagues.clone(),
            league_delay: cfg.league_scan_delay,
            policy: cfg.match_policy.clone(),
        },
    ));

    let predictions: Arc<dyn PredictionStore> = store;
    let sweeper = PredictionSweeper::new(
        predictions.clone(),
        correlator,
        dispatcher,
        cfg.scoring.clone(),
        SweepConfig {
            batch_limit: cfg.sweep_batch_limit,
            min_age: cfg.sweep_min_age,
            item_delay: cfg.sweep_item_delay,
        },
        Some(logger.clone()),
    );
    let board = LeaderboardJob::new(predictions, Some(logger));

    let orchestrator = Orchestrator::start(
        poller,
        sweeper,
        board,
        Timers {
            sweep: cfg.sweep_interval,
            cache_reset: cfg.cache_reset,
            leaderboard: cfg.leaderboard,
            startup_delay_max: cfg.startup_delay_max,
        },
    );
    info!("🚀 READY: timers armed, Ctrl+C to stop.");

    tokio::signal::ctrl_c().await.context("wait for ctrl_c")?;
    info!("Shutdown requested…");
    orchestrator.stop().await;

    Ok(())
}
