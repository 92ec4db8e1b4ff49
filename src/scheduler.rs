//! Adaptive Poll Scheduler + orchestrátor všech čtyř timerů.
//!
//! Live poll: ligy sekvenčně s náhodnou pauzou, detekce změn, notifikace.
//! Interval se zkracuje když něco běží live a prodlužuje když je klid.
//! Každý timer je vlastní tokio task, tick nikdy nepřekrývá sám sebe.

use live_monitor::{detect_snapshot, detect_timeline, MatchSnapshot, ScoreFeed, StateCache, TimelineEvent, Transition};
use logger::{now_iso, EventLogger, MatchTransitionEvent, PollHeartbeatEvent};
use push_notifier::{Dispatcher, NotificationPayload};
use rand::Rng;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::leaderboard::LeaderboardJob;
use crate::sweep::PredictionSweeper;

#[derive(Debug, Clone)]
pub struct PollerConfig {
    pub leagues:       Vec<String>,
    pub live_interval: Duration,
    pub idle_interval: Duration,
    pub jitter_min_ms: u64,
    pub jitter_max_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub healthy_leagues: usize,
    pub matches_seen:    usize,
    pub live_matches:    usize,
    pub transitions:     usize,
    pub interval_changed: bool,
}

/// Owns the state cache; nothing else mutates it.
pub struct LivePoller {
    feed:            Arc<dyn ScoreFeed>,
    dispatcher:      Arc<Dispatcher>,
    cache:           StateCache,
    config:          PollerConfig,
    current:         Duration,
    reset_requested: Arc<AtomicBool>,
    logger:          Option<EventLogger>,
}

impl LivePoller {
    pub fn new(
        feed: Arc<dyn ScoreFeed>,
        dispatcher: Arc<Dispatcher>,
        config: PollerConfig,
        logger: Option<EventLogger>,
    ) -> Self {
        let current = config.idle_interval;
        Self {
            feed,
            dispatcher,
            cache: StateCache::new(),
            config,
            current,
            reset_requested: Arc::new(AtomicBool::new(false)),
            logger,
        }
    }

    pub fn interval(&self) -> Duration {
        self.current
    }

    pub fn cache(&self) -> &StateCache {
        &self.cache
    }

    /// Flag set by the cache-reset timer; the poller honors it at the start of its next tick.
    pub fn reset_handle(&self) -> Arc<AtomicBool> {
        self.reset_requested.clone()
    }

    /// Returns true when the interval actually changed.
    pub fn apply_live_count(&mut self, live_matches: usize) -> bool {
        let wanted = if live_matches > 0 {
            self.config.live_interval
        } else {
            self.config.idle_interval
        };
        if wanted == self.current {
            return false;
        }
        info!(
            live_matches,
            from_secs = self.current.as_secs(),
            to_secs = wanted.as_secs(),
            "poll interval changed"
        );
        self.current = wanted;
        true
    }

    fn jitter(&self) -> Duration {
        if self.config.jitter_max_ms == 0 {
            return Duration::ZERO;
        }
        let ms = rand::thread_rng().gen_range(self.config.jitter_min_ms..=self.config.jitter_max_ms);
        Duration::from_millis(ms)
    }

    pub async fn tick(&mut self) -> TickReport {
        if self.reset_requested.swap(false, Ordering::SeqCst) {
            let dropped = self.cache.len();
            self.cache.reset();
            info!(dropped, resets = self.cache.resets(), "state cache reset");
        }

        let mut report = TickReport::default();
        let mut snapshots: Vec<MatchSnapshot> = Vec::new();

        let leagues = self.config.leagues.clone();
        for (i, league) in leagues.iter().enumerate() {
            if i > 0 {
                let pause = self.jitter();
                if !pause.is_zero() {
                    sleep(pause).await;
                }
            }
            match self.feed.fetch_league(league).await {
                Ok(list) => {
                    report.healthy_leagues += 1;
                    snapshots.extend(list);
                }
                Err(e) => warn!(league = %league, "league fetch failed, skipping: {e}"),
            }
        }
        report.matches_seen = snapshots.len();

        for snap in &snapshots {
            for transition in detect_snapshot(&mut self.cache, snap) {
                report.transitions += 1;
                let payload = match transition {
                    Transition::MatchStarted => {
                        info!(match_id = %snap.id, "▶ {} vs {} started", snap.home_team, snap.away_team);
                        self.log_transition("match_started", snap, None);
                        push_notifier::match_started(snap)
                    }
                    Transition::Goal { side } => {
                        info!(match_id = %snap.id, side = side.as_str(), "⚽ {}", snap.score_line());
                        self.log_transition("goal", snap, Some(side.as_str().to_string()));
                        push_notifier::goal(snap, side)
                    }
                };
                self.notify(&payload).await;
            }

            if !snap.is_live() {
                continue;
            }
            report.live_matches += 1;

            let events = match self.feed.fetch_timeline(snap).await {
                Ok(events) => events,
                Err(e) => {
                    warn!(match_id = %snap.id, "timeline fetch failed: {e}");
                    continue;
                }
            };
            for event in detect_timeline(&mut self.cache, snap, events) {
                report.transitions += 1;
                self.on_timeline_event(snap, &event).await;
            }
        }

        report.interval_changed = self.apply_live_count(report.live_matches);
        self.heartbeat(&report);
        report
    }

    async fn on_timeline_event(&self, snap: &MatchSnapshot, event: &TimelineEvent) {
        info!(match_id = %snap.id, kind = event.kind.as_str(), clock = %event.clock, "timeline event");
        self.log_transition(event.kind.as_str(), snap, Some(event.clock.clone()));
        if let Some(payload) = push_notifier::timeline_event(snap, event) {
            self.notify(&payload).await;
        }
    }

    async fn notify(&self, payload: &NotificationPayload) {
        let report = self.dispatcher.dispatch(payload).await;
        debug!(
            kind = payload.kind.as_str(),
            recipients = report.recipients,
            failed_batches = report.batches_failed,
            "notification dispatched"
        );
    }

    fn log_transition(&self, kind: &str, snap: &MatchSnapshot, detail: Option<String>) {
        let Some(logger) = &self.logger else { return };
        let ev = MatchTransitionEvent {
            ts: now_iso(),
            event: "MATCH_TRANSITION",
            kind: kind.to_string(),
            match_id: snap.id.clone(),
            home: snap.home_team.clone(),
            away: snap.away_team.clone(),
            home_score: snap.home_score,
            away_score: snap.away_score,
            detail,
        };
        if let Err(e) = logger.log(&ev) {
            warn!("event log write failed: {e}");
        }
    }

    fn heartbeat(&self, report: &TickReport) {
        info!(
            healthy = report.healthy_leagues,
            leagues = self.config.leagues.len(),
            matches = report.matches_seen,
            live = report.live_matches,
            transitions = report.transitions,
            next_secs = self.current.as_secs(),
            "poll tick"
        );
        let Some(logger) = &self.logger else { return };
        let ev = PollHeartbeatEvent {
            ts: now_iso(),
            event: "POLL_HEARTBEAT",
            healthy_leagues: report.healthy_leagues,
            total_leagues: self.config.leagues.len(),
            matches_seen: report.matches_seen,
            live_matches: report.live_matches,
            transitions: report.transitions,
            next_interval_secs: self.current.as_secs(),
        };
        if let Err(e) = logger.log(&ev) {
            warn!("event log write failed: {e}");
        }
    }
}

#[derive(Debug, Clone)]
pub struct Timers {
    pub sweep:             Duration,
    pub cache_reset:       Duration,
    pub leaderboard:       Duration,
    pub startup_delay_max: Duration,
}

/// Owns the four background loops. `stop` signals them and waits; an
/// in-flight tick finishes first.
pub struct Orchestrator {
    shutdown: watch::Sender<bool>,
    handles:  Vec<JoinHandle<()>>,
}

impl Orchestrator {
    pub fn start(mut poller: LivePoller, sweeper: PredictionSweeper, board: LeaderboardJob, timers: Timers) -> Self {
        let (shutdown, rx) = watch::channel(false);
        let startup = random_delay(timers.startup_delay_max);
        info!(delay_ms = startup.as_millis() as u64, "arming timers");

        let mut handles = Vec::with_capacity(4);
        let reset_flag = poller.reset_handle();

        // 1. live poll, adaptivní interval
        let mut stop = rx.clone();
        handles.push(tokio::spawn(async move {
            if wait_or_stop(startup, &mut stop).await {
                return;
            }
            let mut ticker = fresh_interval(poller.interval(), true);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let report = poller.tick().await;
                        if report.interval_changed {
                            ticker = fresh_interval(poller.interval(), false);
                        }
                    }
                    _ = stop.changed() => break,
                }
            }
            info!("live poller stopped");
        }));

        // 2. prediction sweep
        handles.push(spawn_periodic("prediction sweep", timers.sweep, startup, true, rx.clone(), move || {
            let sweeper = sweeper.clone();
            async move {
                sweeper.run_once(chrono::Utc::now()).await;
            }
        }));

        // 3. cache reset; první tick by resetoval prázdnou cache
        handles.push(spawn_periodic("cache reset", timers.cache_reset, startup, false, rx.clone(), move || {
            let flag = reset_flag.clone();
            async move {
                flag.store(true, Ordering::SeqCst);
            }
        }));

        // 4. leaderboard + period resets
        handles.push(spawn_periodic("leaderboard", timers.leaderboard, startup, true, rx, move || {
            let board = board.clone();
            async move {
                board.run_once(chrono::Utc::now()).await;
            }
        }));

        Self { shutdown, handles }
    }

    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        for h in self.handles {
            if let Err(e) = h.await {
                warn!("background task ended abnormally: {e}");
            }
        }
        info!("all timers stopped");
    }
}

fn random_delay(max: Duration) -> Duration {
    let max_ms = max.as_millis() as u64;
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
}

/// Ticks every `period`; first tick immediately when `fire_now`.
fn fresh_interval(period: Duration, fire_now: bool) -> Interval {
    let start = if fire_now { Instant::now() } else { Instant::now() + period };
    let mut ticker = interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

/// true = shutdown requested during the wait.
async fn wait_or_stop(delay: Duration, stop: &mut watch::Receiver<bool>) -> bool {
    if delay.is_zero() {
        return *stop.borrow();
    }
    tokio::select! {
        _ = sleep(delay) => false,
        _ = stop.changed() => true,
    }
}

fn spawn_periodic<F, Fut>(
    name: &'static str,
    period: Duration,
    startup: Duration,
    fire_now: bool,
    mut stop: watch::Receiver<bool>,
    mut job: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        if wait_or_stop(startup, &mut stop).await {
            return;
        }
        let mut ticker = fresh_interval(period, fire_now);
        loop {
            tokio::select! {
                _ = ticker.tick() => job().await,
                _ = stop.changed() => break,
            }
        }
        debug!(task = name, "timer stopped");
    })
}
