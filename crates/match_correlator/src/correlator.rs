//! Match Correlator — predikce byla uložena proti jinému provideru (jiné id,
//! jiné názvy týmů), výsledek hledáme v našem live feedu.
//!
//! Order: numeric id → direct fixture lookup; otherwise (or on miss) scan each
//! configured league's finished list for the kickoff day and fuzzy-match names.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Timelike, Utc};
use live_monitor::{ApiFootballClient, EspnFeed, FeedError, MatchSnapshot};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::names::MatchPolicy;

#[async_trait]
pub trait FixtureProvider: Send + Sync {
    async fn fixture_by_id(&self, fixture_id: u64) -> Result<Option<MatchSnapshot>, FeedError>;
}

#[async_trait]
pub trait FinishedMatchSource: Send + Sync {
    /// Finished matches of one league on one calendar day.
    async fn finished_matches(&self, league: &str, day: NaiveDate) -> Result<Vec<MatchSnapshot>, FeedError>;
}

#[async_trait]
impl FixtureProvider for ApiFootballClient {
    async fn fixture_by_id(&self, fixture_id: u64) -> Result<Option<MatchSnapshot>, FeedError> {
        self.fetch_fixture(fixture_id).await
    }
}

#[async_trait]
impl FinishedMatchSource for EspnFeed {
    async fn finished_matches(&self, league: &str, day: NaiveDate) -> Result<Vec<MatchSnapshot>, FeedError> {
        let all = self.fetch_league_day(league, day).await?;
        Ok(all.into_iter().filter(|m| m.is_finished()).collect())
    }
}

/// What the prediction captured at submission time.
#[derive(Debug, Clone)]
pub struct MatchQuery {
    pub match_id:  String,
    pub home_team: String,
    pub away_team: String,
    pub kickoff:   DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct CorrelatorConfig {
    pub leagues:      Vec<String>,
    pub league_delay: Duration,
    pub policy:       MatchPolicy,
}

pub struct MatchCorrelator {
    fixtures: Option<Arc<dyn FixtureProvider>>,
    source:   Arc<dyn FinishedMatchSource>,
    config:   CorrelatorConfig,
}

impl MatchCorrelator {
    pub fn new(
        fixtures: Option<Arc<dyn FixtureProvider>>,
        source: Arc<dyn FinishedMatchSource>,
        config: CorrelatorConfig,
    ) -> Self {
        Self { fixtures, source, config }
    }

    pub fn policy(&self) -> &MatchPolicy {
        &self.config.policy
    }

    /// Finished snapshot for the query, or `None` (prediction stays pending).
    pub async fn resolve(&self, query: &MatchQuery) -> Option<MatchSnapshot> {
        if let Some(found) = self.lookup_numeric(query).await {
            return Some(found);
        }

        let days = scan_days(query.kickoff);
        for (i, league) in self.config.leagues.iter().enumerate() {
            if i > 0 && !self.config.league_delay.is_zero() {
                sleep(self.config.league_delay).await;
            }

            for day in &days {
                let finished = match self.source.finished_matches(league, *day).await {
                    Ok(list) => list,
                    Err(e) => {
                        warn!(league = %league, %day, "finished-match scan failed: {e}");
                        continue;
                    }
                };

                if let Some(hit) = self.pick(query, finished) {
                    info!(
                        prediction_match = %query.match_id,
                        resolved = %hit.id,
                        league = %league,
                        "correlated {} vs {} → {}",
                        query.home_team, query.away_team, hit.score_line()
                    );
                    return Some(hit);
                }
            }
        }

        debug!(match_id = %query.match_id, "no finished match found in any league");
        None
    }

    async fn lookup_numeric(&self, query: &MatchQuery) -> Option<MatchSnapshot> {
        let fixtures = self.fixtures.as_ref()?;
        let id: u64 = query.match_id.parse().ok()?;

        match fixtures.fixture_by_id(id).await {
            Ok(Some(snap)) if snap.is_finished() => Some(snap),
            Ok(Some(snap)) => {
                debug!(fixture_id = id, status = snap.status.as_str(), "fixture found but not finished");
                None
            }
            Ok(None) => None,
            Err(e) => {
                warn!(fixture_id = id, "fixture lookup failed: {e}");
                None
            }
        }
    }

    fn pick(&self, query: &MatchQuery, finished: Vec<MatchSnapshot>) -> Option<MatchSnapshot> {
        let policy = &self.config.policy;
        let mut fuzzy = None;
        for m in finished {
            if !m.is_finished() {
                continue;
            }
            if m.id == query.match_id {
                return Some(m);
            }
            if fuzzy.is_none() && policy.same_fixture(&query.home_team, &query.away_team, &m.home_team, &m.away_team) {
                fuzzy = Some(m);
            }
        }
        fuzzy
    }
}

/// Kickoff day; plus the previous day for early-UTC kickoffs, since the
/// scoreboard groups by US Eastern date.
fn scan_days(kickoff: DateTime<Utc>) -> Vec<NaiveDate> {
    let day = kickoff.date_naive();
    if kickoff.hour() < 6 {
        vec![day, (kickoff - ChronoDuration::days(1)).date_naive()]
    } else {
        vec![day]
    }
}
