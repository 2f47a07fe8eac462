//! Data Collector: turns a fixture id into a raw bundle.
//!
//! The fixture lookup is the only mandatory call. Everything else runs
//! concurrently under one semaphore, and every call is wrapped so a failure
//! becomes an absent section, counted but never fatal.
//!
//! Call plan per fixture (~25 calls):
//! 1. fixture (mandatory)
//! 2. predictions + h2h history (2)
//! 3. statistics/players/events/lineups for up to 3 H2H fixtures (up to 12)
//! 4. standings, team stats x2, injuries x2, sidelined x2, four leader
//!    boards (11) - launched together with step 3.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::api::FootballApi;
use crate::bundle::{H2hDetail, RawBundle};
use crate::error::ApiError;
use crate::jsonutil;

/// H2H fixtures whose details are fetched.
const H2H_DETAIL_LIMIT: usize = 3;
/// Prior meetings requested from the provider.
const H2H_HISTORY_LIMIT: u32 = 5;

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("fixture {0} not found upstream")]
    FixtureNotFound(i64),

    #[error("collection exceeded the {0:?} budget")]
    Timeout(Duration),

    #[error("upstream provider unavailable: {0}")]
    UpstreamUnavailable(String),
}

pub struct DataCollector {
    api: Arc<dyn FootballApi>,
    max_parallel: usize,
    /// Rate-limit hygiene: small pause before every call.
    precall_delay: Duration,
    /// Wall-clock budget for one full collection.
    budget: Duration,
}

impl DataCollector {
    pub fn new(api: Arc<dyn FootballApi>, max_parallel: usize) -> Self {
        Self {
            api,
            max_parallel: max_parallel.max(1),
            precall_delay: Duration::from_millis(100),
            budget: Duration::from_secs(180),
        }
    }

    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    pub fn with_precall_delay(mut self, delay: Duration) -> Self {
        self.precall_delay = delay;
        self
    }

    /// Collect all data for one fixture.
    pub async fn collect_match_data(&self, fixture_id: i64) -> Result<RawBundle, CollectError> {
        let counter = AtomicU32::new(0);
        let semaphore = Semaphore::new(self.max_parallel);

        match timeout(self.budget, self.collect_inner(fixture_id, &counter, &semaphore)).await {
            Ok(result) => result,
            Err(_) => Err(CollectError::Timeout(self.budget)),
        }
    }

    async fn collect_inner(
        &self,
        fixture_id: i64,
        counter: &AtomicU32,
        semaphore: &Semaphore,
    ) -> Result<RawBundle, CollectError> {
        info!(fixture_id, "starting data collection");

        // Step 1: the mandatory fixture lookup.
        let fixture = self.fetch_fixture(fixture_id, counter, semaphore).await?;

        let home_id = jsonutil::get_i64(&fixture, &["teams", "home", "id"])
            .ok_or(CollectError::FixtureNotFound(fixture_id))?;
        let away_id = jsonutil::get_i64(&fixture, &["teams", "away", "id"])
            .ok_or(CollectError::FixtureNotFound(fixture_id))?;
        let league_id = jsonutil::get_i64(&fixture, &["league", "id"])
            .ok_or(CollectError::FixtureNotFound(fixture_id))?;
        let season = jsonutil::get_i64(&fixture, &["league", "season"])
            .ok_or(CollectError::FixtureNotFound(fixture_id))? as i32;

        info!(
            fixture_id,
            home = jsonutil::get_str(&fixture, &["teams", "home", "name"]).unwrap_or("?"),
            away = jsonutil::get_str(&fixture, &["teams", "away", "name"]).unwrap_or("?"),
            "fixture resolved"
        );

        // Step 2: predictions and head-to-head history.
        let (predictions, h2h_history) = tokio::join!(
            self.safe_call(counter, semaphore, "predictions", async {
                self.api
                    .get_predictions(fixture_id)
                    .await
                    .map(|list| list.into_iter().next())
            }),
            self.safe_call(counter, semaphore, "h2h_history", async {
                self.api
                    .get_head_to_head(home_id, away_id, H2H_HISTORY_LIMIT, Some("FT"))
                    .await
            }),
        );

        let predictions = predictions.flatten().filter(|v| !v.is_null());
        let h2h_history = h2h_history.unwrap_or_default();

        // Steps 3 + 4: H2H details and the complementary group, launched
        // together under the same semaphore.
        let detail_targets: Vec<&Value> = h2h_history.iter().take(H2H_DETAIL_LIMIT).collect();

        let (
            h2h_details,
            standings,
            team1_stats,
            team2_stats,
            injuries_t1,
            injuries_t2,
            sidelined_t1,
            sidelined_t2,
            top_scorers,
            top_assists,
            top_yellow,
            top_red,
        ) = tokio::join!(
            self.collect_h2h_details(&detail_targets, counter, semaphore),
            self.safe_call(counter, semaphore, "standings", async {
                self.api.get_standings(season, league_id).await
            }),
            self.safe_call(counter, semaphore, "team1_stats", async {
                self.api.get_team_statistics(home_id, season, league_id).await
            }),
            self.safe_call(counter, semaphore, "team2_stats", async {
                self.api.get_team_statistics(away_id, season, league_id).await
            }),
            self.safe_call(counter, semaphore, "injuries_t1", async {
                self.api.get_injuries(home_id, league_id, season).await
            }),
            self.safe_call(counter, semaphore, "injuries_t2", async {
                self.api.get_injuries(away_id, league_id, season).await
            }),
            self.safe_call(counter, semaphore, "sidelined_t1", async {
                self.api.get_sidelined(home_id).await
            }),
            self.safe_call(counter, semaphore, "sidelined_t2", async {
                self.api.get_sidelined(away_id).await
            }),
            self.safe_call(counter, semaphore, "top_scorers", async {
                self.api.get_top_scorers(league_id, season).await
            }),
            self.safe_call(counter, semaphore, "top_assists", async {
                self.api.get_top_assists(league_id, season).await
            }),
            self.safe_call(counter, semaphore, "top_yellow", async {
                self.api.get_top_yellow_cards(league_id, season).await
            }),
            self.safe_call(counter, semaphore, "top_red", async {
                self.api.get_top_red_cards(league_id, season).await
            }),
        );

        // Merge the per-team lists.
        let mut injuries = injuries_t1.unwrap_or_default();
        injuries.extend(injuries_t2.unwrap_or_default());

        let mut sidelined = sidelined_t1.unwrap_or_default();
        sidelined.extend(sidelined_t2.unwrap_or_default());

        let api_calls_count = counter.load(Ordering::Relaxed);
        info!(fixture_id, api_calls_count, "data collection complete");

        let mut bundle = RawBundle::new(fixture);
        bundle.predictions = predictions;
        bundle.h2h_history = h2h_history;
        bundle.h2h_details = h2h_details;
        bundle.standings = standings.map(Value::Array).filter(|v| {
            v.as_array().map(|a| !a.is_empty()).unwrap_or(false)
        });
        bundle.team1_stats = team1_stats.filter(|v| !v.is_null());
        bundle.team2_stats = team2_stats.filter(|v| !v.is_null());
        bundle.injuries = injuries;
        bundle.sidelined = sidelined;
        bundle.top_scorers = top_scorers.unwrap_or_default();
        bundle.top_assists = top_assists.unwrap_or_default();
        bundle.top_yellow = top_yellow.unwrap_or_default();
        bundle.top_red = top_red.unwrap_or_default();
        bundle.api_calls_count = api_calls_count;

        Ok(bundle)
    }

    /// Step 1 is the only call whose failure aborts the collection.
    async fn fetch_fixture(
        &self,
        fixture_id: i64,
        counter: &AtomicU32,
        semaphore: &Semaphore,
    ) -> Result<Value, CollectError> {
        let _permit = semaphore.acquire().await.expect("semaphore never closed");
        if !self.precall_delay.is_zero() {
            tokio::time::sleep(self.precall_delay).await;
        }
        counter.fetch_add(1, Ordering::Relaxed);

        match self.api.get_fixture(fixture_id).await {
            Ok(list) => list
                .into_iter()
                .next()
                .filter(|v| !v.is_null())
                .ok_or(CollectError::FixtureNotFound(fixture_id)),
            Err(ApiError::CircuitOpen { endpoint, .. }) => {
                Err(CollectError::UpstreamUnavailable(endpoint))
            }
            Err(e) => {
                warn!(fixture_id, error = %e, "fixture lookup failed");
                Err(CollectError::FixtureNotFound(fixture_id))
            }
        }
    }

    /// Statistics, player statistics, events and lineups for each recent H2H
    /// fixture (4 calls per fixture).
    async fn collect_h2h_details(
        &self,
        h2h_matches: &[&Value],
        counter: &AtomicU32,
        semaphore: &Semaphore,
    ) -> Vec<H2hDetail> {
        if h2h_matches.is_empty() {
            return Vec::new();
        }

        debug!(count = h2h_matches.len(), "collecting h2h details");

        let futures = h2h_matches.iter().filter_map(|h2h_match| {
            let detail_fixture_id = jsonutil::get_i64(h2h_match, &["fixture", "id"])?;
            Some(async move {
                let (statistics, players, events, lineups) = tokio::join!(
                    self.safe_call(counter, semaphore, "h2h_statistics", async {
                        self.api.get_fixture_statistics(detail_fixture_id).await
                    }),
                    self.safe_call(counter, semaphore, "h2h_players", async {
                        self.api.get_fixture_players(detail_fixture_id).await
                    }),
                    self.safe_call(counter, semaphore, "h2h_events", async {
                        self.api.get_fixture_events(detail_fixture_id).await
                    }),
                    self.safe_call(counter, semaphore, "h2h_lineups", async {
                        self.api.get_fixture_lineups(detail_fixture_id).await
                    }),
                );

                H2hDetail {
                    fixture_id: detail_fixture_id,
                    statistics: statistics.map(Value::Array),
                    players: players.map(Value::Array),
                    events: events.map(Value::Array),
                    lineups: lineups.map(Value::Array),
                }
            })
        });

        join_all(futures).await
    }

    /// Wrapper giving every non-mandatory call its failure isolation: acquire
    /// a permit, pause for rate-limit hygiene, count the attempt, and turn
    /// any error into `None`.
    async fn safe_call<T, F>(
        &self,
        counter: &AtomicU32,
        semaphore: &Semaphore,
        name: &str,
        fut: F,
    ) -> Option<T>
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        let _permit = semaphore.acquire().await.expect("semaphore never closed");
        if !self.precall_delay.is_zero() {
            tokio::time::sleep(self.precall_delay).await;
        }
        counter.fetch_add(1, Ordering::Relaxed);

        match fut.await {
            Ok(value) => {
                debug!(call = name, "provider call ok");
                Some(value)
            }
            Err(e) => {
                warn!(call = name, error = %e, "provider call failed, section absent");
                None
            }
        }
    }
}
