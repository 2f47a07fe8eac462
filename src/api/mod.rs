//! Upstream football data provider client.
//!
//! The core depends only on the [`FootballApi`] trait; the production
//! implementation wraps the provider's REST API with rate limiting, a
//! per-endpoint response cache and circuit breakers. Tests substitute
//! counting stubs.

mod breaker;
mod cache;
mod http;

pub use breaker::{CircuitBreaker, CircuitState};
pub use cache::ApiCache;
pub use http::HttpFootballApi;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ApiResult;

/// Typed calls against the football data provider.
///
/// Each call returns the unwrapped `response` payload or a typed error.
/// All error variants are treated uniformly by the collector: they produce an
/// absent bundle section, not an exception.
#[async_trait]
pub trait FootballApi: Send + Sync {
    /// Fixture lookup by id. Returns the `response` array (normally one entry).
    async fn get_fixture(&self, fixture_id: i64) -> ApiResult<Vec<Value>>;

    /// Provider predictions for a fixture.
    async fn get_predictions(&self, fixture_id: i64) -> ApiResult<Vec<Value>>;

    /// Prior direct meetings of the two teams, most recent first.
    async fn get_head_to_head(
        &self,
        team_a: i64,
        team_b: i64,
        last: u32,
        status: Option<&str>,
    ) -> ApiResult<Vec<Value>>;

    async fn get_fixture_statistics(&self, fixture_id: i64) -> ApiResult<Vec<Value>>;
    async fn get_fixture_players(&self, fixture_id: i64) -> ApiResult<Vec<Value>>;
    async fn get_fixture_events(&self, fixture_id: i64) -> ApiResult<Vec<Value>>;
    async fn get_fixture_lineups(&self, fixture_id: i64) -> ApiResult<Vec<Value>>;

    async fn get_standings(&self, season: i32, league_id: i64) -> ApiResult<Vec<Value>>;

    /// Season statistics for one team in one league. Returns an object.
    async fn get_team_statistics(
        &self,
        team_id: i64,
        season: i32,
        league_id: i64,
    ) -> ApiResult<Value>;

    async fn get_injuries(&self, team_id: i64, league_id: i64, season: i32)
        -> ApiResult<Vec<Value>>;
    async fn get_sidelined(&self, team_id: i64) -> ApiResult<Vec<Value>>;

    async fn get_top_scorers(&self, league_id: i64, season: i32) -> ApiResult<Vec<Value>>;
    async fn get_top_assists(&self, league_id: i64, season: i32) -> ApiResult<Vec<Value>>;
    async fn get_top_yellow_cards(&self, league_id: i64, season: i32) -> ApiResult<Vec<Value>>;
    async fn get_top_red_cards(&self, league_id: i64, season: i32) -> ApiResult<Vec<Value>>;
}
