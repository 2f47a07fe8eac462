//! Production provider client: REST calls with rate limiting, per-endpoint
//! response caching and circuit breakers.

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::time::Duration;

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use serde_json::Value;
use tracing::{debug, warn};

use crate::api::{ApiCache, CircuitBreaker, FootballApi};
use crate::error::{ApiError, ApiResult};

type DirectRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

const MAX_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Endpoint families sharing one circuit breaker each.
const BREAKER_FAMILIES: [&str; 6] = [
    "fixtures",
    "predictions",
    "standings",
    "teams",
    "players",
    "injuries",
];

pub struct HttpFootballApi {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    rate_limiter: DirectRateLimiter,
    cache: ApiCache,
    breakers: HashMap<&'static str, CircuitBreaker>,
}

impl HttpFootballApi {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        requests_per_minute: u32,
        cache: ApiCache,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(5)
            .build()?;

        let quota = Quota::per_minute(
            NonZeroU32::new(requests_per_minute.max(1)).expect("clamped to >= 1"),
        );

        let breakers = BREAKER_FAMILIES
            .iter()
            .map(|family| (*family, CircuitBreaker::new(*family)))
            .collect();

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            rate_limiter: RateLimiter::direct(quota),
            cache,
            breakers,
        })
    }

    fn breaker_for(&self, path: &str) -> &CircuitBreaker {
        let family = if path.starts_with("/predictions") {
            "predictions"
        } else if path.starts_with("/standings") {
            "standings"
        } else if path.starts_with("/teams") {
            "teams"
        } else if path.starts_with("/players") || path.starts_with("/sidelined") {
            "players"
        } else if path.starts_with("/injuries") {
            "injuries"
        } else {
            "fixtures"
        };
        &self.breakers[family]
    }

    /// One provider request: cache, breaker, quota, retries, envelope unwrap.
    async fn request(&self, path: &str, query: &[(&str, String)]) -> ApiResult<Value> {
        let cache_key = Self::cache_key(path, query);

        if let Some(cached) = self.cache.get(&cache_key).await {
            return Ok(cached);
        }

        let breaker = self.breaker_for(path);
        if let Err(retry_in_secs) = breaker.check() {
            return Err(ApiError::CircuitOpen {
                endpoint: path.to_string(),
                retry_in_secs,
            });
        }

        let mut attempt = 0;
        let result = loop {
            attempt += 1;
            self.rate_limiter.until_ready().await;

            match self.send_once(path, query).await {
                Ok(value) => break Ok(value),
                Err(e @ ApiError::Transient(_)) if attempt < MAX_ATTEMPTS => {
                    warn!(path = %path, attempt, error = %e, "transient upstream error, retrying");
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                }
                Err(e) => break Err(e),
            }
        };

        match &result {
            Ok(value) => {
                breaker.on_success();
                self.cache
                    .set(&cache_key, value, ApiCache::ttl_for(path))
                    .await;
            }
            Err(_) => breaker.on_failure(),
        }

        result
    }

    async fn send_once(&self, path: &str, query: &[(&str, String)]) -> ApiResult<Value> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .get(&url)
            .header("x-apisports-key", &self.api_key)
            .query(query)
            .send()
            .await
            .map_err(|e| ApiError::Transient(format!("request failed: {e}")))?;

        let status = response.status();

        if status.as_u16() == 429 {
            return Err(ApiError::Transient("rate limit exceeded".to_string()));
        }
        if status.is_server_error() {
            return Err(ApiError::Transient(format!("server error {status}")));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ApiError::Permanent {
                status: status.as_u16(),
                message,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ApiError::Transient(format!("invalid response body: {e}")))?;

        debug!(path = %path, "provider call succeeded");

        // Provider responses are wrapped in {response: ...}.
        Ok(body.get("response").cloned().unwrap_or(Value::Null))
    }

    fn cache_key(path: &str, query: &[(&str, String)]) -> String {
        let mut key = path.to_string();
        for (i, (k, v)) in query.iter().enumerate() {
            key.push(if i == 0 { '?' } else { '&' });
            key.push_str(k);
            key.push('=');
            key.push_str(v);
        }
        key
    }

    async fn request_list(&self, path: &str, query: &[(&str, String)]) -> ApiResult<Vec<Value>> {
        Ok(match self.request(path, query).await? {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            other => vec![other],
        })
    }
}

#[async_trait]
impl FootballApi for HttpFootballApi {
    async fn get_fixture(&self, fixture_id: i64) -> ApiResult<Vec<Value>> {
        self.request_list("/fixtures", &[("id", fixture_id.to_string())])
            .await
    }

    async fn get_predictions(&self, fixture_id: i64) -> ApiResult<Vec<Value>> {
        self.request_list("/predictions", &[("fixture", fixture_id.to_string())])
            .await
    }

    async fn get_head_to_head(
        &self,
        team_a: i64,
        team_b: i64,
        last: u32,
        status: Option<&str>,
    ) -> ApiResult<Vec<Value>> {
        let mut query = vec![
            ("h2h", format!("{team_a}-{team_b}")),
            ("last", last.to_string()),
        ];
        if let Some(status) = status {
            query.push(("status", status.to_string()));
        }
        self.request_list("/fixtures/headtohead", &query).await
    }

    async fn get_fixture_statistics(&self, fixture_id: i64) -> ApiResult<Vec<Value>> {
        self.request_list("/fixtures/statistics", &[("fixture", fixture_id.to_string())])
            .await
    }

    async fn get_fixture_players(&self, fixture_id: i64) -> ApiResult<Vec<Value>> {
        self.request_list("/fixtures/players", &[("fixture", fixture_id.to_string())])
            .await
    }

    async fn get_fixture_events(&self, fixture_id: i64) -> ApiResult<Vec<Value>> {
        self.request_list("/fixtures/events", &[("fixture", fixture_id.to_string())])
            .await
    }

    async fn get_fixture_lineups(&self, fixture_id: i64) -> ApiResult<Vec<Value>> {
        self.request_list("/fixtures/lineups", &[("fixture", fixture_id.to_string())])
            .await
    }

    async fn get_standings(&self, season: i32, league_id: i64) -> ApiResult<Vec<Value>> {
        self.request_list(
            "/standings",
            &[("league", league_id.to_string()), ("season", season.to_string())],
        )
        .await
    }

    async fn get_team_statistics(
        &self,
        team_id: i64,
        season: i32,
        league_id: i64,
    ) -> ApiResult<Value> {
        self.request(
            "/teams/statistics",
            &[
                ("team", team_id.to_string()),
                ("league", league_id.to_string()),
                ("season", season.to_string()),
            ],
        )
        .await
    }

    async fn get_injuries(
        &self,
        team_id: i64,
        league_id: i64,
        season: i32,
    ) -> ApiResult<Vec<Value>> {
        self.request_list(
            "/injuries",
            &[
                ("team", team_id.to_string()),
                ("league", league_id.to_string()),
                ("season", season.to_string()),
            ],
        )
        .await
    }

    async fn get_sidelined(&self, team_id: i64) -> ApiResult<Vec<Value>> {
        self.request_list("/sidelined", &[("team", team_id.to_string())])
            .await
    }

    async fn get_top_scorers(&self, league_id: i64, season: i32) -> ApiResult<Vec<Value>> {
        self.request_list(
            "/players/topscorers",
            &[("league", league_id.to_string()), ("season", season.to_string())],
        )
        .await
    }

    async fn get_top_assists(&self, league_id: i64, season: i32) -> ApiResult<Vec<Value>> {
        self.request_list(
            "/players/topassists",
            &[("league", league_id.to_string()), ("season", season.to_string())],
        )
        .await
    }

    async fn get_top_yellow_cards(&self, league_id: i64, season: i32) -> ApiResult<Vec<Value>> {
        self.request_list(
            "/players/topyellowcards",
            &[("league", league_id.to_string()), ("season", season.to_string())],
        )
        .await
    }

    async fn get_top_red_cards(&self, league_id: i64, season: i32) -> ApiResult<Vec<Value>> {
        self.request_list(
            "/players/topredcards",
            &[("league", league_id.to_string()), ("season", season.to_string())],
        )
        .await
    }
}
