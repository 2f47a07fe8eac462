//! Shared test support: a counting stub provider and canned provider data.
#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use match_context::agent::ContextAgent;
use match_context::api::FootballApi;
use match_context::collector::DataCollector;
use match_context::error::{ApiError, ApiResult};
use match_context::lock::LockManager;
use match_context::store::{FileStore, MatchContextStore};

pub const HOME_ID: i64 = 1601; // Mali
pub const AWAY_ID: i64 = 1604; // Zambia
pub const LEAGUE_ID: i64 = 6;
pub const SEASON: i32 = 2025;

/// Counting stub provider serving a complete dataset for any fixture id.
#[derive(Default)]
pub struct StubApi {
    /// Every upstream call attempted, across all endpoints.
    pub calls: AtomicU32,
    /// Fixture lookups only; exactly one per cold collection.
    pub fixture_calls: AtomicU32,
    /// Serve 5xx for the four H2H detail endpoints.
    pub fail_h2h_details: bool,
    /// Serve an empty `response` for the fixture lookup.
    pub empty_fixture: bool,
    /// Status short code returned by fixture lookups.
    pub fixture_status: Option<String>,
}

impl StubApi {
    pub fn full() -> Self {
        Self::default()
    }

    pub fn without_h2h_details() -> Self {
        Self {
            fail_h2h_details: true,
            ..Self::default()
        }
    }

    pub fn with_status(status: &str) -> Self {
        Self {
            fixture_status: Some(status.to_string()),
            ..Self::default()
        }
    }

    fn count(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn detail_call(&self, payload: Vec<Value>) -> ApiResult<Vec<Value>> {
        self.count();
        if self.fail_h2h_details {
            Err(ApiError::Transient("server error 500".to_string()))
        } else {
            Ok(payload)
        }
    }
}

#[async_trait]
impl FootballApi for StubApi {
    async fn get_fixture(&self, fixture_id: i64) -> ApiResult<Vec<Value>> {
        self.count();
        self.fixture_calls.fetch_add(1, Ordering::SeqCst);
        if self.empty_fixture {
            return Ok(Vec::new());
        }
        let status = self.fixture_status.as_deref().unwrap_or("NS");
        Ok(vec![fixture_value(fixture_id, status)])
    }

    async fn get_predictions(&self, _fixture_id: i64) -> ApiResult<Vec<Value>> {
        self.count();
        Ok(vec![predictions_value()])
    }

    async fn get_head_to_head(
        &self,
        _team_a: i64,
        _team_b: i64,
        _last: u32,
        _status: Option<&str>,
    ) -> ApiResult<Vec<Value>> {
        self.count();
        Ok(h2h_history())
    }

    async fn get_fixture_statistics(&self, fixture_id: i64) -> ApiResult<Vec<Value>> {
        self.detail_call(fixture_statistics(fixture_id))
    }

    async fn get_fixture_players(&self, _fixture_id: i64) -> ApiResult<Vec<Value>> {
        self.detail_call(vec![json!({"team": {"id": HOME_ID}, "players": []})])
    }

    async fn get_fixture_events(&self, _fixture_id: i64) -> ApiResult<Vec<Value>> {
        self.detail_call(fixture_events())
    }

    async fn get_fixture_lineups(&self, _fixture_id: i64) -> ApiResult<Vec<Value>> {
        self.detail_call(vec![
            json!({"team": {"id": HOME_ID}, "formation": "4-3-3"}),
            json!({"team": {"id": AWAY_ID}, "formation": "4-4-2"}),
        ])
    }

    async fn get_standings(&self, _season: i32, _league_id: i64) -> ApiResult<Vec<Value>> {
        self.count();
        Ok(vec![json!({
            "league": {"id": LEAGUE_ID, "standings": [[
                {"team": {"id": HOME_ID}, "rank": 3, "points": 30},
                {"team": {"id": AWAY_ID}, "rank": 7, "points": 22}
            ]]}
        })])
    }

    async fn get_team_statistics(
        &self,
        team_id: i64,
        _season: i32,
        _league_id: i64,
    ) -> ApiResult<Value> {
        self.count();
        Ok(json!({
            "team": {"id": team_id},
            "clean_sheet": {"total": if team_id == HOME_ID { 4 } else { 2 }},
            "goals": {"for": {"average": {"total": "1.6"}}}
        }))
    }

    async fn get_injuries(
        &self,
        team_id: i64,
        _league_id: i64,
        _season: i32,
    ) -> ApiResult<Vec<Value>> {
        self.count();
        Ok(vec![json!({"player": {"name": format!("Injured {team_id}")}, "team": {"id": team_id}})])
    }

    async fn get_sidelined(&self, team_id: i64) -> ApiResult<Vec<Value>> {
        self.count();
        Ok(vec![json!({"player": {"name": format!("Sidelined {team_id}")}, "type": "Injury"})])
    }

    async fn get_top_scorers(&self, _league_id: i64, _season: i32) -> ApiResult<Vec<Value>> {
        self.count();
        Ok(top_scorers())
    }

    async fn get_top_assists(&self, _league_id: i64, _season: i32) -> ApiResult<Vec<Value>> {
        self.count();
        Ok(vec![player_entry("Assister A", "Mali", json!({"goals": {"assists": 6}, "games": {"appearences": 10, "minutes": 900}}))])
    }

    async fn get_top_yellow_cards(&self, _league_id: i64, _season: i32) -> ApiResult<Vec<Value>> {
        self.count();
        Ok(vec![player_entry("Booked B", "Zambia", json!({"cards": {"yellow": 8}, "games": {"position": "Defender"}}))])
    }

    async fn get_top_red_cards(&self, _league_id: i64, _season: i32) -> ApiResult<Vec<Value>> {
        self.count();
        Ok(vec![player_entry("Sent Off C", "Mali", json!({"cards": {"red": 2}}))])
    }
}

pub fn fixture_value(fixture_id: i64, status: &str) -> Value {
    json!({
        "fixture": {
            "id": fixture_id,
            "date": "2025-12-28T17:00:00+00:00",
            "status": {"short": status},
            "venue": {"name": "Stade Olympique"}
        },
        "teams": {
            "home": {"id": HOME_ID, "name": "Mali"},
            "away": {"id": AWAY_ID, "name": "Zambia"}
        },
        "league": {"id": LEAGUE_ID, "name": "Africa Cup of Nations", "season": SEASON}
    })
}

pub fn predictions_value() -> Value {
    json!({
        "predictions": {
            "winner": {"name": "Mali", "comment": "Win or draw"},
            "percent": {"home": "45%", "draw": "30%", "away": "25%"},
            "advice": "Double chance: Mali or draw"
        },
        "teams": {
            "home": {"league": {
                "form": "WWDWL",
                "fixtures": {"wins": {"home": 5, "away": 3, "total": 8}},
                "goals": {"for": {"average": {"total": "1.8"}, "total": {"total": 18}},
                           "against": {"total": {"total": 9}}}
            }},
            "away": {"league": {
                "form": "LDWLL",
                "fixtures": {"wins": {"home": 2, "away": 1, "total": 3}},
                "goals": {"for": {"average": {"total": "0.9"}, "total": {"total": 9}},
                           "against": {"total": {"total": 14}}}
            }}
        },
        "goals": {"over_2_5": "60%", "under_2_5": "40%", "btts": "55%"}
    })
}

/// Five finished meetings, most recent first. Mali (the upcoming home side)
/// won 2, drew 1, lost 2.
pub fn h2h_history() -> Vec<Value> {
    let entry = |id: i64, date: &str, home: i64, gh: i64, ga: i64| {
        let away = if home == HOME_ID { AWAY_ID } else { HOME_ID };
        json!({
            "fixture": {"id": id, "date": date},
            "teams": {"home": {"id": home}, "away": {"id": away}},
            "goals": {"home": gh, "away": ga}
        })
    };

    vec![
        entry(90001, "2024-01-10T17:00:00+00:00", HOME_ID, 2, 1),
        entry(90002, "2023-06-12T17:00:00+00:00", AWAY_ID, 1, 1),
        entry(90003, "2022-11-02T17:00:00+00:00", HOME_ID, 3, 1),
        entry(90004, "2021-09-05T17:00:00+00:00", AWAY_ID, 2, 0),
        entry(90005, "2020-03-20T17:00:00+00:00", HOME_ID, 1, 2),
    ]
}

pub fn fixture_statistics(fixture_id: i64) -> Vec<Value> {
    let entry = |team_id: i64, shots: i64, on_goal: i64, corners: i64, yellow: i64| {
        json!({
            "team": {"id": team_id},
            "statistics": [
                {"type": "Total Shots", "value": shots},
                {"type": "Shots on Goal", "value": on_goal},
                {"type": "Corner Kicks", "value": corners},
                {"type": "Yellow Cards", "value": yellow},
                {"type": "Red Cards", "value": 0},
                {"type": "Ball Possession", "value": "52%"}
            ]
        })
    };

    // Vary totals a little per fixture so averages are non-trivial.
    let bump = fixture_id % 3;
    vec![
        entry(HOME_ID, 12 + bump, 5, 6, 2),
        entry(AWAY_ID, 8, 3, 4 + bump, 1),
    ]
}

pub fn fixture_events() -> Vec<Value> {
    vec![
        json!({"type": "Goal", "player": {"name": "Doumbia"}, "assist": {"name": "Traore"}}),
        json!({"type": "Goal", "player": {"name": "Doumbia"}, "assist": {"name": "None"}}),
        json!({"type": "Card", "player": {"name": "Banda"}}),
        json!({"type": "Goal", "player": {"name": "Banda"}, "assist": {"name": "Mwila"}}),
    ]
}

pub fn player_entry(name: &str, team: &str, stats: Value) -> Value {
    let mut statistics = stats;
    statistics["team"] = json!({"name": team});
    json!({"player": {"name": name}, "statistics": [statistics]})
}

pub fn top_scorers() -> Vec<Value> {
    vec![
        player_entry(
            "Doumbia",
            "Mali",
            json!({"goals": {"total": 10}, "games": {"appearences": 9, "minutes": 810}}),
        ),
        player_entry(
            "Banda",
            "Zambia",
            json!({"goals": {"total": 7}, "games": {"appearences": 10, "minutes": 900}}),
        ),
    ]
}

/// A fresh agent over a file store in a unique temp directory, with the
/// process-local lock manager and a zero pre-call delay.
pub async fn test_agent(stub: Arc<StubApi>) -> (Arc<ContextAgent>, LockManager, PathBuf) {
    test_agent_with(stub, false).await
}

pub async fn test_agent_with(
    stub: Arc<StubApi>,
    status_refresh_for_ns: bool,
) -> (Arc<ContextAgent>, LockManager, PathBuf) {
    let dir = std::env::temp_dir().join(format!("match-context-test-{}", uuid::Uuid::new_v4()));
    let store = MatchContextStore::File(FileStore::new(&dir).await.expect("temp store"));

    let locks = LockManager::local();
    let collector = DataCollector::new(stub.clone(), 5)
        .with_precall_delay(Duration::ZERO)
        .with_budget(Duration::from_secs(30));

    let agent = Arc::new(
        ContextAgent::new(stub, collector, store, locks.clone())
            .with_status_refresh_for_ns(status_refresh_for_ns),
    );
    (agent, locks, dir)
}
