//! The raw bundle: the transient bag of provider responses for one fixture.
//!
//! Produced by the collector, consumed by the analyzers, never persisted.
//! Every section is either present with provider data or absent; analyzers
//! must treat missing sections uniformly.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::jsonutil;

/// Detail sub-sections for one head-to-head fixture.
#[derive(Debug, Clone, Default)]
pub struct H2hDetail {
    pub fixture_id: i64,
    pub statistics: Option<Value>,
    pub players: Option<Value>,
    pub events: Option<Value>,
    pub lineups: Option<Value>,
}

/// All data collected for one fixture.
#[derive(Debug, Clone)]
pub struct RawBundle {
    /// Mandatory fixture record: teams, league, date, status, venue.
    pub fixture: Value,
    pub predictions: Option<Value>,
    /// Prior meetings, finished only, most recent first, at most 5.
    pub h2h_history: Vec<Value>,
    /// Four sub-sections for the 3 most recent H2H fixtures.
    pub h2h_details: Vec<H2hDetail>,
    pub standings: Option<Value>,
    pub team1_stats: Option<Value>,
    pub team2_stats: Option<Value>,
    /// Both teams' injury lists merged.
    pub injuries: Vec<Value>,
    /// Both teams' long-term absences merged.
    pub sidelined: Vec<Value>,
    pub top_scorers: Vec<Value>,
    pub top_assists: Vec<Value>,
    pub top_yellow: Vec<Value>,
    pub top_red: Vec<Value>,
    /// Recent fixtures per team, when an enriched collection supplies them.
    /// The standard 25-call collection leaves these empty.
    pub team1_recent_fixtures: Vec<Value>,
    pub team2_recent_fixtures: Vec<Value>,
    pub team1_recent_fixtures_league: Vec<Value>,
    pub team2_recent_fixtures_league: Vec<Value>,
    /// Per-fixture statistics for the recent fixtures above, keyed by id.
    pub recent_fixture_stats: HashMap<i64, Value>,
    pub recent_fixtures_last_n: Option<usize>,
    /// Number of upstream calls attempted during collection, failures included.
    pub api_calls_count: u32,
    pub collected_at: DateTime<Utc>,
}

impl RawBundle {
    /// An empty bundle around a fixture record. Sections are filled in by the
    /// collector; tests build bundles directly.
    pub fn new(fixture: Value) -> Self {
        Self {
            fixture,
            predictions: None,
            h2h_history: Vec::new(),
            h2h_details: Vec::new(),
            standings: None,
            team1_stats: None,
            team2_stats: None,
            injuries: Vec::new(),
            sidelined: Vec::new(),
            top_scorers: Vec::new(),
            top_assists: Vec::new(),
            top_yellow: Vec::new(),
            top_red: Vec::new(),
            team1_recent_fixtures: Vec::new(),
            team2_recent_fixtures: Vec::new(),
            team1_recent_fixtures_league: Vec::new(),
            team2_recent_fixtures_league: Vec::new(),
            recent_fixture_stats: HashMap::new(),
            recent_fixtures_last_n: None,
            api_calls_count: 0,
            collected_at: Utc::now(),
        }
    }

    pub fn home_team_id(&self) -> Option<i64> {
        jsonutil::get_i64(&self.fixture, &["teams", "home", "id"])
    }

    pub fn away_team_id(&self) -> Option<i64> {
        jsonutil::get_i64(&self.fixture, &["teams", "away", "id"])
    }

    pub fn home_team_name(&self) -> Option<&str> {
        jsonutil::get_str(&self.fixture, &["teams", "home", "name"])
    }

    pub fn away_team_name(&self) -> Option<&str> {
        jsonutil::get_str(&self.fixture, &["teams", "away", "name"])
    }

    /// Section names present in this bundle, in the fixed vocabulary shared
    /// with analyzer `required_sources` declarations. The two per-team stat
    /// sections fold into `team_statistics`; the two card leader boards fold
    /// into `top_cards`.
    pub fn available_sources(&self) -> Vec<String> {
        let mut sources = Vec::new();

        if self.predictions.is_some() {
            sources.push("predictions".to_string());
        }
        if !self.h2h_history.is_empty() {
            sources.push("h2h_history".to_string());
        }
        // Detail entries whose four sub-calls all failed carry no data and do
        // not make the section available.
        if self.h2h_details.iter().any(|d| {
            d.statistics.is_some() || d.players.is_some() || d.events.is_some() || d.lineups.is_some()
        }) {
            sources.push("h2h_details".to_string());
        }
        if self.standings.is_some() {
            sources.push("standings".to_string());
        }
        if self.team1_stats.is_some() || self.team2_stats.is_some() {
            sources.push("team_statistics".to_string());
        }
        if !self.injuries.is_empty() {
            sources.push("injuries".to_string());
        }
        if !self.top_scorers.is_empty() {
            sources.push("top_scorers".to_string());
        }
        if !self.top_assists.is_empty() {
            sources.push("top_assists".to_string());
        }
        if !self.top_yellow.is_empty() || !self.top_red.is_empty() {
            sources.push("top_cards".to_string());
        }

        sources
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fixture() -> Value {
        json!({
            "fixture": {"id": 1347240, "date": "2025-12-28T17:00:00+00:00", "status": {"short": "NS"}},
            "teams": {"home": {"id": 1, "name": "Mali"}, "away": {"id": 2, "name": "Zambia"}},
            "league": {"id": 6, "name": "Africa Cup of Nations", "season": 2025}
        })
    }

    #[test]
    fn team_accessors() {
        let bundle = RawBundle::new(fixture());
        assert_eq!(bundle.home_team_id(), Some(1));
        assert_eq!(bundle.away_team_id(), Some(2));
        assert_eq!(bundle.home_team_name(), Some("Mali"));
        assert_eq!(bundle.away_team_name(), Some("Zambia"));
    }

    #[test]
    fn empty_bundle_has_no_sources() {
        let bundle = RawBundle::new(fixture());
        assert!(bundle.available_sources().is_empty());
    }

    #[test]
    fn empty_h2h_details_are_not_a_source() {
        let mut bundle = RawBundle::new(fixture());
        bundle.h2h_details = vec![H2hDetail {
            fixture_id: 7,
            ..Default::default()
        }];
        assert!(bundle.available_sources().is_empty());

        bundle.h2h_details[0].events = Some(json!([]));
        assert!(bundle
            .available_sources()
            .contains(&"h2h_details".to_string()));
    }

    #[test]
    fn section_folding() {
        let mut bundle = RawBundle::new(fixture());
        bundle.team2_stats = Some(json!({"clean_sheet": {"total": 3}}));
        bundle.top_red = vec![json!({"player": {"name": "X"}})];
        let sources = bundle.available_sources();
        assert!(sources.contains(&"team_statistics".to_string()));
        assert!(sources.contains(&"top_cards".to_string()));
        assert!(!sources.contains(&"predictions".to_string()));
    }
}
