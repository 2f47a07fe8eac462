//! Bet-type analyzers.
//!
//! Eight pure projections from the raw bundle to indicator dictionaries.
//! Each variant declares the bundle sections it requires; the shared
//! `analyze` fills in the available sources and the coverage flag. Missing
//! inputs degrade indicators to null/empty values, never to failures.

mod assister;
mod card_player;
mod cards_team;
mod corners;
mod goals;
mod one_x_two;
mod scorer;
mod shots;

use serde_json::{Map, Value};
use tracing::debug;

use crate::bundle::RawBundle;
use crate::context::BetAnalysisData;
use crate::jsonutil;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Analyzer {
    /// Match result: home win / draw / away win.
    OneXTwo,
    /// Goals totals: over/under, BTTS, clean sheets.
    Goals,
    Shots,
    Corners,
    CardsTeam,
    CardPlayer,
    Scorer,
    Assister,
}

impl Analyzer {
    /// All eight analyzers, in the canonical bet-type order.
    pub fn all() -> [Analyzer; 8] {
        [
            Self::OneXTwo,
            Self::Goals,
            Self::Shots,
            Self::Corners,
            Self::CardsTeam,
            Self::CardPlayer,
            Self::Scorer,
            Self::Assister,
        ]
    }

    pub fn by_bet_type(bet_type: &str) -> Option<Analyzer> {
        Self::all().into_iter().find(|a| a.bet_type() == bet_type)
    }

    pub fn bet_type(&self) -> &'static str {
        match self {
            Self::OneXTwo => "1x2",
            Self::Goals => "goals",
            Self::Shots => "shots",
            Self::Corners => "corners",
            Self::CardsTeam => "cards_team",
            Self::CardPlayer => "card_player",
            Self::Scorer => "scorer",
            Self::Assister => "assister",
        }
    }

    /// Sections this analyzer needs for complete coverage.
    pub fn required_sources(&self) -> &'static [&'static str] {
        match self {
            Self::OneXTwo => &["predictions", "h2h_history", "standings"],
            Self::Goals => &["predictions", "h2h_history"],
            Self::Shots => &["h2h_details"],
            Self::Corners => &["h2h_details"],
            // Season-level team statistics would sharpen team card rates, but
            // the contract keeps the stricter h2h-only required set.
            Self::CardsTeam => &["h2h_details"],
            Self::CardPlayer => &["top_cards", "h2h_details"],
            Self::Scorer => &["top_scorers", "h2h_details"],
            Self::Assister => &["top_assists", "h2h_details"],
        }
    }

    pub fn compute_indicators(&self, bundle: &RawBundle) -> Map<String, Value> {
        match self {
            Self::OneXTwo => one_x_two::indicators(bundle),
            Self::Goals => goals::indicators(bundle),
            Self::Shots => shots::indicators(bundle),
            Self::Corners => corners::indicators(bundle),
            Self::CardsTeam => cards_team::indicators(bundle),
            Self::CardPlayer => card_player::indicators(bundle),
            Self::Scorer => scorer::indicators(bundle),
            Self::Assister => assister::indicators(bundle),
        }
    }

    pub fn analyze(&self, bundle: &RawBundle) -> BetAnalysisData {
        debug!(bet_type = self.bet_type(), "analyzing");

        let indicators = self.compute_indicators(bundle);
        let data_sources = bundle.available_sources();
        let coverage_complete = self
            .required_sources()
            .iter()
            .all(|required| data_sources.iter().any(|s| s == required));

        BetAnalysisData {
            indicators,
            data_sources,
            coverage_complete,
        }
    }

    /// Required sources absent from `data_sources`.
    pub fn missing_sources(&self, data_sources: &[String]) -> Vec<String> {
        self.required_sources()
            .iter()
            .filter(|required| !data_sources.iter().any(|s| s == **required))
            .map(|s| s.to_string())
            .collect()
    }
}

/// Look up one named statistic in a fixture-statistics team entry
/// (`{team, statistics: [{type, value}, ...]}`).
pub(crate) fn team_stat_int(team_entry: &Value, stat_type: &str) -> Option<i64> {
    let stats = jsonutil::get_array(team_entry, &["statistics"])?;
    stats
        .iter()
        .find(|s| jsonutil::get_str(s, &["type"]) == Some(stat_type))
        .and_then(|s| s.get("value"))
        .and_then(jsonutil::parse_int)
}

/// First statistics block of a leader-board player entry.
pub(crate) fn first_statistics(player_data: &Value) -> Option<&Value> {
    jsonutil::get_array(player_data, &["statistics"])?.first()
}
