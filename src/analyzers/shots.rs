//! Shots indicators: H2H totals and accuracy, plus threshold-based series
//! over each team's recent fixtures when an enriched bundle supplies them.

use serde_json::{json, Map, Value};

use crate::analyzers::team_stat_int;
use crate::bundle::RawBundle;
use crate::jsonutil::{get_i64, round1};

const SHOTS_THRESHOLD: i64 = 10;
const SHOTS_ON_TARGET_THRESHOLD: i64 = 4;
const DEFAULT_RECENT_LIMIT: usize = 5;

pub(super) fn indicators(bundle: &RawBundle) -> Map<String, Value> {
    let h2h = h2h_shots(bundle);

    let mut out = Map::new();
    out.insert("avg_shots".to_string(), h2h["avg_shots"].clone());
    out.insert(
        "avg_shots_on_target".to_string(),
        h2h["avg_shots_on_target"].clone(),
    );
    out.insert("accuracy_rate".to_string(), h2h["accuracy_rate"].clone());
    out.insert("h2h_stats".to_string(), h2h["h2h_stats"].clone());
    out.insert("shots_series".to_string(), shots_series(bundle));
    out
}

fn h2h_shots(bundle: &RawBundle) -> Value {
    if bundle.h2h_details.is_empty() {
        return json!({
            "avg_shots": null,
            "avg_shots_on_target": null,
            "accuracy_rate": null,
            "h2h_stats": [],
        });
    }

    let mut total_shots = 0i64;
    let mut total_on_target = 0i64;
    let mut match_count = 0i64;
    let mut h2h_stats = Vec::new();

    for detail in &bundle.h2h_details {
        let Some(statistics) = detail.statistics.as_ref().and_then(|s| s.as_array()) else {
            continue;
        };

        let mut match_shots = 0i64;
        let mut match_on_target = 0i64;

        for team_entry in statistics {
            if let Some(shots) = team_stat_int(team_entry, "Total Shots") {
                match_shots += shots;
                total_shots += shots;
            }
            if let Some(on_target) = team_stat_int(team_entry, "Shots on Goal") {
                match_on_target += on_target;
                total_on_target += on_target;
            }
        }

        if match_shots > 0 {
            match_count += 1;
            h2h_stats.push(json!({
                "fixture_id": detail.fixture_id,
                "total_shots": match_shots,
                "shots_on_target": match_on_target,
            }));
        }
    }

    let avg = |total: i64| {
        if match_count > 0 {
            json!(round1(total as f64 / match_count as f64))
        } else {
            Value::Null
        }
    };
    let accuracy = if total_shots > 0 {
        json!(round1(total_on_target as f64 / total_shots as f64 * 100.0))
    } else {
        Value::Null
    };

    json!({
        "avg_shots": avg(total_shots),
        "avg_shots_on_target": avg(total_on_target),
        "accuracy_rate": accuracy,
        "h2h_stats": h2h_stats,
    })
}

/// Streak summaries over recent fixtures, per side, per competition scope and
/// per home/away split. Empty when the bundle has no recent-fixture data.
fn shots_series(bundle: &RawBundle) -> Value {
    let (Some(home_id), Some(away_id)) = (bundle.home_team_id(), bundle.away_team_id()) else {
        return json!({});
    };

    let limit = bundle.recent_fixtures_last_n.unwrap_or(DEFAULT_RECENT_LIMIT);

    json!({
        "home": {
            "all_competitions": series_bundle(bundle, &bundle.team1_recent_fixtures, home_id, limit),
            "league": series_bundle(bundle, &bundle.team1_recent_fixtures_league, home_id, limit),
        },
        "away": {
            "all_competitions": series_bundle(bundle, &bundle.team2_recent_fixtures, away_id, limit),
            "league": series_bundle(bundle, &bundle.team2_recent_fixtures_league, away_id, limit),
        },
    })
}

struct TeamMatch {
    fixture_id: i64,
    at_home: bool,
}

fn series_bundle(bundle: &RawBundle, fixtures: &[Value], team_id: i64, limit: usize) -> Value {
    let matches = extract_team_matches(fixtures, team_id);
    if matches.is_empty() {
        return json!({});
    }

    let overall: Vec<&TeamMatch> = matches.iter().take(limit).collect();
    let home: Vec<&TeamMatch> = matches.iter().filter(|m| m.at_home).take(limit).collect();
    let away: Vec<&TeamMatch> = matches.iter().filter(|m| !m.at_home).take(limit).collect();

    json!({
        "overall": summarize_matches(bundle, &overall, team_id),
        "home": summarize_matches(bundle, &home, team_id),
        "away": summarize_matches(bundle, &away, team_id),
    })
}

fn extract_team_matches(fixtures: &[Value], team_id: i64) -> Vec<TeamMatch> {
    fixtures
        .iter()
        .filter_map(|f| {
            let fixture_id = get_i64(f, &["fixture", "id"])?;
            let at_home = get_i64(f, &["teams", "home", "id"]) == Some(team_id);
            Some(TeamMatch { fixture_id, at_home })
        })
        .collect()
}

fn summarize_matches(bundle: &RawBundle, matches: &[&TeamMatch], team_id: i64) -> Value {
    if matches.is_empty() {
        return json!({});
    }

    let mut shots_values = Vec::new();
    let mut on_target_values = Vec::new();

    for m in matches {
        let Some(stats) = bundle.recent_fixture_stats.get(&m.fixture_id) else {
            continue;
        };
        let Some(entries) = stats.as_array() else {
            continue;
        };
        let Some(team_entry) = entries
            .iter()
            .find(|e| get_i64(e, &["team", "id"]) == Some(team_id))
        else {
            continue;
        };

        if let Some(shots) = team_stat_int(team_entry, "Total Shots") {
            shots_values.push(shots);
        }
        if let Some(on_target) = team_stat_int(team_entry, "Shots on Goal")
            .or_else(|| team_stat_int(team_entry, "Shots on Target"))
        {
            on_target_values.push(on_target);
        }
    }

    json!({
        "shots": threshold_series(&shots_values, SHOTS_THRESHOLD),
        "shots_on_target": threshold_series(&on_target_values, SHOTS_ON_TARGET_THRESHOLD),
    })
}

/// Over/under counts and current streaks for one value series against a
/// fixed threshold. Values are ordered most recent first.
fn threshold_series(values: &[i64], threshold: i64) -> Value {
    if values.is_empty() {
        return json!({});
    }

    let over = values.iter().filter(|v| **v >= threshold).count();
    let under = values.len() - over;

    let current_over_streak = values.iter().take_while(|v| **v >= threshold).count();
    let current_under_streak = values.iter().take_while(|v| **v < threshold).count();

    let average = values.iter().sum::<i64>() as f64 / values.len() as f64;

    json!({
        "matches": values.len(),
        "threshold": threshold,
        "over": over,
        "under": under,
        "current_over_streak": current_over_streak,
        "current_under_streak": current_under_streak,
        "average": round1(average),
        "min": values.iter().min(),
        "max": values.iter().max(),
    })
}
