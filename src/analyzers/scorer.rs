//! Scorer indicators: league top scorers, per-team subsets and scorers seen
//! in the head-to-head meetings.

use serde_json::{json, Map, Value};

use crate::analyzers::first_statistics;
use crate::bundle::RawBundle;
use crate::jsonutil::{get_i64, get_str, round2};

pub(super) fn indicators(bundle: &RawBundle) -> Map<String, Value> {
    let home_team = bundle.home_team_name();
    let away_team = bundle.away_team_name();

    let mut out = Map::new();
    out.insert(
        "top_scorers_league".to_string(),
        format_top_scorers(&bundle.top_scorers),
    );
    out.insert(
        "home_team_scorers".to_string(),
        filter_by_team(&bundle.top_scorers, home_team),
    );
    out.insert(
        "away_team_scorers".to_string(),
        filter_by_team(&bundle.top_scorers, away_team),
    );
    out.insert("h2h_scorers".to_string(), h2h_scorers(bundle));
    out
}

/// Goals per 90 minutes, two decimals; null when goals or minutes are
/// missing or zero.
pub(super) fn per_90(count: Option<i64>, minutes: Option<i64>) -> Value {
    match (count, minutes) {
        (Some(count), Some(minutes)) if count > 0 && minutes > 0 => {
            json!(round2(count as f64 / minutes as f64 * 90.0))
        }
        _ => Value::Null,
    }
}

fn format_top_scorers(top_scorers: &[Value]) -> Value {
    let scorers: Vec<Value> = top_scorers
        .iter()
        .take(10)
        .map(|player_data| {
            let stats = first_statistics(player_data);
            let goals = stats.and_then(|s| get_i64(s, &["goals", "total"]));
            let minutes = stats.and_then(|s| get_i64(s, &["games", "minutes"]));

            json!({
                "name": get_str(player_data, &["player", "name"]),
                "team": stats.and_then(|s| get_str(s, &["team", "name"])),
                "goals": goals.unwrap_or(0),
                "appearances": stats
                    .and_then(|s| get_i64(s, &["games", "appearences"]))
                    .unwrap_or(0),
                "goals_per_90": per_90(goals, minutes),
            })
        })
        .collect();

    Value::Array(scorers)
}

fn filter_by_team(top_scorers: &[Value], team_name: Option<&str>) -> Value {
    let Some(team_name) = team_name else {
        return json!([]);
    };
    let wanted = team_name.to_lowercase();

    let scorers: Vec<Value> = top_scorers
        .iter()
        .filter_map(|player_data| {
            let stats = first_statistics(player_data)?;
            let player_team = get_str(stats, &["team", "name"])?;
            if !player_team.to_lowercase().contains(&wanted) {
                return None;
            }

            let goals = get_i64(stats, &["goals", "total"]);
            let minutes = get_i64(stats, &["games", "minutes"]);

            Some(json!({
                "name": get_str(player_data, &["player", "name"]),
                "goals": goals.unwrap_or(0),
                "goals_per_90": per_90(goals, minutes),
            }))
        })
        .take(5)
        .collect();

    Value::Array(scorers)
}

fn h2h_scorers(bundle: &RawBundle) -> Value {
    // First-seen order breaks ties after the count sort.
    let mut scorers: Vec<(String, i64)> = Vec::new();

    for detail in &bundle.h2h_details {
        let Some(events) = detail.events.as_ref().and_then(|e| e.as_array()) else {
            continue;
        };

        for event in events {
            if get_str(event, &["type"]) != Some("Goal") {
                continue;
            }
            let Some(name) = get_str(event, &["player", "name"]) else {
                continue;
            };

            match scorers.iter_mut().find(|(n, _)| n == name) {
                Some((_, count)) => *count += 1,
                None => scorers.push((name.to_string(), 1)),
            }
        }
    }

    scorers.sort_by(|a, b| b.1.cmp(&a.1));

    json!({
        "scorers": scorers
            .into_iter()
            .take(10)
            .map(|(name, goals)| json!({"name": name, "goals": goals}))
            .collect::<Vec<_>>(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::H2hDetail;

    fn scorer(name: &str, team: &str, goals: i64, appearances: i64, minutes: i64) -> Value {
        json!({
            "player": {"name": name},
            "statistics": [{
                "team": {"name": team},
                "goals": {"total": goals},
                "games": {"appearences": appearances, "minutes": minutes}
            }]
        })
    }

    #[test]
    fn goals_per_90_rounding() {
        // 10 goals in 810 minutes -> 1.11 per 90.
        let top = vec![scorer("X", "A", 10, 9, 810)];
        let out = format_top_scorers(&top);
        assert_eq!(out[0]["goals_per_90"], 1.11);
        assert_eq!(out[0]["appearances"], 9);
    }

    #[test]
    fn zero_minutes_yields_null_rate() {
        let top = vec![scorer("X", "A", 3, 2, 0)];
        let out = format_top_scorers(&top);
        assert_eq!(out[0]["goals_per_90"], Value::Null);
        assert_eq!(out[0]["goals"], 3);
    }

    #[test]
    fn team_filter_is_substring_and_case_insensitive() {
        let mut bundle = RawBundle::new(json!({
            "teams": {"home": {"id": 1, "name": "mali"}, "away": {"id": 2, "name": "Zambia"}}
        }));
        bundle.top_scorers = vec![
            scorer("A", "Mali", 5, 10, 900),
            scorer("B", "Zambia", 4, 10, 900),
            scorer("C", "Mali U23", 2, 8, 600),
        ];

        let out = indicators(&bundle);
        let home = out["home_team_scorers"].as_array().unwrap();
        assert_eq!(home.len(), 2);
        assert_eq!(home[0]["name"], "A");
        assert_eq!(home[1]["name"], "C");
        let away = out["away_team_scorers"].as_array().unwrap();
        assert_eq!(away.len(), 1);
    }

    #[test]
    fn h2h_scorers_sorted_by_count_then_first_seen() {
        let events = json!([
            {"type": "Goal", "player": {"name": "A"}},
            {"type": "Goal", "player": {"name": "B"}},
            {"type": "Card", "player": {"name": "C"}},
            {"type": "Goal", "player": {"name": "B"}}
        ]);
        let mut bundle = RawBundle::new(json!({}));
        bundle.h2h_details = vec![H2hDetail {
            fixture_id: 1,
            events: Some(events),
            ..Default::default()
        }];

        let out = h2h_scorers(&bundle);
        let scorers = out["scorers"].as_array().unwrap();
        assert_eq!(scorers.len(), 2);
        assert_eq!(scorers[0]["name"], "B");
        assert_eq!(scorers[0]["goals"], 2);
        assert_eq!(scorers[1]["name"], "A");
    }
}
