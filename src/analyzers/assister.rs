//! Assister indicators, symmetric to the scorer analyzer.
//!
//! Provider quirk: assist counts live under `goals.assists`, `passes.assists`
//! or `passes.total` depending on the competition. The probing order below is
//! load-bearing; keep it.

use serde_json::{json, Map, Value};

use crate::analyzers::first_statistics;
use crate::analyzers::scorer::per_90;
use crate::bundle::RawBundle;
use crate::jsonutil::{get_i64, get_str};

pub(super) fn indicators(bundle: &RawBundle) -> Map<String, Value> {
    let home_team = bundle.home_team_name();
    let away_team = bundle.away_team_name();

    let mut out = Map::new();
    out.insert(
        "top_assisters_league".to_string(),
        format_top_assisters(&bundle.top_assists),
    );
    out.insert(
        "home_team_assisters".to_string(),
        filter_by_team(&bundle.top_assists, home_team),
    );
    out.insert(
        "away_team_assisters".to_string(),
        filter_by_team(&bundle.top_assists, away_team),
    );
    out.insert("h2h_assisters".to_string(), h2h_assisters(bundle));
    out
}

/// First non-zero of `goals.assists`, `passes.assists`, `passes.total`.
fn assists_count(stats: &Value) -> i64 {
    [
        ["goals", "assists"],
        ["passes", "assists"],
        ["passes", "total"],
    ]
    .iter()
    .filter_map(|path| get_i64(stats, path))
    .find(|count| *count != 0)
    .unwrap_or(0)
}

fn format_top_assisters(top_assists: &[Value]) -> Value {
    let assisters: Vec<Value> = top_assists
        .iter()
        .take(10)
        .map(|player_data| {
            let stats = first_statistics(player_data);
            let assists = stats.map(assists_count).unwrap_or(0);
            let minutes = stats.and_then(|s| get_i64(s, &["games", "minutes"]));

            json!({
                "name": get_str(player_data, &["player", "name"]),
                "team": stats.and_then(|s| get_str(s, &["team", "name"])),
                "assists": assists,
                "appearances": stats
                    .and_then(|s| get_i64(s, &["games", "appearences"]))
                    .unwrap_or(0),
                "assists_per_90": per_90(Some(assists), minutes),
            })
        })
        .collect();

    Value::Array(assisters)
}

fn filter_by_team(top_assists: &[Value], team_name: Option<&str>) -> Value {
    let Some(team_name) = team_name else {
        return json!([]);
    };
    let wanted = team_name.to_lowercase();

    let assisters: Vec<Value> = top_assists
        .iter()
        .filter_map(|player_data| {
            let stats = first_statistics(player_data)?;
            let player_team = get_str(stats, &["team", "name"])?;
            if !player_team.to_lowercase().contains(&wanted) {
                return None;
            }

            let assists = assists_count(stats);
            let minutes = get_i64(stats, &["games", "minutes"]);

            Some(json!({
                "name": get_str(player_data, &["player", "name"]),
                "assists": assists,
                "assists_per_90": per_90(Some(assists), minutes),
            }))
        })
        .take(5)
        .collect();

    Value::Array(assisters)
}

fn h2h_assisters(bundle: &RawBundle) -> Value {
    let mut assisters: Vec<(String, i64)> = Vec::new();

    for detail in &bundle.h2h_details {
        let Some(events) = detail.events.as_ref().and_then(|e| e.as_array()) else {
            continue;
        };

        for event in events {
            if get_str(event, &["type"]) != Some("Goal") {
                continue;
            }
            // The provider spells a missing assist as the string "None".
            let Some(name) = get_str(event, &["assist", "name"]).filter(|n| *n != "None") else {
                continue;
            };

            match assisters.iter_mut().find(|(n, _)| n == name) {
                Some((_, count)) => *count += 1,
                None => assisters.push((name.to_string(), 1)),
            }
        }
    }

    assisters.sort_by(|a, b| b.1.cmp(&a.1));

    json!({
        "assisters": assisters
            .into_iter()
            .take(10)
            .map(|(name, assists)| json!({"name": name, "assists": assists}))
            .collect::<Vec<_>>(),
    })
}
