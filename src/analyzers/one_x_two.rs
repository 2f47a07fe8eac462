//! Match-result (1X2) indicators: recent form, head-to-head record,
//! standings gap, home advantage and the provider's own prediction.

use serde_json::{json, Map, Value};

use crate::bundle::RawBundle;
use crate::jsonutil::{get_i64, get_path, get_str};

pub(super) fn indicators(bundle: &RawBundle) -> Map<String, Value> {
    let pred = bundle.predictions.as_ref();
    let home_id = bundle.home_team_id();
    let away_id = bundle.away_team_id();

    let mut out = Map::new();
    out.insert("recent_form".to_string(), recent_form(pred));
    out.insert(
        "h2h_stats".to_string(),
        h2h_stats(&bundle.h2h_history, home_id, away_id),
    );
    out.insert(
        "standings_gap".to_string(),
        standings_gap(bundle.standings.as_ref(), home_id, away_id),
    );
    out.insert("home_advantage".to_string(), home_advantage(pred));
    out.insert("prediction_api".to_string(), prediction_api(pred));
    out
}

fn recent_form(pred: Option<&Value>) -> Value {
    let side = |name: &str| -> Value {
        let league = pred.and_then(|p| get_path(p, &["teams", name, "league"]));
        let form = league.and_then(|l| get_str(l, &["form"]));
        json!({
            "form": form,
            "last_5_wins": form.map(|f| f.matches('W').count()).unwrap_or(0),
            "fixtures": league
                .and_then(|l| get_path(l, &["fixtures"]))
                .cloned()
                .unwrap_or_else(|| json!({})),
        })
    };

    json!({ "home": side("home"), "away": side("away") })
}

fn h2h_stats(h2h: &[Value], home_id: Option<i64>, away_id: Option<i64>) -> Value {
    let (Some(home_id), Some(_away_id)) = (home_id, away_id) else {
        return json!({"total": 0});
    };
    if h2h.is_empty() {
        return json!({"total": 0});
    }

    let mut home_wins = 0;
    let mut draws = 0;
    let mut away_wins = 0;
    let mut last_results = Vec::new();

    for m in h2h {
        let Some(goals_home) = get_i64(m, &["goals", "home"]) else {
            continue;
        };
        let Some(goals_away) = get_i64(m, &["goals", "away"]) else {
            continue;
        };
        let match_home_id = get_i64(m, &["teams", "home", "id"]);

        // Results are from the perspective of the upcoming fixture's home
        // team, whichever side it played in the prior meeting.
        let our_goals_margin = if match_home_id == Some(home_id) {
            goals_home - goals_away
        } else {
            goals_away - goals_home
        };

        let result = if our_goals_margin > 0 {
            home_wins += 1;
            "W"
        } else if our_goals_margin == 0 {
            draws += 1;
            "D"
        } else {
            away_wins += 1;
            "L"
        };

        last_results.push(json!({
            "date": get_str(m, &["fixture", "date"]),
            "result": result,
            "score": format!("{goals_home}-{goals_away}"),
        }));
    }

    last_results.truncate(5);

    json!({
        "total": h2h.len(),
        "home_wins": home_wins,
        "draws": draws,
        "away_wins": away_wins,
        "last_5": last_results,
    })
}

fn standings_gap(standings: Option<&Value>, home_id: Option<i64>, away_id: Option<i64>) -> Value {
    let (Some(standings), Some(home_id), Some(away_id)) = (standings, home_id, away_id) else {
        return json!({});
    };

    let mut home_pos = None;
    let mut away_pos = None;
    let mut home_points = None;
    let mut away_points = None;

    let blocks: Vec<&Value> = match standings {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    };

    for block in blocks {
        // Each standings block carries the table as the first group.
        let Some(groups) = crate::jsonutil::get_array(block, &["league", "standings"]) else {
            continue;
        };
        let Some(table) = groups.first().and_then(|g| g.as_array()) else {
            continue;
        };

        for entry in table {
            match get_i64(entry, &["team", "id"]) {
                Some(id) if id == home_id => {
                    home_pos = get_i64(entry, &["rank"]);
                    home_points = get_i64(entry, &["points"]);
                }
                Some(id) if id == away_id => {
                    away_pos = get_i64(entry, &["rank"]);
                    away_points = get_i64(entry, &["points"]);
                }
                _ => {}
            }
        }
    }

    let (Some(home_pos), Some(away_pos)) = (home_pos, away_pos) else {
        return json!({});
    };

    json!({
        "home_position": home_pos,
        "away_position": away_pos,
        "position_gap": (home_pos - away_pos).abs(),
        "home_points": home_points,
        "away_points": away_points,
        "points_gap": match (home_points, away_points) {
            (Some(h), Some(a)) => json!(h - a),
            _ => Value::Null,
        },
    })
}

fn home_advantage(pred: Option<&Value>) -> Value {
    let wins = |side: &str| pred.and_then(|p| {
        get_path(p, &["teams", side, "league", "fixtures", "wins"])
    });

    json!({
        "home_wins_at_home": wins("home").and_then(|w| get_path(w, &["home"])).cloned(),
        "home_total_wins": wins("home").and_then(|w| get_path(w, &["total"])).cloned(),
        "away_wins_away": wins("away").and_then(|w| get_path(w, &["away"])).cloned(),
        "away_total_wins": wins("away").and_then(|w| get_path(w, &["total"])).cloned(),
    })
}

fn prediction_api(pred: Option<&Value>) -> Value {
    let p = |path: &[&str]| {
        pred.and_then(|v| get_path(v, path))
            .cloned()
            .unwrap_or(Value::Null)
    };

    json!({
        "winner": p(&["predictions", "winner", "name"]),
        "winner_comment": p(&["predictions", "winner", "comment"]),
        "win_percent": p(&["predictions", "percent", "home"]),
        "draw_percent": p(&["predictions", "percent", "draw"]),
        "lose_percent": p(&["predictions", "percent", "away"]),
        "advice": p(&["predictions", "advice"]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn h2h_results_follow_the_upcoming_home_team() {
        let h2h = vec![
            // Our home team (1) hosted and won 2-0.
            json!({
                "fixture": {"id": 10, "date": "2024-01-10"},
                "teams": {"home": {"id": 1}, "away": {"id": 2}},
                "goals": {"home": 2, "away": 0}
            }),
            // Our home team (1) visited and won 1-3.
            json!({
                "fixture": {"id": 11, "date": "2023-06-01"},
                "teams": {"home": {"id": 2}, "away": {"id": 1}},
                "goals": {"home": 1, "away": 3}
            }),
            // Draw.
            json!({
                "fixture": {"id": 12, "date": "2022-11-20"},
                "teams": {"home": {"id": 1}, "away": {"id": 2}},
                "goals": {"home": 1, "away": 1}
            }),
        ];

        let stats = h2h_stats(&h2h, Some(1), Some(2));
        assert_eq!(stats["total"], 3);
        assert_eq!(stats["home_wins"], 2);
        assert_eq!(stats["draws"], 1);
        assert_eq!(stats["away_wins"], 0);
        assert_eq!(stats["last_5"][0]["result"], "W");
        assert_eq!(stats["last_5"][0]["score"], "2-0");
        assert_eq!(stats["last_5"][1]["result"], "W");
    }

    #[test]
    fn h2h_skips_entries_without_goals() {
        let h2h = vec![json!({
            "teams": {"home": {"id": 1}, "away": {"id": 2}},
            "goals": {"home": null, "away": null}
        })];
        let stats = h2h_stats(&h2h, Some(1), Some(2));
        assert_eq!(stats["total"], 1);
        assert_eq!(stats["home_wins"], 0);
        assert_eq!(stats["last_5"].as_array().unwrap().len(), 0);
    }

    #[test]
    fn standings_gap_computes_position_and_points() {
        let standings = json!([{
            "league": {"standings": [[
                {"team": {"id": 1}, "rank": 2, "points": 40},
                {"team": {"id": 2}, "rank": 9, "points": 25}
            ]]}
        }]);
        let gap = standings_gap(Some(&standings), Some(1), Some(2));
        assert_eq!(gap["home_position"], 2);
        assert_eq!(gap["away_position"], 9);
        assert_eq!(gap["position_gap"], 7);
        assert_eq!(gap["points_gap"], 15);
    }

    #[test]
    fn standings_gap_empty_when_team_missing() {
        let standings = json!([{
            "league": {"standings": [[{"team": {"id": 1}, "rank": 2, "points": 40}]]}
        }]);
        let gap = standings_gap(Some(&standings), Some(1), Some(2));
        assert_eq!(gap, json!({}));
    }

    #[test]
    fn recent_form_counts_wins() {
        let pred = json!({
            "teams": {
                "home": {"league": {"form": "WWDLW", "fixtures": {"played": {"total": 20}}}},
                "away": {"league": {"form": "LLDWL"}}
            }
        });
        let form = recent_form(Some(&pred));
        assert_eq!(form["home"]["last_5_wins"], 3);
        assert_eq!(form["away"]["last_5_wins"], 1);
        assert_eq!(form["home"]["fixtures"]["played"]["total"], 20);
    }

    #[test]
    fn prediction_extraction() {
        let pred = json!({
            "predictions": {
                "winner": {"name": "Mali", "comment": "Win or draw"},
                "percent": {"home": "45%", "draw": "30%", "away": "25%"},
                "advice": "Double chance: Mali or draw"
            }
        });
        let p = prediction_api(Some(&pred));
        assert_eq!(p["winner"], "Mali");
        assert_eq!(p["win_percent"], "45%");
        assert_eq!(p["advice"], "Double chance: Mali or draw");

        let empty = prediction_api(None);
        assert_eq!(empty["winner"], Value::Null);
    }
}
