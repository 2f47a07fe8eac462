//! Goals (over/under) indicators: scoring averages, provider over/under
//! percentages, both-teams-to-score frequencies, clean sheets and H2H goals.

use serde_json::{json, Map, Value};

use crate::bundle::RawBundle;
use crate::jsonutil::{get_i64, get_path, parse_float, round1, round2};

pub(super) fn indicators(bundle: &RawBundle) -> Map<String, Value> {
    let pred = bundle.predictions.as_ref();
    let team1_stats = bundle.team1_stats.as_ref();
    let team2_stats = bundle.team2_stats.as_ref();

    let mut out = Map::new();
    out.insert(
        "average_goals".to_string(),
        average_goals(pred, team1_stats, team2_stats),
    );
    out.insert("over_under".to_string(), over_under(pred));
    out.insert("btts".to_string(), btts(pred));
    out.insert(
        "clean_sheets".to_string(),
        clean_sheets(team1_stats, team2_stats),
    );
    out.insert("h2h_goals".to_string(), h2h_goals(&bundle.h2h_history));
    out
}

fn average_goals(
    pred: Option<&Value>,
    team1_stats: Option<&Value>,
    team2_stats: Option<&Value>,
) -> Value {
    let pred_avg = |side: &str| {
        pred.and_then(|p| {
            get_path(p, &["teams", side, "league", "goals", "for", "average", "total"])
        })
    };
    fn stats_avg(stats: Option<&Value>) -> Option<&Value> {
        stats.and_then(|s| get_path(s, &["goals", "for", "average", "total"]))
    }

    let home = pred_avg("home").or_else(|| stats_avg(team1_stats));
    let away = pred_avg("away").or_else(|| stats_avg(team2_stats));

    // Averages come back as strings ("1.4"); combine leniently.
    let combined = match (home.and_then(parse_float), away.and_then(parse_float)) {
        (Some(h), Some(a)) => json!(round2(h + a)),
        _ => Value::Null,
    };

    json!({
        "home_avg_scored": home.cloned(),
        "away_avg_scored": away.cloned(),
        "combined_avg": combined,
    })
}

fn over_under(pred: Option<&Value>) -> Value {
    let p = |key: &str| {
        pred.and_then(|v| get_path(v, &["goals", key]))
            .cloned()
            .unwrap_or(Value::Null)
    };

    json!({
        "over_0_5": p("over_0_5"),
        "over_1_5": p("over_1_5"),
        "over_2_5": p("over_2_5"),
        "over_3_5": p("over_3_5"),
        "under_0_5": p("under_0_5"),
        "under_1_5": p("under_1_5"),
        "under_2_5": p("under_2_5"),
        "under_3_5": p("under_3_5"),
    })
}

fn btts(pred: Option<&Value>) -> Value {
    let goals_total = |side: &str, direction: &str| {
        pred.and_then(|p| {
            get_path(p, &["teams", side, "league", "goals", direction, "total", "total"])
        })
        .cloned()
    };

    json!({
        "home_scoring_frequency": goals_total("home", "for"),
        "home_conceding_frequency": goals_total("home", "against"),
        "away_scoring_frequency": goals_total("away", "for"),
        "away_conceding_frequency": goals_total("away", "against"),
        "btts_percentage": pred.and_then(|p| get_path(p, &["goals", "btts"])).cloned(),
    })
}

fn clean_sheets(team1_stats: Option<&Value>, team2_stats: Option<&Value>) -> Value {
    json!({
        "home_clean_sheets": team1_stats
            .and_then(|s| get_path(s, &["clean_sheet", "total"]))
            .cloned(),
        "away_clean_sheets": team2_stats
            .and_then(|s| get_path(s, &["clean_sheet", "total"]))
            .cloned(),
    })
}

fn h2h_goals(h2h: &[Value]) -> Value {
    if h2h.is_empty() {
        return json!({"total_matches": 0});
    }

    let mut total_goals = 0i64;
    let mut over_2_5_count = 0i64;
    let mut goals_per_match = Vec::new();

    for m in h2h {
        let (Some(home), Some(away)) = (
            get_i64(m, &["goals", "home"]),
            get_i64(m, &["goals", "away"]),
        ) else {
            continue;
        };

        let match_total = home + away;
        total_goals += match_total;
        goals_per_match.push(match_total);

        if match_total >= 3 {
            over_2_5_count += 1;
        }
    }

    let matches = h2h.len() as f64;
    goals_per_match.truncate(5);

    json!({
        "total_matches": h2h.len(),
        "total_goals": total_goals,
        "avg_goals_per_match": round2(total_goals as f64 / matches),
        "over_2_5_count": over_2_5_count,
        "over_2_5_percentage": round1(over_2_5_count as f64 / matches * 100.0),
        "goals_distribution": goals_per_match,
    })
}
