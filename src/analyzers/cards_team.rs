//! Team card indicators from H2H fixture statistics.
//!
//! Every H2H detail entry counts toward the per-match averages, even when its
//! statistics came back empty.

use serde_json::{json, Map, Value};

use crate::analyzers::team_stat_int;
use crate::bundle::RawBundle;
use crate::jsonutil::{round1, round2};

pub(super) fn indicators(bundle: &RawBundle) -> Map<String, Value> {
    let mut total_yellow = 0i64;
    let mut total_red = 0i64;
    let mut match_count = 0i64;
    let mut h2h_stats = Vec::new();

    for detail in &bundle.h2h_details {
        let mut match_yellow = 0i64;
        let mut match_red = 0i64;

        if let Some(statistics) = detail.statistics.as_ref().and_then(|s| s.as_array()) {
            for team_entry in statistics {
                if let Some(yellow) = team_stat_int(team_entry, "Yellow Cards") {
                    match_yellow += yellow;
                    total_yellow += yellow;
                }
                if let Some(red) = team_stat_int(team_entry, "Red Cards") {
                    match_red += red;
                    total_red += red;
                }
            }
        }

        match_count += 1;
        h2h_stats.push(json!({
            "fixture_id": detail.fixture_id,
            "yellow_cards": match_yellow,
            "red_cards": match_red,
            "total_cards": match_yellow + match_red,
        }));
    }

    let avg = |total: i64, decimals: u8| {
        if match_count > 0 && total > 0 {
            let value = total as f64 / match_count as f64;
            json!(if decimals == 2 { round2(value) } else { round1(value) })
        } else {
            Value::Null
        }
    };

    let mut out = Map::new();
    out.insert("avg_yellow_cards".to_string(), avg(total_yellow, 1));
    out.insert("avg_red_cards".to_string(), avg(total_red, 2));
    out.insert(
        "avg_total_cards".to_string(),
        avg(total_yellow + total_red, 1),
    );
    out.insert("h2h_stats".to_string(), Value::Array(h2h_stats));
    out
}
