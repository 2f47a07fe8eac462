//! Corner-kick indicators from H2H fixture statistics.

use serde_json::{json, Map, Value};

use crate::analyzers::team_stat_int;
use crate::bundle::RawBundle;
use crate::jsonutil::round1;

pub(super) fn indicators(bundle: &RawBundle) -> Map<String, Value> {
    let mut total_corners = 0i64;
    let mut match_count = 0i64;
    let mut over_9_5 = 0i64;
    let mut over_10_5 = 0i64;
    let mut h2h_stats = Vec::new();

    for detail in &bundle.h2h_details {
        let Some(statistics) = detail.statistics.as_ref().and_then(|s| s.as_array()) else {
            continue;
        };

        let match_corners: i64 = statistics
            .iter()
            .filter_map(|team_entry| team_stat_int(team_entry, "Corner Kicks"))
            .sum();

        if match_corners > 0 {
            total_corners += match_corners;
            match_count += 1;

            if match_corners >= 10 {
                over_9_5 += 1;
            }
            if match_corners >= 11 {
                over_10_5 += 1;
            }

            h2h_stats.push(json!({
                "fixture_id": detail.fixture_id,
                "total_corners": match_corners,
            }));
        }
    }

    let pct = |count: i64| {
        if match_count > 0 && count > 0 {
            json!(round1(count as f64 / match_count as f64 * 100.0))
        } else {
            Value::Null
        }
    };
    let avg = if match_count > 0 {
        json!(round1(total_corners as f64 / match_count as f64))
    } else {
        Value::Null
    };

    let mut out = Map::new();
    out.insert("avg_corners".to_string(), avg);
    out.insert("over_9_5_pct".to_string(), pct(over_9_5));
    out.insert("over_10_5_pct".to_string(), pct(over_10_5));
    out.insert("h2h_stats".to_string(), Value::Array(h2h_stats));
    out
}
