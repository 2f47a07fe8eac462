//! Player card indicators: league card leader boards and the booking-risk
//! subset.

use serde_json::{json, Map, Value};

use crate::analyzers::first_statistics;
use crate::bundle::RawBundle;
use crate::jsonutil::{get_i64, get_str};

const RISK_YELLOW_FLOOR: i64 = 5;
const RISK_YELLOW_HIGH: i64 = 8;

pub(super) fn indicators(bundle: &RawBundle) -> Map<String, Value> {
    let mut out = Map::new();
    out.insert(
        "top_yellow_card_players".to_string(),
        format_top_players(&bundle.top_yellow, "yellow"),
    );
    out.insert(
        "top_red_card_players".to_string(),
        format_top_players(&bundle.top_red, "red"),
    );
    out.insert(
        "risk_players".to_string(),
        risk_players(&bundle.top_yellow),
    );
    out
}

/// Card count, tolerating both the `yellow` and the `yellowcards` spellings.
fn card_count(stats: &Value, card_type: &str) -> i64 {
    get_i64(stats, &["cards", card_type])
        .or_else(|| get_i64(stats, &["cards", &format!("{card_type}cards")]))
        .unwrap_or(0)
}

fn format_top_players(top_players: &[Value], card_type: &str) -> Value {
    let players: Vec<Value> = top_players
        .iter()
        .take(10)
        .map(|player_data| {
            let stats = first_statistics(player_data);
            let cards = stats.map(|s| card_count(s, card_type)).unwrap_or(0);

            json!({
                "name": get_str(player_data, &["player", "name"]),
                "team": stats.and_then(|s| get_str(s, &["team", "name"])),
                "cards": cards,
                "position": get_str(player_data, &["player", "position"]).or_else(|| {
                    stats.and_then(|s| get_str(s, &["games", "position"]))
                }),
            })
        })
        .collect();

    Value::Array(players)
}

fn risk_players(top_yellow: &[Value]) -> Value {
    let players: Vec<Value> = top_yellow
        .iter()
        .take(5)
        .filter_map(|player_data| {
            let stats = first_statistics(player_data)?;
            let yellow = card_count(stats, "yellow");
            if yellow < RISK_YELLOW_FLOOR {
                return None;
            }

            Some(json!({
                "name": get_str(player_data, &["player", "name"]),
                "team": get_str(stats, &["team", "name"]),
                "yellow_cards": yellow,
                "risk_level": if yellow >= RISK_YELLOW_HIGH { "high" } else { "medium" },
            }))
        })
        .collect();

    Value::Array(players)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(name: &str, team: &str, yellow: i64) -> Value {
        json!({
            "player": {"name": name},
            "statistics": [{
                "team": {"name": team},
                "cards": {"yellow": yellow, "red": 0},
                "games": {"position": "Midfielder"}
            }]
        })
    }

    #[test]
    fn leader_board_keeps_upstream_order_and_truncates() {
        let top: Vec<Value> = (0..12).map(|i| player(&format!("P{i}"), "T", 12 - i)).collect();
        let out = format_top_players(&top, "yellow");
        let list = out.as_array().unwrap();
        assert_eq!(list.len(), 10);
        assert_eq!(list[0]["name"], "P0");
        assert_eq!(list[0]["cards"], 12);
        assert_eq!(list[0]["position"], "Midfielder");
    }

    #[test]
    fn alternate_card_spelling() {
        let data = json!({
            "player": {"name": "X"},
            "statistics": [{"cards": {"yellowcards": 7}}]
        });
        let stats = first_statistics(&data).unwrap();
        assert_eq!(card_count(stats, "yellow"), 7);
    }

    #[test]
    fn risk_tiers() {
        let top = vec![
            player("High", "A", 9),
            player("Medium", "B", 5),
            player("Clean", "C", 2),
        ];
        let out = risk_players(&top);
        let list = out.as_array().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0]["name"], "High");
        assert_eq!(list[0]["risk_level"], "high");
        assert_eq!(list[1]["risk_level"], "medium");
    }

    #[test]
    fn risk_only_considers_top_five() {
        let mut top: Vec<Value> = (0..5).map(|i| player(&format!("P{i}"), "T", 1)).collect();
        top.push(player("Late", "T", 10));
        let out = risk_players(&top);
        assert!(out.as_array().unwrap().is_empty());
    }
}
