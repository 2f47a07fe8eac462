//! Safe access into deeply nested, sparsely populated provider JSON.
//!
//! Upstream payloads are permissive records: any branch may be missing or
//! null. Every analyzer field access goes through these helpers so a missing
//! branch degrades to `None` instead of failing.

use serde_json::Value;

/// Walk a path of object keys, returning `None` on any missing branch or
/// explicit null.
pub fn get_path<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = value;
    for key in path {
        current = current.as_object()?.get(*key)?;
    }
    if current.is_null() {
        None
    } else {
        Some(current)
    }
}

pub fn get_str<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    get_path(value, path)?.as_str()
}

pub fn get_i64(value: &Value, path: &[&str]) -> Option<i64> {
    parse_int(get_path(value, path)?)
}

pub fn get_f64(value: &Value, path: &[&str]) -> Option<f64> {
    parse_float(get_path(value, path)?)
}

pub fn get_array<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Vec<Value>> {
    get_path(value, path)?.as_array()
}

/// Lenient integer parse: JSON numbers and numeric strings both count.
pub fn parse_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Lenient float parse: accepts numbers, numeric strings and `"53%"`.
pub fn parse_float(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Round to one decimal place (percentages).
pub fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Round to two decimal places (per-90 rates, averages).
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
