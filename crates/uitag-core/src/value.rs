//! Script-compatible coercions over row data.
//!
//! Row data arrives as JSON produced for a script front-end, so numeric
//! and string conversions follow the same rules that front-end applies.

use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// 2^53.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

static RE_DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?(?:\d+\.?\d*|\.\d+)(?:[eE][+-]?\d+)?$").unwrap());
static RE_RADIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^0([xXoObB])([0-9a-fA-F]+)$").unwrap());

/// Full-string numeric parse. Accepts decimal and exponent forms plus
/// `0x`/`0o`/`0b` integer literals; rejects anything with trailing text.
pub fn parse_number(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if RE_DECIMAL.is_match(s) {
        return s.parse::<f64>().ok().filter(|n| n.is_finite());
    }
    let caps = RE_RADIX.captures(s)?;
    let radix = match caps[1].to_ascii_lowercase().as_str() {
        "x" => 16,
        "o" => 8,
        _ => 2,
    };
    i64::from_str_radix(&caps[2], radix).ok().map(|n| n as f64)
}

/// Numeric coercion of a JSON value. `None` where the script would get `NaN`.
pub fn to_number(value: &Value) -> Option<f64> {
    match value {
        Value::Null => Some(0.0),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::Number(n) => n.as_f64(),
        Value::String(s) if s.trim().is_empty() => Some(0.0),
        Value::String(s) => parse_number(s),
        Value::Array(items) => match items.as_slice() {
            [] => Some(0.0),
            [single] => to_number(single),
            _ => None,
        },
        Value::Object(_) => None,
    }
}

/// Render a number the way script stringification does: integral values
/// lose the fraction, non-finite values are spelled out.
pub fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else {
        format!("{n}")
    }
}

/// JSON form of a number: integral values within the exactly representable
/// range become integers, non-finite values become `null`.
pub fn number_to_json(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < MAX_SAFE_INTEGER {
        Value::Number((n as i64).into())
    } else {
        serde_json::Number::from_f64(n)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

/// Display string for a JSON value. Objects render as compact JSON.
pub fn to_display_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => number_to_string(f),
            _ => n.to_string(),
        },
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(to_display_string)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => value.to_string(),
    }
}

/// `null`, missing and `""` all count as "no value" for display.
pub fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        _ => false,
    }
}

/// Script truthiness of a JSON value.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
