//! Tag grammar: `key:value;flag;key:` → ordered typed map.
//!
//! Items are separated by `;`, a doubled `;;` is a literal semicolon inside
//! a value. Each item splits on its first `:`. Bare items are `true`, an
//! empty value is `""`, and non-empty values are coerced bool → number →
//! string. Keys are lowercased. Malformed items are dropped, never reported.

use log::debug;

use crate::types::{ParsedTagMap, TagValue};
use crate::value::parse_number;

/// Parse one raw tag string.
pub fn parse_tag(tag: &str) -> ParsedTagMap {
    let mut map = ParsedTagMap::new();

    for item in split_items(tag) {
        if item.trim().is_empty() {
            continue;
        }

        match item.split_once(':') {
            None => {
                map.insert(item.trim().to_lowercase(), TagValue::Bool(true));
            }
            Some((key, value)) => {
                let key = key.trim().to_lowercase();
                if key.is_empty() {
                    debug!("dropping tag item without key: {item:?}");
                    continue;
                }
                map.insert(key, coerce_value(value.trim()));
            }
        }
    }

    map
}

/// Split on `;`, turning `;;` into a literal `;` within the current item.
pub fn split_items(tag: &str) -> Vec<String> {
    let mut items = Vec::new();
    let mut current = String::new();
    let mut chars = tag.chars().peekable();

    while let Some(c) = chars.next() {
        if c != ';' {
            current.push(c);
            continue;
        }
        if chars.peek() == Some(&';') {
            chars.next();
            current.push(';');
        } else {
            items.push(std::mem::take(&mut current));
        }
    }
    items.push(current);

    items
}

/// Coerce a trimmed value: `""` stays a string, then bool, number, string.
pub fn coerce_value(value: &str) -> TagValue {
    if value.is_empty() {
        return TagValue::String(String::new());
    }
    if value.eq_ignore_ascii_case("true") {
        return TagValue::Bool(true);
    }
    if value.eq_ignore_ascii_case("false") {
        return TagValue::Bool(false);
    }
    match parse_number(value) {
        Some(n) => TagValue::Number(n),
        None => TagValue::String(value.to_string()),
    }
}

/// Inverse of `parse_tag` for one pair; escapes literal semicolons.
pub fn serialize_item(key: &str, value: &TagValue) -> String {
    match value {
        TagValue::Bool(true) => key.to_string(),
        other => format!("{key}:{}", other.to_string().replace(';', ";;")),
    }
}
