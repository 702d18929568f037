//! Normalization of stored filter configuration into the nested tree shape
//!
//! Two storage shapes exist:
//!
//! - Nested (version 2): `{"_id", "version": 2, "mode", "conditions": [...]}`
//! - Legacy flat list: `[{"mode": "any"}, {"key": ...}, {"key": ...}]`, or the
//!   same list keyed by position with a `"mode"` entry:
//!   `{"mode": "all", "0": {...}, "1": {...}}`
//!
//! Under `any`, all flat conditions become one OR group under the top AND.
//! Otherwise each flat condition gets its own single-element OR group.

use crate::filter::tree::{generate_id, Condition, FilterGroup, FilterNode, Mode};
use serde_json::{Map, Value};

/// Normalize stored configuration into a tree; malformed input is `Absent`
pub fn normalize(raw: &Value) -> Condition {
    match raw {
        Value::Null => Condition::Absent,
        Value::Array(items) if items.is_empty() => Condition::Absent,
        Value::Array(items) => normalize_flat(None, items.iter()),
        Value::Object(map) if map.is_empty() => Condition::Absent,
        Value::Object(map) if is_nested(map) => Condition::Group(FilterGroup::from_json(raw)),
        Value::Object(map) => {
            let mode = map.get("mode").and_then(Value::as_str);
            let mut entries: Vec<(&String, &Value)> = map.iter().filter(|(k, _)| k.as_str() != "mode").collect();
            // Keys are list positions; keep their numeric order
            entries.sort_by_key(|(k, _)| k.parse::<usize>().unwrap_or(usize::MAX));
            normalize_flat(mode, entries.into_iter().map(|(_, v)| v))
        }
        _ => Condition::Absent,
    }
}

/// Normalize configuration stored as JSON text
pub fn normalize_str(raw: &str) -> Condition {
    if raw.trim().is_empty() {
        return Condition::Absent;
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(value) => normalize(&value),
        Err(e) => {
            log::warn!("Stored filter configuration is not valid JSON ({}); no filter applied", e);
            Condition::Absent
        }
    }
}

fn is_nested(map: &Map<String, Value>) -> bool {
    map.get("version").and_then(version_number) == Some(2) || map.contains_key("conditions")
}

fn version_number(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn normalize_flat<'a>(mode: Option<&str>, items: impl Iterator<Item = &'a Value>) -> Condition {
    let mut mode = mode.map(str::to_string);
    let mut nodes = Vec::new();

    for item in items {
        let Value::Object(map) = item else { continue };
        // Pseudo-entry carrying only the list mode
        if map.contains_key("mode") && !map.contains_key("key") {
            if let Some(m) = map.get("mode").and_then(Value::as_str) {
                mode = Some(m.to_string());
            }
            continue;
        }
        let mut node = FilterNode::from_json(item);
        node.id = generate_id();
        nodes.push(Condition::Node(node));
    }

    if nodes.is_empty() {
        return Condition::Absent;
    }

    let children = if mode.as_deref() == Some("any") {
        vec![Condition::Group(FilterGroup::new(Mode::Or, nodes))]
    } else {
        nodes
            .into_iter()
            .map(|node| Condition::Group(FilterGroup::new(Mode::Or, vec![node])))
            .collect()
    };
    Condition::Group(FilterGroup::new(Mode::And, children))
}
