// Value matching primitives used when evaluating a condition against one entry

use chrono::Duration;
use crate::filter::tree::{NodeValue, Operator};
use crate::utils::date::parse_stored_date;

/// Generic (case-insensitive) comparison of a stored value against a condition value.
///
/// Stored JSON arrays (multi-select, multi-file uploads) match a positive
/// operator when any element matches, and a negative operator when no
/// element matches its positive counterpart.
pub fn matches_operation(actual: &str, operator: Operator, expected: &NodeValue) -> bool {
    let (operator, expected) = match operator.proxy_target() {
        Some(target) => (target, NodeValue::default()),
        None => (operator, expected.clone()),
    };

    if let Some(items) = json_list(actual) {
        if items.is_empty() {
            return matches_scalar("", operator, &expected);
        }
        return match positive_counterpart(operator) {
            Some(positive) => !items.iter().any(|item| matches_scalar(item, positive, &expected)),
            None => items.iter().any(|item| matches_scalar(item, operator, &expected)),
        };
    }

    matches_scalar(actual, operator, &expected)
}

fn positive_counterpart(operator: Operator) -> Option<Operator> {
    match operator {
        Operator::IsNot => Some(Operator::Is),
        Operator::DoesNotContain => Some(Operator::Contains),
        Operator::NotIn => Some(Operator::In),
        Operator::NotOn => Some(Operator::On),
        _ => None,
    }
}

fn matches_scalar(actual: &str, operator: Operator, expected: &NodeValue) -> bool {
    let actual = actual.to_lowercase();
    let candidates: Vec<String> = expected.items().iter().map(|s| s.to_lowercase()).collect();

    // A list value under is/isnot behaves like in/not-in
    let operator = match (operator, expected) {
        (Operator::Is, NodeValue::List(_)) => Operator::In,
        (Operator::IsNot, NodeValue::List(_)) => Operator::NotIn,
        (op, _) => op,
    };
    let needle = candidates.first().cloned().unwrap_or_default();

    match operator {
        Operator::Is | Operator::On => actual == needle,
        Operator::IsNot | Operator::NotOn => actual != needle,
        Operator::Gt | Operator::After => compare(&actual, &needle) == Some(std::cmp::Ordering::Greater),
        Operator::Lt | Operator::Before => compare(&actual, &needle) == Some(std::cmp::Ordering::Less),
        Operator::Contains => !needle.is_empty() && actual.contains(&needle),
        Operator::DoesNotContain => needle.is_empty() || !actual.contains(&needle),
        Operator::StartsWith => !needle.is_empty() && actual.starts_with(&needle),
        Operator::EndsWith => !needle.is_empty() && actual.ends_with(&needle),
        Operator::In => candidates.iter().any(|c| *c == actual),
        Operator::NotIn => !candidates.iter().any(|c| *c == actual),
        Operator::IsEmpty => actual.is_empty(),
        Operator::IsNotEmpty => !actual.is_empty(),
    }
}

/// Numeric comparison when both sides are numbers, string comparison otherwise
fn compare(actual: &str, expected: &str) -> Option<std::cmp::Ordering> {
    if actual.is_empty() {
        return None;
    }
    match (actual.trim().parse::<f64>(), expected.trim().parse::<f64>()) {
        (Ok(a), Ok(b)) => a.partial_cmp(&b),
        _ => Some(actual.cmp(expected)),
    }
}

fn json_list(actual: &str) -> Option<Vec<String>> {
    let trimmed = actual.trim();
    if !trimmed.starts_with('[') {
        return None;
    }
    let items: Vec<serde_json::Value> = serde_json::from_str(trimmed).ok()?;
    Some(
        items
            .into_iter()
            .map(|v| match v {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
            .collect(),
    )
}

/// Date-aware comparison. `is`/`on` test whether the stored instant falls in
/// the day starting at the expected instant (a site-local midnight already
/// converted to UTC); `before`/`after` (and `<`/`>`) compare instants. An entry without a date never matches a
/// positive date condition and always matches a negative one.
pub fn matches_date(actual: &str, operator: Operator, expected: &NodeValue) -> bool {
    let (operator, expected) = match operator.proxy_target() {
        Some(target) => (target, NodeValue::default()),
        None => (operator, expected.clone()),
    };

    let expected_text = expected.as_text().unwrap_or_default();
    if expected_text.is_empty() {
        return match operator {
            Operator::Is | Operator::On => actual.trim().is_empty(),
            Operator::IsNot | Operator::NotOn => !actual.trim().is_empty(),
            _ => false,
        };
    }

    let Some(expected_dt) = parse_stored_date(expected_text) else {
        return matches_operation(actual, operator, &expected);
    };

    let Some(actual_dt) = parse_stored_date(actual) else {
        return operator.is_negative();
    };

    let same_day = expected_dt
        .checked_add_signed(Duration::days(1))
        .is_some_and(|end| actual_dt >= expected_dt && actual_dt < end);
    match operator {
        Operator::Is | Operator::On => same_day,
        Operator::IsNot | Operator::NotOn => !same_day,
        Operator::Before | Operator::Lt => actual_dt < expected_dt,
        Operator::After | Operator::Gt => actual_dt > expected_dt,
        other => matches_operation(actual, other, &expected),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> NodeValue {
        NodeValue::text(s)
    }

    #[test]
    fn test_equality_is_case_insensitive() {
        assert!(matches_operation("Red", Operator::Is, &text("red")));
        assert!(!matches_operation("Red", Operator::IsNot, &text("RED")));
        assert!(matches_operation("", Operator::Is, &text("")));
    }

    #[test]
    fn test_numeric_and_string_ordering() {
        assert!(matches_operation("10", Operator::Gt, &text("9")));
        assert!(!matches_operation("10", Operator::Lt, &text("9")));
        assert!(matches_operation("b", Operator::Gt, &text("a")));
        assert!(!matches_operation("", Operator::Lt, &text("5")));
    }

    #[test]
    fn test_substring_operators_need_a_needle() {
        assert!(matches_operation("Hello World", Operator::Contains, &text("world")));
        assert!(!matches_operation("Hello", Operator::Contains, &text("")));
        assert!(matches_operation("Hello", Operator::StartsWith, &text("he")));
        assert!(matches_operation("Hello", Operator::EndsWith, &text("LO")));
        assert!(matches_operation("Hello", Operator::DoesNotContain, &text("xyz")));
    }

    #[test]
    fn test_list_values() {
        let list = NodeValue::List(vec!["3".to_string(), "4".to_string()]);
        assert!(matches_operation("4", Operator::In, &list));
        assert!(!matches_operation("5", Operator::In, &list));
        assert!(matches_operation("5", Operator::NotIn, &list));
        assert!(matches_operation("3", Operator::Is, &list));
    }

    #[test]
    fn test_stored_json_arrays() {
        let stored = r#"["Red","Blue"]"#;
        assert!(matches_operation(stored, Operator::Is, &text("blue")));
        assert!(!matches_operation(stored, Operator::IsNot, &text("blue")));
        assert!(matches_operation(stored, Operator::IsNot, &text("green")));
        assert!(matches_operation("[]", Operator::Is, &text("")));
    }

    #[test]
    fn test_proxy_operators_match_like_empty_comparisons() {
        for actual in ["", "x", "[]"] {
            assert_eq!(
                matches_operation(actual, Operator::IsEmpty, &text("anything")),
                matches_operation(actual, Operator::Is, &text(""))
            );
            assert_eq!(
                matches_operation(actual, Operator::IsNotEmpty, &text("anything")),
                matches_operation(actual, Operator::IsNot, &text(""))
            );
        }
    }

    #[test]
    fn test_date_matching() {
        let stored = "2026-03-15 14:30:00";
        assert!(matches_date(stored, Operator::Is, &text("2026-03-15 00:00:00")));
        assert!(matches_date(stored, Operator::On, &text("2026-03-15")));
        assert!(matches_date(stored, Operator::NotOn, &text("2026-03-16")));
        assert!(matches_date(stored, Operator::Before, &text("2026-03-16")));
        assert!(matches_date(stored, Operator::After, &text("2026-03-15 10:00:00")));
        assert!(!matches_date(stored, Operator::After, &text("2026-03-16")));
    }

    #[test]
    fn test_day_window_starts_at_local_midnight() {
        // Site at +02:00: 2026-01-10 local begins at 2026-01-09 22:00 UTC
        let day = text("2026-01-09 22:00:00");
        assert!(matches_date("2026-01-10 08:00:00", Operator::On, &day));
        assert!(matches_date("2026-01-09 22:00:00", Operator::Is, &day));
        assert!(matches_date("2026-01-10 21:59:59", Operator::On, &day));
        assert!(!matches_date("2026-01-10 22:00:00", Operator::On, &day));
        assert!(!matches_date("2026-01-09 21:59:59", Operator::On, &day));
        assert!(matches_date("2026-01-09 21:00:00", Operator::NotOn, &day));
        assert!(!matches_date("2026-01-10 08:00:00", Operator::IsNot, &day));
    }

    #[test]
    fn test_date_matching_without_stored_date() {
        assert!(!matches_date("", Operator::Before, &text("2026-03-16")));
        assert!(matches_date("", Operator::IsNot, &text("2026-03-16")));
        assert!(matches_date("", Operator::IsEmpty, &text("ignored")));
        assert!(!matches_date("2026-03-15", Operator::IsEmpty, &text("ignored")));
    }
}
