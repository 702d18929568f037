//! Filter condition tree
//!
//! A stored filter is a tree of [`FilterGroup`]s (AND/OR combinators) whose
//! leaves are [`FilterNode`]s (field, operator, value). [`Condition::Absent`]
//! marks a slot that was dropped during augmentation and is removed by the
//! pruner.
//!
//! # Storage shape
//!
//! ```text
//! {"_id": "a1", "version": 2, "mode": "and", "conditions": [
//!     {"_id": "b2", "mode": "or", "conditions": [
//!         {"_id": "c3", "key": "7", "operator": "is", "value": "red"}
//!     ]}
//! ]}
//! ```

use crate::utils::fuzzy;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Value a lock filter compares `created_by` against; no user id can equal it
pub const LOCK_SENTINEL: &str = "advanced_filter_lock";

/// Any-field key
pub const ANY_FIELD_KEY: &str = "0";

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Is,
    IsNot,
    Gt,
    Lt,
    Contains,
    DoesNotContain,
    StartsWith,
    EndsWith,
    Before,
    After,
    On,
    NotOn,
    In,
    NotIn,
    // Virtual: proxies for `is ""` / `isnot ""`
    IsEmpty,
    IsNotEmpty,
}

/// Canonical operator names
pub const OPERATOR_NAMES: &[&str] = &[
    "is", "isnot", ">", "<", "contains", "does-not-contain", "starts-with", "ends-with",
    "before", "after", "on", "not-on", "in", "not-in", "is-empty", "is-not-empty",
];

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Is => "is",
            Operator::IsNot => "isnot",
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Contains => "contains",
            Operator::DoesNotContain => "does-not-contain",
            Operator::StartsWith => "starts-with",
            Operator::EndsWith => "ends-with",
            Operator::Before => "before",
            Operator::After => "after",
            Operator::On => "on",
            Operator::NotOn => "not-on",
            Operator::In => "in",
            Operator::NotIn => "not-in",
            Operator::IsEmpty => "is-empty",
            Operator::IsNotEmpty => "is-not-empty",
        }
    }

    pub fn is_virtual(&self) -> bool {
        matches!(self, Operator::IsEmpty | Operator::IsNotEmpty)
    }

    /// Operator that is satisfied when the positive counterpart is not
    pub fn is_negative(&self) -> bool {
        matches!(
            self,
            Operator::IsNot | Operator::DoesNotContain | Operator::NotOn | Operator::NotIn | Operator::IsNotEmpty
        )
    }

    /// Map a virtual operator to the real operator it stands for.
    /// Returns `None` for real operators.
    pub fn proxy_target(&self) -> Option<Operator> {
        match self {
            Operator::IsEmpty => Some(Operator::Is),
            Operator::IsNotEmpty => Some(Operator::IsNot),
            _ => None,
        }
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "is" | "=" | "==" => Ok(Operator::Is),
            "isnot" | "is-not" | "!=" | "<>" => Ok(Operator::IsNot),
            ">" | "greater_than" => Ok(Operator::Gt),
            "<" | "less_than" => Ok(Operator::Lt),
            "contains" => Ok(Operator::Contains),
            "does-not-contain" | "ncontains" | "not_contains" => Ok(Operator::DoesNotContain),
            "starts-with" | "starts_with" => Ok(Operator::StartsWith),
            "ends-with" | "ends_with" => Ok(Operator::EndsWith),
            "before" => Ok(Operator::Before),
            "after" => Ok(Operator::After),
            "on" => Ok(Operator::On),
            "not-on" | "not_on" => Ok(Operator::NotOn),
            "in" => Ok(Operator::In),
            "not-in" | "not_in" => Ok(Operator::NotIn),
            "is-empty" | "is_empty" | "isempty" => Ok(Operator::IsEmpty),
            "is-not-empty" | "is_not_empty" | "isnotempty" => Ok(Operator::IsNotEmpty),
            other => Err(match fuzzy::suggest(other, OPERATOR_NAMES, 2) {
                Some(suggestion) => format!("Unknown filter operator '{}' (did you mean '{}'?)", other, suggestion),
                None => format!("Unknown filter operator '{}'", other),
            }),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comparison value of a node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeValue {
    Text(String),
    List(Vec<String>),
}

impl NodeValue {
    pub fn text(s: &str) -> Self {
        NodeValue::Text(s.to_string())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            NodeValue::Text(s) => s.is_empty(),
            NodeValue::List(items) => items.is_empty(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            NodeValue::Text(s) => Some(s.as_str()),
            NodeValue::List(_) => None,
        }
    }

    /// All comparison values (a text value is a one-element list)
    pub fn items(&self) -> Vec<&str> {
        match self {
            NodeValue::Text(s) => vec![s.as_str()],
            NodeValue::List(items) => items.iter().map(|s| s.as_str()).collect(),
        }
    }

    fn from_json(value: &Value) -> Self {
        match value {
            Value::Array(items) => NodeValue::List(items.iter().map(scalar_to_string).collect()),
            other => NodeValue::Text(scalar_to_string(other)),
        }
    }
}

impl Default for NodeValue {
    fn default() -> Self {
        NodeValue::Text(String::new())
    }
}

impl Serialize for NodeValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            NodeValue::Text(s) => serializer.serialize_str(s),
            NodeValue::List(items) => items.serialize(serializer),
        }
    }
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => if *b { "1".to_string() } else { String::new() },
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Boolean combinator of a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    And,
    Or,
}

impl Mode {
    fn from_json(value: Option<&Value>) -> Self {
        match value.and_then(Value::as_str) {
            Some(m) if m.eq_ignore_ascii_case("or") || m.eq_ignore_ascii_case("any") => Mode::Or,
            _ => Mode::And,
        }
    }
}

/// Leaf condition: `key operator value`
#[derive(Debug, Clone, PartialEq)]
pub struct FilterNode {
    pub id: String,
    pub key: Option<String>,
    pub operator: Operator,
    pub value: NodeValue,
    pub form_id: Option<i64>,
}

impl FilterNode {
    pub fn new(key: &str, operator: Operator, value: &str) -> Self {
        Self {
            id: generate_id(),
            key: Some(key.to_string()),
            operator,
            value: NodeValue::text(value),
            form_id: None,
        }
    }

    pub fn with_form(mut self, form_id: i64) -> Self {
        self.form_id = Some(form_id);
        self
    }

    /// Operator and value after resolving virtual operators to `is`/`isnot` with ""
    pub fn effective(&self) -> (Operator, NodeValue) {
        match self.operator.proxy_target() {
            Some(target) => (target, NodeValue::default()),
            None => (self.operator, self.value.clone()),
        }
    }

    /// Parse a stored node. Nodes with a missing key or an unknown operator
    /// are kept with `key = None` so augmentation drops them.
    pub fn from_json(value: &Value) -> Self {
        let key = match value.get("key") {
            Some(Value::String(k)) if !k.is_empty() => Some(k.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        };
        let operator_str = value.get("operator").and_then(Value::as_str).unwrap_or("is");
        let (key, operator) = match operator_str.parse::<Operator>() {
            Ok(op) => (key, op),
            Err(e) => {
                log::warn!("{}; condition ignored", e);
                (None, Operator::Is)
            }
        };
        let form_id = match value.get("form_id") {
            Some(Value::Number(n)) => n.as_i64(),
            Some(Value::String(s)) => s.parse().ok(),
            _ => None,
        };
        Self {
            id: json_id(value),
            key,
            operator,
            value: value.get("value").map(NodeValue::from_json).unwrap_or_default(),
            form_id,
        }
    }
}

impl Serialize for FilterNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("_id", &self.id)?;
        map.serialize_entry("key", &self.key)?;
        map.serialize_entry("operator", self.operator.as_str())?;
        map.serialize_entry("value", &self.value)?;
        if let Some(form_id) = self.form_id {
            map.serialize_entry("form_id", &form_id)?;
        }
        map.end()
    }
}

/// AND/OR group of conditions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterGroup {
    #[serde(rename = "_id")]
    pub id: String,
    pub mode: Mode,
    pub conditions: Vec<Condition>,
}

impl FilterGroup {
    pub fn new(mode: Mode, conditions: Vec<Condition>) -> Self {
        Self { id: generate_id(), mode, conditions }
    }

    pub fn from_json(value: &Value) -> Self {
        let conditions = value
            .get("conditions")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(Condition::from_json).collect())
            .unwrap_or_default();
        Self {
            id: json_id(value),
            mode: Mode::from_json(value.get("mode")),
            conditions,
        }
    }
}

/// A slot in the tree
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Node(FilterNode),
    Group(FilterGroup),
    Absent,
}

impl Condition {
    pub fn and(conditions: Vec<Condition>) -> Self {
        Condition::Group(FilterGroup::new(Mode::And, conditions))
    }

    pub fn or(conditions: Vec<Condition>) -> Self {
        Condition::Group(FilterGroup::new(Mode::Or, conditions))
    }

    pub fn node(key: &str, operator: Operator, value: &str) -> Self {
        Condition::Node(FilterNode::new(key, operator, value))
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Condition::Absent)
    }

    /// Parse one stored slot: an object with `conditions` is a group,
    /// any other object is a node, anything else is absent
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Object(map) if map.contains_key("conditions") => {
                Condition::Group(FilterGroup::from_json(value))
            }
            Value::Object(_) => Condition::Node(FilterNode::from_json(value)),
            _ => Condition::Absent,
        }
    }

    /// Storage shape of the tree; the root group carries `"version": 2`
    pub fn to_json(&self) -> Value {
        let mut value = serde_json::to_value(self).unwrap_or(Value::Null);
        if let (Condition::Group(_), Value::Object(map)) = (self, &mut value) {
            map.insert("version".to_string(), Value::from(2));
        }
        value
    }
}

impl Serialize for Condition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Condition::Node(node) => node.serialize(serializer),
            Condition::Group(group) => group.serialize(serializer),
            Condition::Absent => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for Condition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Condition::from_json(&value))
    }
}

/// The canonical condition that matches no entry
pub fn lock_filter() -> Condition {
    Condition::node("created_by", Operator::Is, LOCK_SENTINEL)
}

/// True for field-id keys such as "7" or "3.2" (not the any-field key "0")
pub fn is_field_key(key: &str) -> bool {
    key != ANY_FIELD_KEY
        && key.starts_with(|c: char| c.is_ascii_digit())
        && key.chars().all(|c| c.is_ascii_digit() || c == '.')
}

pub fn generate_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

fn json_id(value: &Value) -> String {
    match value.get("_id") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => generate_id(),
    }
}
