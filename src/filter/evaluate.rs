//! In-memory evaluation of a pruned tree against one entry
//!
//! Used for field visibility, where the entry is already loaded and no
//! query runs. A node whose field id is unknown to the form is not applied:
//! it is left out of its group's results instead of counting as a failure.

use crate::filter::augment::WORKFLOW_TIMESTAMP_KEY;
use crate::filter::tree::{is_field_key, Condition, FilterNode, Mode, NodeValue, Operator, ANY_FIELD_KEY};
use crate::models::{is_date_property, Entry, Field, FieldType, Form};
use crate::utils::matching::{matches_date, matches_operation};

/// Whether `entry` satisfies the tree; an absent tree is satisfied
pub fn evaluate(condition: &Condition, entry: &Entry, form: &Form) -> bool {
    evaluate_condition(condition, entry, form).unwrap_or(true)
}

/// `None` when the condition does not apply to this entry's form
fn evaluate_condition(condition: &Condition, entry: &Entry, form: &Form) -> Option<bool> {
    match condition {
        Condition::Absent => None,
        Condition::Node(node) => evaluate_node(node, entry, form),
        Condition::Group(group) => {
            let results: Vec<bool> = group
                .conditions
                .iter()
                .filter_map(|c| evaluate_condition(c, entry, form))
                .collect();
            Some(match group.mode {
                Mode::And => !results.contains(&false),
                Mode::Or => results.contains(&true),
            })
        }
    }
}

fn evaluate_node(node: &FilterNode, entry: &Entry, form: &Form) -> Option<bool> {
    let key = node.key.as_deref()?;
    let (operator, value) = node.effective();

    if key == ANY_FIELD_KEY {
        return Some(matches_any_field(entry, form, operator, &value));
    }

    let field = form.field(key);
    if field.is_none() && is_field_key(key) {
        log::debug!("Form {} has no field '{}'; condition not applied", form.id, key);
        return None;
    }

    let actual = match field {
        Some(field) => field_value(entry, field, key, &value),
        None => entry.get(key).unwrap_or_default(),
    };

    let date_like = field.map(Field::is_date).unwrap_or(false)
        || is_date_property(key)
        || key == WORKFLOW_TIMESTAMP_KEY;
    Some(if date_like {
        matches_date(&actual, operator, &value)
    } else {
        matches_operation(&actual, operator, &value)
    })
}

/// Stored value of a field for comparison against `value`
fn field_value(entry: &Entry, field: &Field, key: &str, value: &NodeValue) -> String {
    let mut stored_key = key.to_string();

    // Choice fields with one sub-input per choice store a checked choice under "<id>.<n>"
    if !key.contains('.') && !field.inputs.is_empty() {
        if let Some(expected) = value.as_text() {
            let position = field
                .choices
                .iter()
                .position(|c| c.text.eq_ignore_ascii_case(expected) || c.stored_value().eq_ignore_ascii_case(expected));
            if let Some(input) = position.and_then(|i| field.inputs.get(i)) {
                stored_key = input.id.clone();
            }
        }
    }

    let actual = entry.get(&stored_key).unwrap_or_default();
    if field.field_type == FieldType::Fileupload && actual.trim() == "[]" {
        return String::new();
    }
    actual
}

fn matches_any_field(entry: &Entry, form: &Form, operator: Operator, value: &NodeValue) -> bool {
    form.fields.iter().any(|field| {
        let keys = std::iter::once(field.id.to_string()).chain(field.inputs.iter().map(|i| i.id.clone()));
        keys.filter_map(|k| entry.get(&k)).any(|actual| {
            if field.is_date() {
                matches_date(&actual, operator, value)
            } else {
                matches_operation(&actual, operator, value)
            }
        })
    })
}
