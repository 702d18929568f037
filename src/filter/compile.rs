//! Translation of a pruned tree into entry query conditions
//!
//! Each node goes through the query engine's per-field builder
//! ([`QueryCondition::for_field`]). Field-id keys get three extra rules:
//!
//! - an empty comparison value becomes an existence check on the meta row
//!   (plus "no row at all" for `=`), since number fields cast "" to 0
//! - a negative comparison also matches entries with no row for the field
//!   (exact key or any `id.N` sub-input), except against the empty upload
//!   list `"[]"`
//! - `total` fields compare as decimals under `>` and `<`

use crate::filter::tree::{is_field_key, Condition, FilterNode, Mode, NodeValue, Operator, ANY_FIELD_KEY};
use crate::models::{Field, FieldType, Form};
use crate::query::{escape_like, Cast, Column, QueryCondition, QueryValue, SqlOp};
use crate::utils::date::SQL_FORMAT;
use chrono::{Duration, NaiveDateTime};

/// Compile a tree; `None` when nothing in it applies
pub fn compile(condition: &Condition, forms: &[Form]) -> Option<QueryCondition> {
    match condition {
        Condition::Absent => None,
        Condition::Group(group) => {
            let children: Vec<QueryCondition> = group
                .conditions
                .iter()
                .filter_map(|c| compile(c, forms))
                .collect();
            if children.is_empty() {
                return None;
            }
            Some(match group.mode {
                Mode::And => QueryCondition::and(children),
                Mode::Or => QueryCondition::or(children),
            })
        }
        Condition::Node(node) => compile_node(node, forms),
    }
}

fn compile_node(node: &FilterNode, forms: &[Form]) -> Option<QueryCondition> {
    let key = node.key.as_deref()?;
    let (operator, value) = node.effective();
    let (op, query_value) = translate(operator, &value);

    if key == ANY_FIELD_KEY {
        return Some(QueryCondition::compare(Column::AnyField { form_id: node.form_id }, op, query_value));
    }
    if !is_field_key(key) {
        return Some(QueryCondition::for_field(Column::for_key(key, node.form_id), None, op, query_value));
    }

    let Some(field) = find_field(forms, key, node.form_id) else {
        log::debug!("No field '{}' in the view's forms; condition not applied", key);
        return None;
    };

    if value.as_text() == Some("") && matches!(op, SqlOp::Eq | SqlOp::Neq | SqlOp::Gt | SqlOp::Lt) {
        let exists = QueryCondition::meta_exists(key, node.form_id, Some((op, QueryValue::text(""))));
        return Some(if op == SqlOp::Eq {
            QueryCondition::or(vec![exists, QueryCondition::meta_absent(key, node.form_id, false)])
        } else {
            exists
        });
    }

    let column = Column::Meta { key: key.to_string(), form_id: node.form_id };
    let mut condition = QueryCondition::for_field(column, Some(&field.field_type), op, query_value);
    if field.field_type == FieldType::Total && matches!(op, SqlOp::Gt | SqlOp::Lt) {
        condition = condition.with_cast(Cast::Decimal);
    }
    // "[]" stands in for an empty upload list; a missing row is not a filled list
    let empty_uploads = field.field_type == FieldType::Fileupload && value.as_text() == Some("[]");
    if op.is_negative() && !value.is_empty() && !empty_uploads {
        condition = QueryCondition::or(vec![condition, QueryCondition::meta_absent(key, node.form_id, true)]);
    }
    Some(condition)
}

fn find_field<'a>(forms: &'a [Form], key: &str, form_id: Option<i64>) -> Option<&'a Field> {
    match form_id {
        Some(id) => forms.iter().find(|f| f.id == id)?.field(key),
        None => forms.iter().find_map(|f| f.field(key)),
    }
}

/// Host operator and value for a (non-virtual) filter operator
fn translate(operator: Operator, value: &NodeValue) -> (SqlOp, QueryValue) {
    let text = value.items().first().map(|s| s.to_string()).unwrap_or_default();
    let list = || QueryValue::List(value.items().into_iter().map(str::to_string).collect());

    match operator {
        Operator::Is => match value {
            NodeValue::List(_) => (SqlOp::In, list()),
            NodeValue::Text(_) => (SqlOp::Eq, QueryValue::Text(text)),
        },
        Operator::IsNot => match value {
            NodeValue::List(_) => (SqlOp::NotIn, list()),
            NodeValue::Text(_) => (SqlOp::Neq, QueryValue::Text(text)),
        },
        Operator::Gt | Operator::After => (SqlOp::Gt, QueryValue::Text(text)),
        Operator::Lt | Operator::Before => (SqlOp::Lt, QueryValue::Text(text)),
        Operator::Contains => (SqlOp::Like, QueryValue::Text(format!("%{}%", escape_like(&text)))),
        Operator::DoesNotContain => (SqlOp::NotLike, QueryValue::Text(format!("%{}%", escape_like(&text)))),
        Operator::StartsWith => (SqlOp::Like, QueryValue::Text(format!("{}%", escape_like(&text)))),
        Operator::EndsWith => (SqlOp::Like, QueryValue::Text(format!("%{}", escape_like(&text)))),
        Operator::On | Operator::NotOn => {
            let negative = operator == Operator::NotOn;
            match day_range(&text) {
                Some(range) => (if negative { SqlOp::NotBetween } else { SqlOp::Between }, QueryValue::List(range)),
                None => (if negative { SqlOp::Neq } else { SqlOp::Eq }, QueryValue::Text(text)),
            }
        }
        Operator::In => (SqlOp::In, list()),
        Operator::NotIn => (SqlOp::NotIn, list()),
        Operator::IsEmpty => (SqlOp::Eq, QueryValue::text("")),
        Operator::IsNotEmpty => (SqlOp::Neq, QueryValue::text("")),
    }
}

/// `[start, start + 23:59:59]` for a full SQL datetime
fn day_range(value: &str) -> Option<Vec<String>> {
    let start = NaiveDateTime::parse_from_str(value, SQL_FORMAT).ok()?;
    let end = start.checked_add_signed(Duration::seconds(86399))?;
    Some(vec![value.to_string(), end.format(SQL_FORMAT).to_string()])
}
