// SQL rendering of query conditions (SQLite dialect, entries aliased as `e`)

use crate::models::is_entry_property;
use crate::query::condition::{Cast, Column, QueryCondition, QueryValue, SqlOp};
use rusqlite::types::Value as SqlValue;

/// A rendered WHERE fragment and its positional parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SqlFragment {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

/// Escape LIKE wildcards; patterns are rendered with `ESCAPE '\'`
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl QueryCondition {
    pub fn to_sql(&self) -> SqlFragment {
        let mut fragment = SqlFragment::default();
        fragment.push_condition(self);
        fragment
    }
}

impl SqlFragment {
    fn push_condition(&mut self, condition: &QueryCondition) {
        match condition {
            QueryCondition::And(children) => self.push_group(children, " AND ", "1=1"),
            QueryCondition::Or(children) => self.push_group(children, " OR ", "1=0"),
            QueryCondition::Compare { column, op, value, cast } => self.push_compare(column, *op, value, *cast),
            QueryCondition::MetaExists { key, form_id, test } => {
                self.sql.push_str("EXISTS (SELECT 1 FROM entry_meta m WHERE m.entry_id = e.id AND m.meta_key = ?");
                self.params.push(SqlValue::Text(key.clone()));
                self.push_form_scope(*form_id);
                if let Some((op, value)) = test {
                    self.sql.push_str(" AND ");
                    self.push_comparison("m.meta_value", *op, value, None);
                }
                self.sql.push(')');
            }
            QueryCondition::MetaAbsent { key, form_id, match_prefix } => {
                self.sql.push_str("NOT EXISTS (SELECT 1 FROM entry_meta m WHERE m.entry_id = e.id");
                self.push_form_scope(*form_id);
                if *match_prefix {
                    self.sql.push_str(" AND (m.meta_key = ? OR m.meta_key LIKE ? ESCAPE '\\')");
                    self.params.push(SqlValue::Text(key.clone()));
                    self.params.push(SqlValue::Text(format!("{}.%", escape_like(key))));
                } else {
                    self.sql.push_str(" AND m.meta_key = ?");
                    self.params.push(SqlValue::Text(key.clone()));
                }
                self.sql.push(')');
            }
        }
    }

    fn push_group(&mut self, children: &[QueryCondition], separator: &str, empty: &str) {
        if children.is_empty() {
            self.sql.push_str(empty);
            return;
        }
        self.sql.push('(');
        for (i, child) in children.iter().enumerate() {
            if i > 0 {
                self.sql.push_str(separator);
            }
            self.push_condition(child);
        }
        self.sql.push(')');
    }

    fn push_compare(&mut self, column: &Column, op: SqlOp, value: &QueryValue, cast: Option<Cast>) {
        match column {
            Column::Property(name) => {
                if !is_entry_property(name) {
                    // Not a column of the entries table
                    self.sql.push_str("1=0");
                    return;
                }
                self.push_comparison(&format!("e.{}", name), op, value, cast);
            }
            Column::Meta { key, form_id } => {
                self.sql.push_str("EXISTS (SELECT 1 FROM entry_meta m WHERE m.entry_id = e.id AND m.meta_key = ?");
                self.params.push(SqlValue::Text(key.clone()));
                self.push_form_scope(*form_id);
                self.sql.push_str(" AND ");
                self.push_comparison("m.meta_value", op, value, cast);
                self.sql.push(')');
            }
            Column::AnyField { form_id } => {
                self.sql.push_str("EXISTS (SELECT 1 FROM entry_meta m WHERE m.entry_id = e.id");
                self.push_form_scope(*form_id);
                self.sql.push_str(" AND ");
                self.push_comparison("m.meta_value", op, value, cast);
                self.sql.push(')');
            }
        }
    }

    fn push_form_scope(&mut self, form_id: Option<i64>) {
        if let Some(form_id) = form_id {
            self.sql.push_str(" AND m.form_id = ?");
            self.params.push(SqlValue::Integer(form_id));
        }
    }

    fn push_comparison(&mut self, lhs: &str, op: SqlOp, value: &QueryValue, cast: Option<Cast>) {
        let lhs = match cast {
            Some(Cast::Decimal) => format!("CAST({} AS REAL)", lhs),
            None => lhs.to_string(),
        };

        match (op, value) {
            (SqlOp::In | SqlOp::NotIn, QueryValue::List(items)) if items.is_empty() => {
                self.sql.push_str(if op == SqlOp::In { "0" } else { "1" });
            }
            (SqlOp::In | SqlOp::NotIn, _) => {
                let items = value_items(value);
                let placeholders = vec!["?"; items.len()].join(", ");
                self.sql.push_str(&format!("{} {} ({})", lhs, op.as_sql(), placeholders));
                for item in &items {
                    self.params.push(bind(item, cast));
                }
            }
            (SqlOp::Between | SqlOp::NotBetween, QueryValue::List(items)) if items.len() == 2 => {
                self.sql.push_str(&format!("{} {} ? AND ?", lhs, op.as_sql()));
                self.params.push(bind(&items[0], cast));
                self.params.push(bind(&items[1], cast));
            }
            (SqlOp::Between | SqlOp::NotBetween, _) => {
                // A range needs two bounds
                self.sql.push_str("1=0");
            }
            (SqlOp::Like | SqlOp::NotLike, _) => {
                self.sql.push_str(&format!("{} {} ? ESCAPE '\\'", lhs, op.as_sql()));
                self.params.push(SqlValue::Text(value_items(value).first().cloned().unwrap_or_default()));
            }
            _ => {
                self.sql.push_str(&format!("{} {} ?", lhs, op.as_sql()));
                self.params.push(bind(value_items(value).first().map(String::as_str).unwrap_or(""), cast));
            }
        }
    }
}

fn value_items(value: &QueryValue) -> Vec<String> {
    match value {
        QueryValue::Text(s) => vec![s.clone()],
        QueryValue::List(items) => items.clone(),
    }
}

fn bind(value: &str, cast: Option<Cast>) -> SqlValue {
    match cast {
        Some(Cast::Decimal) => value
            .trim()
            .parse::<f64>()
            .map(SqlValue::Real)
            .unwrap_or_else(|_| SqlValue::Real(0.0)),
        None => SqlValue::Text(value.to_string()),
    }
}
