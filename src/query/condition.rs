//! Boolean condition objects of the entry query engine
//!
//! Conditions are built through the constructors below and rendered to SQL
//! by [`QueryCondition::to_sql`](crate::query::sql). Field values live in
//! `entry_meta` rows, so a field comparison is an `EXISTS` over that table;
//! an entry without a row for a field never satisfies a field comparison.

use crate::models::{is_entry_property, FieldType};

/// What a comparison reads
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// Column of the entries table (`created_by`, `date_created`, ...)
    Property(String),
    /// Value of a meta row (field id such as "7" / "3.2", or meta key such as "is_approved")
    Meta { key: String, form_id: Option<i64> },
    /// Value of any meta row of the entry
    AnyField { form_id: Option<i64> },
}

impl Column {
    /// Column for a filter key: entry properties map to columns, everything else to meta
    pub fn for_key(key: &str, form_id: Option<i64>) -> Self {
        if is_entry_property(key) {
            Column::Property(key.to_string())
        } else {
            Column::Meta { key: key.to_string(), form_id }
        }
    }
}

/// SQL comparison operators understood by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlOp {
    Eq,
    Neq,
    Gt,
    Lt,
    Like,
    NotLike,
    Between,
    NotBetween,
    In,
    NotIn,
}

impl SqlOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SqlOp::Eq => "=",
            SqlOp::Neq => "!=",
            SqlOp::Gt => ">",
            SqlOp::Lt => "<",
            SqlOp::Like => "LIKE",
            SqlOp::NotLike => "NOT LIKE",
            SqlOp::Between => "BETWEEN",
            SqlOp::NotBetween => "NOT BETWEEN",
            SqlOp::In => "IN",
            SqlOp::NotIn => "NOT IN",
        }
    }

    pub fn is_negative(&self) -> bool {
        matches!(self, SqlOp::Neq | SqlOp::NotLike | SqlOp::NotBetween | SqlOp::NotIn)
    }
}

/// Right-hand side of a comparison
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Text(String),
    List(Vec<String>),
}

impl QueryValue {
    pub fn text(s: &str) -> Self {
        QueryValue::Text(s.to_string())
    }

    pub fn is_empty_text(&self) -> bool {
        matches!(self, QueryValue::Text(s) if s.is_empty())
    }
}

/// Type the stored value is cast to before comparing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cast {
    Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryCondition {
    And(Vec<QueryCondition>),
    Or(Vec<QueryCondition>),
    Compare {
        column: Column,
        op: SqlOp,
        value: QueryValue,
        cast: Option<Cast>,
    },
    /// A meta row for `key` exists, optionally with a text comparison on its value
    MetaExists {
        key: String,
        form_id: Option<i64>,
        test: Option<(SqlOp, QueryValue)>,
    },
    /// No meta row for `key` exists; with `match_prefix`, none for its sub-inputs (`key.N`) either
    MetaAbsent {
        key: String,
        form_id: Option<i64>,
        match_prefix: bool,
    },
}

impl QueryCondition {
    /// Conjunction; a single condition is returned as-is
    pub fn and(mut conditions: Vec<QueryCondition>) -> Self {
        if conditions.len() == 1 {
            return conditions.remove(0);
        }
        QueryCondition::And(conditions)
    }

    /// Disjunction; a single condition is returned as-is
    pub fn or(mut conditions: Vec<QueryCondition>) -> Self {
        if conditions.len() == 1 {
            return conditions.remove(0);
        }
        QueryCondition::Or(conditions)
    }

    pub fn compare(column: Column, op: SqlOp, value: QueryValue) -> Self {
        QueryCondition::Compare { column, op, value, cast: None }
    }

    /// Per-field condition builder. Number fields are compared as decimals
    /// for `=`, `!=`, `>` and `<`; every other type compares text.
    pub fn for_field(column: Column, field_type: Option<&FieldType>, op: SqlOp, value: QueryValue) -> Self {
        let numeric = field_type == Some(&FieldType::Number)
            && matches!(op, SqlOp::Eq | SqlOp::Neq | SqlOp::Gt | SqlOp::Lt);
        let condition = Self::compare(column, op, value);
        if numeric {
            condition.with_cast(Cast::Decimal)
        } else {
            condition
        }
    }

    /// Force a cast on a comparison; other conditions are unchanged
    pub fn with_cast(self, new_cast: Cast) -> Self {
        match self {
            QueryCondition::Compare { column, op, value, .. } => {
                QueryCondition::Compare { column, op, value, cast: Some(new_cast) }
            }
            other => other,
        }
    }

    pub fn meta_exists(key: &str, form_id: Option<i64>, test: Option<(SqlOp, QueryValue)>) -> Self {
        QueryCondition::MetaExists { key: key.to_string(), form_id, test }
    }

    pub fn meta_absent(key: &str, form_id: Option<i64>, match_prefix: bool) -> Self {
        QueryCondition::MetaAbsent { key: key.to_string(), form_id, match_prefix }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_for_key() {
        assert_eq!(Column::for_key("created_by", Some(2)), Column::Property("created_by".to_string()));
        assert_eq!(
            Column::for_key("7", Some(2)),
            Column::Meta { key: "7".to_string(), form_id: Some(2) }
        );
        assert_eq!(
            Column::for_key("is_approved", None),
            Column::Meta { key: "is_approved".to_string(), form_id: None }
        );
    }

    #[test]
    fn test_single_child_combinators_collapse() {
        let c = QueryCondition::compare(Column::for_key("7", None), SqlOp::Eq, QueryValue::text("a"));
        assert_eq!(QueryCondition::and(vec![c.clone()]), c);
        assert_eq!(QueryCondition::or(vec![c.clone()]), c);
        assert!(matches!(QueryCondition::and(vec![c.clone(), c]), QueryCondition::And(v) if v.len() == 2));
    }

    #[test]
    fn test_numeric_fields_cast_for_comparisons() {
        let number = FieldType::Number;
        let c = QueryCondition::for_field(Column::for_key("7", None), Some(&number), SqlOp::Gt, QueryValue::text("3"));
        assert!(matches!(c, QueryCondition::Compare { cast: Some(Cast::Decimal), .. }));

        let c = QueryCondition::for_field(Column::for_key("7", None), Some(&number), SqlOp::Like, QueryValue::text("%3%"));
        assert!(matches!(c, QueryCondition::Compare { cast: None, .. }));

        let total = FieldType::Total;
        let c = QueryCondition::for_field(Column::for_key("7", None), Some(&total), SqlOp::Gt, QueryValue::text("3"));
        assert!(matches!(c, QueryCondition::Compare { cast: None, .. }));
    }
}
