use crate::models::Entry;
use crate::query::condition::QueryCondition;
use crate::query::sql::SqlFragment;
use crate::repo::EntryRepo;
use anyhow::{Context, Result};
use rusqlite::types::Value as SqlValue;
use rusqlite::Connection;

/// In-progress entry listing query
#[derive(Debug, Clone, PartialEq)]
pub struct EntryQuery {
    pub form_id: i64,
    pub status: String,
    pub where_clause: Option<QueryCondition>,
    pub limit: Option<usize>,
}

impl EntryQuery {
    /// Active entries of a form
    pub fn new(form_id: i64) -> Self {
        Self {
            form_id,
            status: "active".to_string(),
            where_clause: None,
            limit: None,
        }
    }

    /// Merge a condition into the WHERE clause with logical AND
    pub fn and_where(&mut self, condition: QueryCondition) {
        self.where_clause = Some(match self.where_clause.take() {
            None => condition,
            Some(QueryCondition::And(mut existing)) => {
                existing.push(condition);
                QueryCondition::And(existing)
            }
            Some(existing) => QueryCondition::And(vec![existing, condition]),
        });
    }

    /// Full SELECT statement for the matching entry ids
    pub fn to_sql(&self) -> SqlFragment {
        let mut sql = String::from("SELECT e.id FROM entries e WHERE e.form_id = ? AND e.status = ?");
        let mut params = vec![SqlValue::Integer(self.form_id), SqlValue::Text(self.status.clone())];

        if let Some(condition) = &self.where_clause {
            let fragment = condition.to_sql();
            sql.push_str(" AND ");
            sql.push_str(&fragment.sql);
            params.extend(fragment.params);
        }

        sql.push_str(" ORDER BY e.id");
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        SqlFragment { sql, params }
    }

    /// Run the query and load the matching entries
    pub fn execute(&self, conn: &Connection) -> Result<Vec<Entry>> {
        let fragment = self.to_sql();
        log::debug!("Entry query: {} {:?}", fragment.sql, fragment.params);

        let mut stmt = conn.prepare(&fragment.sql)
            .with_context(|| format!("Failed to prepare entry query: {}", fragment.sql))?;
        let ids = stmt.query_map(rusqlite::params_from_iter(fragment.params.iter()), |row| row.get::<_, i64>(0))?;

        let mut entries = Vec::new();
        for id in ids {
            if let Some(entry) = EntryRepo::get_by_id(conn, id?)? {
                entries.push(entry);
            }
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::condition::{Column, QueryValue, SqlOp};

    fn cond(key: &str, value: &str) -> QueryCondition {
        QueryCondition::compare(Column::for_key(key, None), SqlOp::Eq, QueryValue::text(value))
    }

    #[test]
    fn test_and_where_merges_conditions() {
        let mut query = EntryQuery::new(1);
        query.and_where(cond("created_by", "1"));
        assert_eq!(query.where_clause, Some(cond("created_by", "1")));

        query.and_where(cond("status", "active"));
        query.and_where(cond("ip", "127.0.0.1"));
        match &query.where_clause {
            Some(QueryCondition::And(children)) => assert_eq!(children.len(), 3),
            other => panic!("Expected And, got {:?}", other),
        }
    }

    #[test]
    fn test_to_sql_without_filter() {
        let mut query = EntryQuery::new(4);
        query.limit = Some(10);
        let fragment = query.to_sql();
        assert_eq!(
            fragment.sql,
            "SELECT e.id FROM entries e WHERE e.form_id = ? AND e.status = ? ORDER BY e.id LIMIT 10"
        );
        assert_eq!(fragment.params.len(), 2);
    }

    #[test]
    fn test_to_sql_with_filter() {
        let mut query = EntryQuery::new(4);
        query.and_where(cond("created_by", "9"));
        let fragment = query.to_sql();
        assert!(fragment.sql.contains("AND e.created_by = ?"));
        assert_eq!(fragment.params.len(), 3);
    }
}
