//! Entry query engine
//!
//! Builds boolean conditions over entry properties and entry meta, renders
//! them to SQLite SQL and runs entry listing queries.

pub mod condition;
pub mod entry_query;
pub mod sql;

pub use condition::{Cast, Column, QueryCondition, QueryValue, SqlOp};
pub use entry_query::EntryQuery;
pub use sql::{escape_like, SqlFragment};
