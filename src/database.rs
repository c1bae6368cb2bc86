//! Database collaborator.
//!
//! Runs SQL that already passed the [`crate::validator`] gate and exposes
//! live schema introspection for the indexing job. The PostgreSQL
//! implementation lives in [`PgDatabase`].

mod postgres;

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::Serialize;

pub use postgres::{PgDatabase, connect_pool};

use crate::{error::AppResult, schema::TableDefinition};

/// One result row, columns in select-list order
pub type Row = IndexMap<String, serde_json::Value>;

/// Outcome of executing a statement.
///
/// A statement the database refuses is reported through `error`, with no
/// rows; `Err` from [`DatabaseGateway::execute`] is reserved for failures to
/// reach the database at all.
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueryResult {
    pub rows:      Vec<Row>,
    pub row_count: usize,
    pub error:     Option<String>
}

impl QueryResult {
    pub fn from_rows(rows: Vec<Row>) -> Self {
        let row_count = rows.len();
        Self {
            rows,
            row_count,
            error: None
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            rows:      Vec::new(),
            row_count: 0,
            error:     Some(message.into())
        }
    }
}

#[async_trait]
pub trait DatabaseGateway: Send + Sync {
    /// Execute a validated, read-only statement
    async fn execute(&self, sql: &str) -> AppResult<QueryResult>;

    /// Tables currently present in the database
    async fn live_schema(&self) -> AppResult<Vec<TableDefinition>>;
}
