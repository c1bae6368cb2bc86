use std::{collections::BTreeMap, time::Duration};

use async_trait::async_trait;
use sqlx::{
    PgPool, Row as _,
    postgres::PgPoolOptions
};

use super::{DatabaseGateway, QueryResult, Row};
use crate::{
    config::DatabaseConfig,
    error::{AppResult, database_error},
    schema::{ForeignKey, TableDefinition}
};

const LIVE_TABLES_SQL: &str = r#"
    SELECT c.table_name::text AS table_name,
           array_agg(c.column_name::text ORDER BY c.ordinal_position) AS columns,
           obj_description(format('%I.%I', c.table_schema, c.table_name)::regclass, 'pg_class') AS comment
    FROM information_schema.columns c
    JOIN information_schema.tables t
      ON t.table_schema = c.table_schema AND t.table_name = c.table_name
    WHERE c.table_schema = $1 AND t.table_type = 'BASE TABLE'
    GROUP BY c.table_schema, c.table_name
    ORDER BY c.table_name
"#;

const FOREIGN_KEYS_SQL: &str = r#"
    SELECT tc.table_name::text   AS table_name,
           kcu.column_name::text AS column_name,
           ccu.table_name::text  AS foreign_table,
           ccu.column_name::text AS foreign_column
    FROM information_schema.table_constraints tc
    JOIN information_schema.key_column_usage kcu
      ON kcu.constraint_name = tc.constraint_name AND kcu.table_schema = tc.table_schema
    JOIN information_schema.constraint_column_usage ccu
      ON ccu.constraint_name = tc.constraint_name AND ccu.table_schema = tc.table_schema
    WHERE tc.constraint_type = 'FOREIGN KEY' AND tc.table_schema = $1
    ORDER BY tc.table_name, kcu.ordinal_position
"#;

/// Open a connection pool and check it with a trivial query
pub async fn connect_pool(config: &DatabaseConfig) -> AppResult<PgPool> {
    let url = config.connection_url()?;
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(url)
        .await
        .map_err(database_error)?;
    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .map_err(database_error)?;
    tracing::info!(max_connections = config.max_connections, "Connected to database");
    Ok(pool)
}

/// PostgreSQL gateway executing statements in read-only transactions.
pub struct PgDatabase {
    pool:                 PgPool,
    schema:               String,
    statement_timeout_ms: u64
}

impl PgDatabase {
    pub fn new(pool: PgPool, config: &DatabaseConfig) -> Self {
        Self {
            pool,
            schema: config.schema.clone(),
            statement_timeout_ms: config.statement_timeout_ms
        }
    }

    async fn run_read_only(&self, sql: &str) -> Result<String, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION READ ONLY")
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!(
            "SET LOCAL statement_timeout = {}",
            self.statement_timeout_ms
        ))
        .execute(&mut *tx)
        .await?;
        let json: String = sqlx::query_scalar(&wrap_as_json(sql))
            .fetch_one(&mut *tx)
            .await?;
        tx.rollback().await?;
        Ok(json)
    }
}

/// Wrap a statement so the database returns its rows as one JSON array
pub fn wrap_as_json(sql: &str) -> String {
    let statement = sql.trim().trim_end_matches(';').trim_end();
    format!(
        "SELECT COALESCE(json_agg(q), '[]'::json)::text FROM ({}\n) AS q",
        statement
    )
}

#[async_trait]
impl DatabaseGateway for PgDatabase {
    async fn execute(&self, sql: &str) -> AppResult<QueryResult> {
        match self.run_read_only(sql).await {
            Ok(json) => {
                let rows: Vec<Row> = serde_json::from_str(&json).map_err(|e| {
                    crate::error::AppError::internal(format!("Malformed result rows: {}", e))
                })?;
                tracing::debug!(rows = rows.len(), "Query executed");
                Ok(QueryResult::from_rows(rows))
            }
            Err(sqlx::Error::Database(db)) => {
                tracing::warn!(error = db.message(), "Database rejected query");
                Ok(QueryResult::failed(db.message()))
            }
            Err(e) => Err(database_error(e))
        }
    }

    async fn live_schema(&self) -> AppResult<Vec<TableDefinition>> {
        let table_rows = sqlx::query(LIVE_TABLES_SQL)
            .bind(&self.schema)
            .fetch_all(&self.pool)
            .await
            .map_err(database_error)?;
        let fk_rows = sqlx::query(FOREIGN_KEYS_SQL)
            .bind(&self.schema)
            .fetch_all(&self.pool)
            .await
            .map_err(database_error)?;

        let mut foreign_keys: BTreeMap<String, Vec<ForeignKey>> = BTreeMap::new();
        for row in fk_rows {
            let table: String = row.try_get("table_name").map_err(database_error)?;
            foreign_keys.entry(table).or_default().push(ForeignKey {
                column:         row.try_get("column_name").map_err(database_error)?,
                foreign_table:  row.try_get("foreign_table").map_err(database_error)?,
                foreign_column: row.try_get("foreign_column").map_err(database_error)?
            });
        }

        table_rows
            .into_iter()
            .map(|row| {
                let name: String = row.try_get("table_name").map_err(database_error)?;
                Ok(TableDefinition {
                    columns:      row
                        .try_get::<Option<Vec<String>>, _>("columns")
                        .map_err(database_error)?
                        .unwrap_or_default(),
                    comment:      row
                        .try_get::<Option<String>, _>("comment")
                        .map_err(database_error)?,
                    foreign_keys: foreign_keys.remove(&name).unwrap_or_default(),
                    name
                })
            })
            .collect()
    }
}
