use async_trait::async_trait;
use sqlx::{PgPool, Row};

use super::{CatalogStore, TableDescriptor};
use crate::error::{AppResult, database_error};

/// Catalog store backed by the `bot_table_metadata` table.
pub struct PgCatalogStore {
    pool: PgPool
}

impl PgCatalogStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool
        }
    }

    /// Create the metadata table if it does not exist yet
    pub async fn ensure_table(&self) -> AppResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS bot_table_metadata (
                table_name     TEXT PRIMARY KEY,
                description    TEXT NOT NULL DEFAULT '',
                keywords       TEXT[] NOT NULL DEFAULT '{}',
                sample_columns TEXT[] NOT NULL DEFAULT '{}',
                relationships  TEXT[] NOT NULL DEFAULT '{}',
                updated_at     TIMESTAMPTZ NOT NULL DEFAULT now()
            )
            "#
        )
        .execute(&self.pool)
        .await
        .map_err(database_error)?;
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    async fn indexed_table_names(&self) -> AppResult<Vec<String>> {
        sqlx::query_scalar::<_, String>("SELECT table_name FROM bot_table_metadata")
            .fetch_all(&self.pool)
            .await
            .map_err(database_error)
    }

    async fn upsert(&self, descriptors: &[TableDescriptor]) -> AppResult<()> {
        let mut tx = self.pool.begin().await.map_err(database_error)?;
        for descriptor in descriptors {
            sqlx::query(
                r#"
                INSERT INTO bot_table_metadata
                    (table_name, description, keywords, sample_columns, relationships, updated_at)
                VALUES ($1, $2, $3, $4, $5, now())
                ON CONFLICT (table_name) DO UPDATE SET
                    description    = EXCLUDED.description,
                    keywords       = EXCLUDED.keywords,
                    sample_columns = EXCLUDED.sample_columns,
                    relationships  = EXCLUDED.relationships,
                    updated_at     = EXCLUDED.updated_at
                "#
            )
            .bind(&descriptor.name)
            .bind(&descriptor.description)
            .bind(&descriptor.keywords)
            .bind(&descriptor.sample_columns)
            .bind(&descriptor.relationships)
            .execute(&mut *tx)
            .await
            .map_err(database_error)?;
        }
        tx.commit().await.map_err(database_error)?;
        tracing::info!(count = descriptors.len(), "Saved table descriptors");
        Ok(())
    }

    async fn list_all(&self) -> AppResult<Vec<TableDescriptor>> {
        let rows = sqlx::query(
            r#"
            SELECT table_name, description, keywords, sample_columns, relationships
            FROM bot_table_metadata
            ORDER BY table_name
            "#
        )
        .fetch_all(&self.pool)
        .await
        .map_err(database_error)?;

        rows.into_iter()
            .map(|row| {
                Ok(TableDescriptor {
                    name:           row.try_get("table_name").map_err(database_error)?,
                    description:    row
                        .try_get::<Option<String>, _>("description")
                        .map_err(database_error)?
                        .unwrap_or_default(),
                    keywords:       row
                        .try_get::<Option<Vec<String>>, _>("keywords")
                        .map_err(database_error)?
                        .unwrap_or_default(),
                    sample_columns: row
                        .try_get::<Option<Vec<String>>, _>("sample_columns")
                        .map_err(database_error)?
                        .unwrap_or_default(),
                    relationships:  row
                        .try_get::<Option<Vec<String>>, _>("relationships")
                        .map_err(database_error)?
                        .unwrap_or_default()
                })
            })
            .collect()
    }
}
