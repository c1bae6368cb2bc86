//! Batch job that describes not-yet-catalogued tables.

use std::{collections::HashSet, sync::Arc};

use tokio::sync::Mutex;

use crate::{
    app::types::IndexReport,
    catalog::{CatalogStore, TableDescriptor, parse_description},
    config::IndexerConfig,
    database::DatabaseGateway,
    error::AppResult,
    llm::{LanguageModel, PromptRequest},
    schema::TableDefinition
};

const DESCRIBE_CONTEXT: &str = "Professional Data Analyst Training Mode.";

/// Describes a bounded batch of tables per run to stay within timeouts and
/// language-model rate limits. Run it repeatedly until nothing remains.
///
/// A table whose description failed is not offered again by the same job, so
/// repeated runs move on to the tables behind it. A new job retries it.
pub struct IndexDatabase {
    llm:             Arc<dyn LanguageModel>,
    database:        Arc<dyn DatabaseGateway>,
    catalog:         Arc<dyn CatalogStore>,
    batch_size:      usize,
    excluded_tables: HashSet<String>,
    failed_tables:   Mutex<HashSet<String>>
}

impl IndexDatabase {
    pub fn new(
        llm: Arc<dyn LanguageModel>,
        database: Arc<dyn DatabaseGateway>,
        catalog: Arc<dyn CatalogStore>,
        config: &IndexerConfig
    ) -> Self {
        Self {
            llm,
            database,
            catalog,
            batch_size: config.batch_size.max(1),
            excluded_tables: config.excluded_tables.iter().cloned().collect(),
            failed_tables: Mutex::new(HashSet::new())
        }
    }

    pub async fn execute(&self) -> AppResult<IndexReport> {
        let live_tables = self.database.live_schema().await?;
        let indexed: HashSet<String> = self
            .catalog
            .indexed_table_names()
            .await?
            .into_iter()
            .collect();

        let pending: Vec<&TableDefinition> = live_tables
            .iter()
            .filter(|t| !indexed.contains(&t.name) && !self.excluded_tables.contains(&t.name))
            .collect();
        if pending.is_empty() {
            tracing::info!("All tables are already indexed");
            return Ok(IndexReport::default());
        }

        let mut failed_tables = self.failed_tables.lock().await;
        let candidates: Vec<&TableDefinition> = pending
            .iter()
            .copied()
            .filter(|t| !failed_tables.contains(&t.name))
            .collect();
        if candidates.is_empty() {
            tracing::warn!(
                remaining = pending.len(),
                "Only tables that already failed in this job remain"
            );
            return Ok(IndexReport {
                remaining: pending.len(),
                ..IndexReport::default()
            });
        }

        let batch = &candidates[..candidates.len().min(self.batch_size)];
        tracing::info!(
            batch = batch.len(),
            remaining = pending.len() - batch.len(),
            "Indexing batch"
        );

        let mut descriptors = Vec::with_capacity(batch.len());
        for table in batch {
            match self.describe(table).await {
                Ok(descriptor) => descriptors.push(descriptor),
                Err(e) => {
                    tracing::warn!(table = %table.name, error = %e, "Failed to describe table");
                    failed_tables.insert(table.name.clone());
                }
            }
        }

        if !descriptors.is_empty() {
            self.catalog.upsert(&descriptors).await?;
        }

        Ok(IndexReport {
            trained:   descriptors.len(),
            failed:    batch.len() - descriptors.len(),
            remaining: pending.len() - descriptors.len()
        })
    }

    /// Ask the language model to describe one table
    pub async fn describe(&self, table: &TableDefinition) -> AppResult<TableDescriptor> {
        tracing::debug!(table = %table.name, "Describing table");
        let request = PromptRequest::new(DESCRIBE_CONTEXT, describe_question(table));
        let completion = self.llm.complete(&request).await?;
        parse_description(table, &completion.text)
    }
}

fn describe_question(table: &TableDefinition) -> String {
    let mut question = format!(
        "Analyze this DB table for a SQL Bot.\nTABLE: {}\nCOLUMNS: {}\n",
        table.name,
        table.columns.join(", ")
    );
    if let Some(comment) = &table.comment {
        question.push_str(&format!("COMMENT: {}\n", comment));
    }
    let relationships = table.relationships();
    if !relationships.is_empty() {
        question.push_str(&format!("FOREIGN KEYS: {}\n", relationships.join("; ")));
    }
    question.push_str(
        "\nRETURN JSON ONLY:\n{ \"description\": \"short description\", \"keywords\": [\"keyword1\", \"keyword2\"] }"
    );
    question
}
