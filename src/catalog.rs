//! Catalogued table descriptors and their persistent store.
//!
//! A [`TableDescriptor`] summarises one database table for relevance ranking:
//! what it holds, which words point to it, its columns and its relationships.
//! Descriptors are written by the indexing job and read back for every
//! question.

mod postgres;

use async_trait::async_trait;
use indexmap::IndexSet;
use serde::{Deserialize, Deserializer, Serialize};

pub use postgres::PgCatalogStore;

use crate::{
    error::{AppResult, description_parse_error},
    llm::strip_code_fences,
    schema::TableDefinition
};

/// Catalogued summary of one table. Unique by `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    #[serde(alias = "table_name")]
    pub name:           String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description:    String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub keywords:       Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sample_columns: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub relationships:  Vec<String>
}

/// Missing and `null` both mean empty
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl TableDescriptor {
    /// Prompt fragment describing this table
    pub fn to_context(&self) -> String {
        let mut context = format!("TABLE {} ({})\n", self.name, self.sample_columns.join(", "));
        if !self.description.is_empty() {
            context.push_str(&format!("-- {}\n", self.description));
        }
        if !self.relationships.is_empty() {
            context.push_str(&format!("-- Relationships: {}\n", self.relationships.join("; ")));
        }
        context
    }
}

/// Join the prompt fragments of ranked tables
pub fn render_context(tables: &[&TableDescriptor]) -> String {
    tables
        .iter()
        .map(|t| t.to_context())
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Deserialize)]
struct DescriptionPayload {
    description: Option<String>,
    #[serde(default)]
    keywords:    Vec<String>
}

/// Turn the language model's JSON answer for `table` into a descriptor.
///
/// Expects `{ "description": "...", "keywords": ["..."] }`, optionally wrapped
/// in a markdown code fence. Keywords are trimmed and deduplicated, blank ones
/// dropped. Columns and relationships come from the live table, not the
/// model.
pub fn parse_description(table: &TableDefinition, raw: &str) -> AppResult<TableDescriptor> {
    let json = strip_code_fences(raw);
    let payload: DescriptionPayload = serde_json::from_str(&json)
        .map_err(|e| description_parse_error(&table.name, e.to_string()))?;
    let description = payload
        .description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .ok_or_else(|| description_parse_error(&table.name, "missing description"))?;
    let keywords: IndexSet<String> = payload
        .keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect();
    Ok(TableDescriptor {
        name: table.name.clone(),
        description,
        keywords: keywords.into_iter().collect(),
        sample_columns: table.columns.clone(),
        relationships: table.relationships()
    })
}

/// Persistent set of table descriptors.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Names of tables that already have a descriptor
    async fn indexed_table_names(&self) -> AppResult<Vec<String>>;

    /// Insert or replace descriptors, keyed by table name
    async fn upsert(&self, descriptors: &[TableDescriptor]) -> AppResult<()>;

    /// Every stored descriptor, in a stable order
    async fn list_all(&self) -> AppResult<Vec<TableDescriptor>>;
}
