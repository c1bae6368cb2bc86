//! Table definitions and schema summaries for language-model context.
//!
//! Table definitions come from two places: live introspection through the
//! database collaborator, or a DDL file parsed with [`sqlparser`]. Either way
//! they end up in a [`Schema`] whose [`to_summary`](Schema::to_summary) is the
//! fallback context when no catalogued table matches a question.
//!
//! # Example
//!
//! ```
//! use sql_query_bot::schema::Schema;
//!
//! let sql = r#"
//!     CREATE TABLE users (id UUID PRIMARY KEY, email TEXT NOT NULL);
//!     CREATE TABLE orders (id UUID PRIMARY KEY, user_id UUID, total NUMERIC);
//! "#;
//!
//! let schema = Schema::parse(sql).unwrap();
//! assert_eq!(schema.tables["orders"].columns, vec!["id", "user_id", "total"]);
//! assert!(schema.to_summary().contains("TABLE users (id, email)"));
//! ```

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};
use sqlparser::{ast::Statement, dialect::PostgreSqlDialect, parser::Parser};

use crate::error::{AppResult, schema_parse_error};

/// Foreign-key relationship triple: `column -> foreign_table.foreign_column`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub column:         String,
    pub foreign_table:  String,
    pub foreign_column: String
}

impl fmt::Display for ForeignKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {}.{}",
            self.column, self.foreign_table, self.foreign_column
        )
    }
}

/// One table as seen by the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDefinition {
    /// Table name
    pub name:         String,
    /// Column names in ordinal order
    pub columns:      Vec<String>,
    /// Table comment, if any
    #[serde(default)]
    pub comment:      Option<String>,
    /// Outgoing foreign keys
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>
}

impl TableDefinition {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            comment: None,
            foreign_keys: Vec::new()
        }
    }

    /// Relationships in catalog form, e.g. `orders.user_id -> users.id`
    pub fn relationships(&self) -> Vec<String> {
        self.foreign_keys
            .iter()
            .map(|fk| format!("{}.{}", self.name, fk))
            .collect()
    }
}

/// Set of table definitions keyed by name.
///
/// Tables are stored in a `BTreeMap` for deterministic iteration order.
#[derive(Debug, Default, Clone)]
pub struct Schema {
    pub tables: BTreeMap<String, TableDefinition>
}

impl Schema {
    pub fn from_tables(tables: impl IntoIterator<Item = TableDefinition>) -> Self {
        Self {
            tables: tables.into_iter().map(|t| (t.name.clone(), t)).collect()
        }
    }

    /// Parse `CREATE TABLE` statements; other statements are ignored
    ///
    /// # Errors
    ///
    /// Returns error if SQL parsing fails
    pub fn parse(sql: &str) -> AppResult<Self> {
        let statements = Parser::parse_sql(&PostgreSqlDialect {}, sql)
            .map_err(|e| schema_parse_error(e.to_string()))?;
        let mut schema = Self::default();
        for stmt in statements {
            if let Statement::CreateTable(create) = stmt {
                let name = create.name.to_string();
                let columns = create.columns.iter().map(|c| c.name.to_string()).collect();
                schema
                    .tables
                    .insert(name.clone(), TableDefinition::new(name, columns));
            }
        }
        Ok(schema)
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Compact schema description for LLM prompts
    pub fn to_summary(&self) -> String {
        let mut summary = String::new();
        for table in self.tables.values() {
            summary.push_str(&format!(
                "TABLE {} ({})\n",
                table.name,
                table.columns.join(", ")
            ));
            if let Some(comment) = &table.comment {
                summary.push_str(&format!("-- {}\n", comment));
            }
            for relationship in table.relationships() {
                summary.push_str(&format!("-- FK: {}\n", relationship));
            }
        }
        summary
    }
}
