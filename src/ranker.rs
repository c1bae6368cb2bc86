//! Keyword-based relevance ranking of catalogued tables.
//!
//! A cheap pre-filter that narrows the schema handed to the language model.
//! It is approximate by construction: keywords match as plain substrings of
//! the question, so `team` also matches inside `steam`.
//!
//! # Scoring
//!
//! | Match | Points |
//! |-------|--------|
//! | keyword entry contained in the question | 2 |
//! | table name contained in the question | 5 |
//!
//! Tables scoring 0 are dropped, the rest are stably sorted by descending
//! score and capped at [`MAX_RELEVANT_TABLES`].
//!
//! # Example
//!
//! ```
//! use sql_query_bot::{catalog::TableDescriptor, ranker::rank};
//!
//! let catalog = vec![
//!     TableDescriptor {
//!         name:           "orders".into(),
//!         description:    String::new(),
//!         keywords:       vec!["purchase".into(), "order".into()],
//!         sample_columns: vec![],
//!         relationships:  vec![]
//!     },
//!     TableDescriptor {
//!         name:           "users".into(),
//!         description:    String::new(),
//!         keywords:       vec!["customer".into()],
//!         sample_columns: vec![],
//!         relationships:  vec![]
//!     },
//! ];
//!
//! let ranked = rank("show me recent orders", &catalog);
//! assert_eq!(ranked.len(), 1);
//! assert_eq!(ranked[0].name, "orders");
//! ```

use std::collections::HashSet;

use rayon::prelude::*;
use serde::Serialize;

use crate::catalog::TableDescriptor;

/// Upper bound on the number of tables returned
pub const MAX_RELEVANT_TABLES: usize = 5;

const KEYWORD_POINTS: u32 = 2;
const TABLE_NAME_POINTS: u32 = 5;

/// A descriptor together with its score for one ranking call
#[derive(Debug, Clone, Serialize)]
pub struct ScoredTable<'a> {
    pub table: &'a TableDescriptor,
    pub score: u32
}

/// Score one descriptor against an already lower-cased question.
///
/// Every keyword entry is checked on its own, so a keyword listed twice
/// counts twice. Keywords are matched as written, surrounding whitespace
/// included. Blank keywords and blank names never match.
pub fn score(question_lower: &str, table: &TableDescriptor) -> u32 {
    let keyword_hits = table
        .keywords
        .iter()
        .filter(|k| !k.trim().is_empty())
        .filter(|k| question_lower.contains(k.to_lowercase().as_str()))
        .count() as u32;
    let name_hit = !table.name.trim().is_empty()
        && question_lower.contains(table.name.to_lowercase().as_str());
    keyword_hits * KEYWORD_POINTS + if name_hit { TABLE_NAME_POINTS } else { 0 }
}

/// Rank the catalog for `question`, keeping scores
pub fn rank_scored<'a>(question: &str, catalog: &'a [TableDescriptor]) -> Vec<ScoredTable<'a>> {
    let question_lower = question.to_lowercase();
    let scores: Vec<u32> = catalog
        .par_iter()
        .map(|table| score(&question_lower, table))
        .collect();

    let mut seen = HashSet::new();
    let mut ranked: Vec<ScoredTable<'a>> = catalog
        .iter()
        .zip(scores)
        .filter(|&(_, score)| score > 0)
        .filter(|&(table, _)| seen.insert(table.name.as_str()))
        .map(|(table, score)| ScoredTable {
            table,
            score
        })
        .collect();

    // sort_by is stable: equal scores keep catalog order
    ranked.sort_by(|a, b| b.score.cmp(&a.score));
    ranked.truncate(MAX_RELEVANT_TABLES);
    ranked
}

/// Tables most likely relevant to `question`, most relevant first
pub fn rank<'a>(question: &str, catalog: &'a [TableDescriptor]) -> Vec<&'a TableDescriptor> {
    rank_scored(question, catalog)
        .into_iter()
        .map(|s| s.table)
        .collect()
}
