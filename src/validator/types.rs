//! Type definitions for the SQL safety validator.
//!
//! - [`Rejection`] - Why a candidate was refused
//! - [`Verdict`] - Outcome of validating one candidate

use std::fmt;

use serde::Serialize;

/// Reason a SQL candidate was refused.
///
/// The first three variants form the compatible contract; the remaining ones
/// are only produced by the strict validator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum Rejection {
    /// Candidate is empty or whitespace only
    EmptyInput,
    /// Candidate does not start with `SELECT` or `WITH`
    NotReadOnly,
    /// Candidate contains a mutating, DDL or DCL keyword as a whole word
    ForbiddenKeyword(&'static str),
    /// Candidate could not be parsed as SQL
    Unparseable(String),
    /// Candidate holds more than one statement
    MultipleStatements(usize),
    /// Candidate parsed, but the statement is not a query
    NotAQuery
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyInput => write!(f, "SQL cannot be empty"),
            Self::NotReadOnly => write!(f, "Only SELECT queries are allowed"),
            Self::ForbiddenKeyword(keyword) => write!(f, "Forbidden keyword: {}", keyword),
            Self::Unparseable(message) => write!(f, "Unable to parse SQL: {}", message),
            Self::MultipleStatements(count) => {
                write!(f, "Expected a single statement, found {}", count)
            }
            Self::NotAQuery => write!(f, "Only query statements are allowed")
        }
    }
}

/// Result of validating one SQL candidate.
///
/// `is_valid` is true exactly when `error` is `None`. Verdicts are produced
/// fresh for every candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    is_valid: bool,
    error:    Option<Rejection>
}

impl Verdict {
    /// Verdict approving the candidate
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            error:    None
        }
    }

    /// Verdict refusing the candidate
    pub fn rejected(reason: Rejection) -> Self {
        Self {
            is_valid: false,
            error:    Some(reason)
        }
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    pub fn error(&self) -> Option<&Rejection> {
        self.error.as_ref()
    }

    /// Human-readable error message, if rejected
    pub fn message(&self) -> Option<String> {
        self.error.as_ref().map(ToString::to_string)
    }
}
