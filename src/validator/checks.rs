use std::sync::LazyLock;

use regex::Regex;
use sqlparser::{ast::Statement, dialect::PostgreSqlDialect, parser::Parser};

use super::{Check, Rejection};

/// Mutating, DDL and DCL verbs, in the order they are searched for
pub const FORBIDDEN_KEYWORDS: [&str; 11] = [
    "INSERT", "UPDATE", "DELETE", "DROP", "TRUNCATE", "ALTER", "CREATE", "GRANT", "REVOKE",
    "EXECUTE", "EXEC"
];

/// Clause keywords a read-only statement may start with
const READ_ONLY_PREFIXES: [&str; 2] = ["SELECT", "WITH"];

static FORBIDDEN_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    FORBIDDEN_KEYWORDS
        .iter()
        .filter_map(|keyword| {
            Regex::new(&format!(r"(?i)\b{}\b", keyword))
                .ok()
                .map(|re| (*keyword, re))
        })
        .collect()
});

/// Rejects empty and whitespace-only candidates
pub struct NotEmpty;

impl Check for NotEmpty {
    fn name(&self) -> &'static str {
        "not-empty"
    }

    fn check(&self, sql: &str) -> Result<(), Rejection> {
        if sql.trim().is_empty() {
            return Err(Rejection::EmptyInput);
        }
        Ok(())
    }
}

/// Requires the trimmed, uppercased text to start with `SELECT` or `WITH`
pub struct ReadOnlyPrefix;

impl Check for ReadOnlyPrefix {
    fn name(&self) -> &'static str {
        "read-only-prefix"
    }

    fn check(&self, sql: &str) -> Result<(), Rejection> {
        let normalized = sql.to_uppercase();
        let normalized = normalized.trim();
        if READ_ONLY_PREFIXES
            .iter()
            .any(|prefix| normalized.starts_with(prefix))
        {
            Ok(())
        } else {
            Err(Rejection::NotReadOnly)
        }
    }
}

/// Scans the original text for forbidden keywords as whole words.
///
/// `_` counts as a word character, so identifiers such as `update_log` or
/// `created_at` do not match.
pub struct NoForbiddenKeywords;

impl Check for NoForbiddenKeywords {
    fn name(&self) -> &'static str {
        "no-forbidden-keywords"
    }

    fn check(&self, sql: &str) -> Result<(), Rejection> {
        match FORBIDDEN_PATTERNS.iter().find(|(_, re)| re.is_match(sql)) {
            Some((keyword, _)) => Err(Rejection::ForbiddenKeyword(keyword)),
            None => Ok(())
        }
    }
}

/// Parses the candidate and requires exactly one query statement
pub struct SingleQueryStatement;

impl Check for SingleQueryStatement {
    fn name(&self) -> &'static str {
        "single-query-statement"
    }

    fn check(&self, sql: &str) -> Result<(), Rejection> {
        let statements = Parser::parse_sql(&PostgreSqlDialect {}, sql)
            .map_err(|e| Rejection::Unparseable(e.to_string()))?;
        match statements.as_slice() {
            [Statement::Query(_)] => Ok(()),
            [_] => Err(Rejection::NotAQuery),
            other => Err(Rejection::MultipleStatements(other.len()))
        }
    }
}
