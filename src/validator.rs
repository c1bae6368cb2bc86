//! Read-only safety gate for generated SQL.
//!
//! Every candidate produced by the language model passes through a
//! [`Validator`] before it may reach the database. The validator runs a fixed
//! sequence of [`Check`]s and stops at the first failure.
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌────────────────┐   ┌───────────────────┐
//! │ NotEmpty │──▶│ SELECT / │──▶│ no forbidden   │──▶│ single query      │
//! │          │   │ WITH     │   │ whole keywords │   │ (strict only)     │
//! └──────────┘   └──────────┘   └────────────────┘   └───────────────────┘
//! ```
//!
//! This is a keyword blacklist, not a SQL parser: it is meant to be paired
//! with a read-only database role and a read-only transaction. The strict
//! validator additionally parses the candidate with [`sqlparser`].
//!
//! # Example
//!
//! ```
//! use sql_query_bot::validator::{Rejection, validate};
//!
//! assert!(validate("SELECT * FROM users").is_valid());
//!
//! let verdict = validate("select * from users; DROP TABLE users");
//! assert_eq!(verdict.error(), Some(&Rejection::ForbiddenKeyword("DROP")));
//! ```

mod checks;
mod types;

use std::sync::LazyLock;

pub use checks::{
    FORBIDDEN_KEYWORDS, NoForbiddenKeywords, NotEmpty, ReadOnlyPrefix, SingleQueryStatement
};
pub use types::{Rejection, Verdict};

static DEFAULT_VALIDATOR: LazyLock<Validator> = LazyLock::new(Validator::new);

/// A single validation step.
///
/// Checks are stateless and deterministic; they must be `Send + Sync` so one
/// validator can serve concurrent requests.
pub trait Check: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    /// Returns the rejection reason if the candidate fails this check
    fn check(&self, sql: &str) -> Result<(), Rejection>;
}

/// Ordered list of checks; the first failing check decides the verdict.
pub struct Validator {
    checks: Vec<Box<dyn Check>>
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator {
    /// Prefix and keyword checks only
    pub fn new() -> Self {
        Self {
            checks: vec![
                Box::new(NotEmpty),
                Box::new(ReadOnlyPrefix),
                Box::new(NoForbiddenKeywords),
            ]
        }
    }

    /// Default checks followed by a parse that requires one query statement
    pub fn strict() -> Self {
        let mut validator = Self::new();
        validator.checks.push(Box::new(SingleQueryStatement));
        validator
    }

    /// Build from the `[validator]` configuration flag
    pub fn with_strict(strict: bool) -> Self {
        if strict { Self::strict() } else { Self::new() }
    }

    /// Names of the checks, in execution order
    pub fn check_names(&self) -> Vec<&'static str> {
        self.checks.iter().map(|c| c.name()).collect()
    }

    pub fn validate(&self, sql: &str) -> Verdict {
        for check in &self.checks {
            if let Err(reason) = check.check(sql) {
                tracing::debug!(check = check.name(), %reason, "SQL candidate rejected");
                return Verdict::rejected(reason);
            }
        }
        Verdict::valid()
    }
}

/// Validate with the default (non-strict) validator
pub fn validate(sql: &str) -> Verdict {
    DEFAULT_VALIDATOR.validate(sql)
}
