// SPDX-FileCopyrightText: 2025 RAprogramm
// SPDX-License-Identifier: MIT

use sql_query_bot::validator::{FORBIDDEN_KEYWORDS, Rejection, Validator, Verdict, validate};

fn rejection(sql: &str) -> Option<Rejection> {
    validate(sql).error().cloned()
}

#[test]
fn test_simple_select_is_valid() {
    let verdict = validate("SELECT * FROM users");
    assert!(verdict.is_valid());
    assert!(verdict.error().is_none());
    assert!(verdict.message().is_none());
}

#[test]
fn test_cte_is_valid() {
    assert!(validate("WITH recent AS (SELECT * FROM orders) SELECT count(*) FROM recent").is_valid());
}

#[test]
fn test_lowercase_and_indented_select_is_valid() {
    assert!(validate("   \n  select id from users").is_valid());
}

#[test]
fn test_empty_input() {
    assert_eq!(rejection(""), Some(Rejection::EmptyInput));
    assert_eq!(rejection("   \n\t "), Some(Rejection::EmptyInput));
    assert_eq!(validate("").message().as_deref(), Some("SQL cannot be empty"));
}

#[test]
fn test_non_select_prefix() {
    assert_eq!(rejection("DELETE FROM users"), Some(Rejection::NotReadOnly));
    assert_eq!(rejection("EXPLAIN SELECT 1"), Some(Rejection::NotReadOnly));
    assert_eq!(
        validate("show tables").message().as_deref(),
        Some("Only SELECT queries are allowed")
    );
}

#[test]
fn test_prefix_check_runs_before_keyword_check() {
    assert_eq!(rejection("DROP TABLE users"), Some(Rejection::NotReadOnly));
}

#[test]
fn test_stacked_statement_names_keyword() {
    let verdict = validate("SELECT * FROM users; DROP TABLE users");
    assert!(!verdict.is_valid());
    assert_eq!(verdict.message().as_deref(), Some("Forbidden keyword: DROP"));
}

#[test]
fn test_keyword_match_is_case_insensitive() {
    assert_eq!(
        rejection("select 1; delete from users"),
        Some(Rejection::ForbiddenKeyword("DELETE"))
    );
    assert_eq!(
        rejection("SELECT 1; TrUnCaTe users"),
        Some(Rejection::ForbiddenKeyword("TRUNCATE"))
    );
}

#[test]
fn test_identifiers_containing_keywords_are_allowed() {
    assert!(validate("SELECT * FROM update_log").is_valid());
    assert!(validate("SELECT created_at, deleted FROM users").is_valid());
    assert!(validate("SELECT executed_by FROM job_runs").is_valid());
}

#[test]
fn test_keyword_inside_string_literal_is_rejected() {
    assert_eq!(
        rejection("SELECT * FROM notes WHERE body = 'please delete me'"),
        Some(Rejection::ForbiddenKeyword("DELETE"))
    );
}

#[test]
fn test_first_keyword_in_list_order_wins() {
    assert_eq!(
        rejection("SELECT 1; DROP TABLE a; INSERT INTO b VALUES (1)"),
        Some(Rejection::ForbiddenKeyword("INSERT"))
    );
}

#[test]
fn test_every_forbidden_keyword_is_rejected() {
    for keyword in FORBIDDEN_KEYWORDS {
        let sql = format!("SELECT 1; {} something", keyword.to_lowercase());
        assert_eq!(
            rejection(&sql),
            Some(Rejection::ForbiddenKeyword(keyword)),
            "{}",
            sql
        );
    }
}

#[test]
fn test_validation_is_idempotent() {
    let sql = "SELECT * FROM users; GRANT ALL ON users TO public";
    assert_eq!(validate(sql), validate(sql));
}

#[test]
fn test_verdict_serializes_with_reason() {
    let json = serde_json::to_value(Verdict::rejected(Rejection::ForbiddenKeyword("DROP"))).unwrap();
    assert_eq!(json["is_valid"], false);
    assert_eq!(json["error"]["kind"], "forbidden_keyword");
    assert_eq!(json["error"]["detail"], "DROP");
}

#[test]
fn test_default_check_order() {
    assert_eq!(
        Validator::new().check_names(),
        vec!["not-empty", "read-only-prefix", "no-forbidden-keywords"]
    );
}

#[test]
fn test_strict_adds_parse_check() {
    let names = Validator::strict().check_names();
    assert_eq!(names.len(), 4);
    assert_eq!(names.last(), Some(&"single-query-statement"));
    assert_eq!(Validator::with_strict(false).check_names().len(), 3);
}

#[test]
fn test_strict_accepts_single_query() {
    let validator = Validator::strict();
    assert!(validator.validate("SELECT id, name FROM users WHERE id = 1").is_valid());
    assert!(
        validator
            .validate("WITH t AS (SELECT 1 AS x) SELECT x FROM t")
            .is_valid()
    );
}

#[test]
fn test_strict_rejects_multiple_queries() {
    let verdict = Validator::strict().validate("SELECT 1; SELECT 2");
    assert_eq!(verdict.error(), Some(&Rejection::MultipleStatements(2)));
}

#[test]
fn test_strict_rejects_unparseable_sql() {
    let verdict = Validator::strict().validate("SELECT * FROM users WHERE (id = 1");
    assert!(matches!(verdict.error(), Some(Rejection::Unparseable(_))));
}

#[test]
fn test_non_strict_allows_multiple_queries() {
    assert!(Validator::new().validate("SELECT 1; SELECT 2").is_valid());
}
