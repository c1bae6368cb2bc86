// SPDX-FileCopyrightText: 2025 RAprogramm
// SPDX-License-Identifier: MIT

mod common;

use common::descriptor;
use sql_query_bot::{
    catalog::TableDescriptor,
    ranker::{MAX_RELEVANT_TABLES, rank, rank_scored}
};

fn names<'a>(ranked: &[&'a TableDescriptor]) -> Vec<&'a str> {
    ranked.iter().map(|t| t.name.as_str()).collect()
}

fn shop_catalog() -> Vec<TableDescriptor> {
    vec![
        descriptor("users", &["customer", "user", "account"]),
        descriptor("orders", &["purchase", "order", "sale"]),
        descriptor("products", &["item", "product", "price"]),
    ]
}

#[test]
fn test_question_about_orders() {
    let catalog = shop_catalog();
    let ranked = rank_scored("show me recent orders", &catalog);
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].table.name, "orders");
    assert_eq!(ranked[0].score, 2 + 5);
}

#[test]
fn test_higher_score_ranks_first() {
    let catalog = shop_catalog();
    let ranked = rank(
        "which customer made a purchase of an item product at this price",
        &catalog
    );
    assert_eq!(names(&ranked), vec!["products", "users", "orders"]);
}

#[test]
fn test_name_match_outweighs_two_keywords() {
    let catalog = vec![
        descriptor("events", &["launch", "release"]),
        descriptor("tasks", &[]),
    ];
    let ranked = rank_scored("launch release tasks", &catalog);
    assert_eq!(ranked[0].table.name, "tasks");
    assert_eq!(ranked[0].score, 5);
    assert_eq!(ranked[1].score, 4);
}

#[test]
fn test_name_match_scores_at_least_five() {
    let catalog = vec![descriptor("invoices", &[])];
    let ranked = rank_scored("list INVOICES from march", &catalog);
    assert_eq!(ranked.len(), 1);
    assert!(ranked[0].score >= 5);
}

#[test]
fn test_no_match_returns_empty() {
    let catalog = shop_catalog();
    assert!(rank("what is the weather today", &catalog).is_empty());
}

#[test]
fn test_empty_catalog_returns_empty() {
    assert!(rank("show me orders", &[]).is_empty());
}

#[test]
fn test_empty_question_returns_empty() {
    let catalog = shop_catalog();
    assert!(rank("", &catalog).is_empty());
}

#[test]
fn test_result_is_capped() {
    let catalog: Vec<TableDescriptor> = (0..8)
        .map(|i| descriptor(&format!("t{}", i), &["report"]))
        .collect();
    let ranked = rank("weekly report", &catalog);
    assert_eq!(ranked.len(), MAX_RELEVANT_TABLES);
}

#[test]
fn test_ties_keep_catalog_order() {
    let catalog = vec![
        descriptor("alpha", &["sprint"]),
        descriptor("beta", &["sprint"]),
        descriptor("gamma", &["sprint"]),
    ];
    let ranked = rank("current sprint", &catalog);
    assert_eq!(names(&ranked), vec!["alpha", "beta", "gamma"]);
}

#[test]
fn test_duplicate_names_appear_once() {
    let mut catalog = shop_catalog();
    catalog.push(descriptor("orders", &["order", "purchase", "sale"]));
    let ranked = rank("every order purchase and sale", &catalog);
    let orders = ranked.iter().filter(|t| t.name == "orders").count();
    assert_eq!(orders, 1);
    assert!(std::ptr::eq(
        ranked[0],
        catalog.iter().find(|t| t.name == "orders").unwrap()
    ));
}

#[test]
fn test_substring_match_is_approximate() {
    let catalog = vec![descriptor("teams", &["team"])];
    assert_eq!(rank_scored("steam sales", &catalog)[0].score, 2);
}

#[test]
fn test_ranking_is_deterministic() {
    let catalog = shop_catalog();
    let question = "customer orders for each product";
    assert_eq!(
        names(&rank(question, &catalog)),
        names(&rank(question, &catalog))
    );
}

#[test]
fn test_keyword_whitespace_is_significant() {
    let catalog = vec![descriptor("teams", &["art "])];
    assert!(rank("how do I start", &catalog).is_empty());
    assert_eq!(rank_scored("modern art museums", &catalog)[0].score, 2);
}

#[test]
fn test_null_keywords_score_only_by_name() {
    let catalog: Vec<TableDescriptor> = serde_json::from_str(
        r#"[{"name": "users", "keywords": null}, {"name": "orders", "keywords": null}]"#
    )
    .unwrap();
    let ranked = rank_scored("list users", &catalog);
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].score, 5);
}
