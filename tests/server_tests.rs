// SPDX-FileCopyrightText: 2025 RAprogramm
// SPDX-License-Identifier: MIT

mod common;

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode}
};
use common::{FakeDatabase, MemoryCatalog, RecordingMessenger, ScriptedModel, descriptor, row};
use serde_json::{Value, json};
use sql_query_bot::{
    app::ProcessQuestion,
    messaging::ParseMode,
    server::{BotState, router}
};
use tower::ServiceExt;

const WEBHOOK: &str = "/telegram-bot";

fn app(answer: &str, messenger: Arc<RecordingMessenger>) -> Router {
    let question = ProcessQuestion::new(
        Arc::new(ScriptedModel::answering(answer)),
        Arc::new(FakeDatabase::with_rows(vec![row(&[("total", json!(12))])])),
        Arc::new(MemoryCatalog::with(vec![descriptor("orders", &["order"])]))
    );
    router(
        Arc::new(BotState {
            question,
            messenger
        }),
        WEBHOOK
    )
}

fn update(chat_id: i64, text: Option<&str>) -> String {
    let mut message = json!({ "message_id": 7, "chat": { "id": chat_id } });
    if let Some(text) = text {
        message["text"] = json!(text);
    }
    json!({ "update_id": 1, "message": message }).to_string()
}

async fn post(app: Router, body: impl Into<Body>) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(WEBHOOK)
                .header("content-type", "application/json")
                .body(body.into())
                .unwrap()
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_health() {
    let response = app("SELECT 1", Arc::new(RecordingMessenger::default()))
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap()
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_question_is_answered_in_chat() {
    let messenger = Arc::new(RecordingMessenger::default());
    let (status, body) = post(
        app("SELECT sum(total) AS total FROM orders", messenger.clone()),
        update(1001, Some("total of all orders"))
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["result"]["success"], true);
    assert_eq!(body["result"]["sql"], "SELECT sum(total) AS total FROM orders");

    assert_eq!(*messenger.typing.lock().unwrap(), vec![1001]);
    let sent = messenger.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].chat_id, 1001);
    assert_eq!(sent[0].parse_mode, ParseMode::Html);
    assert!(sent[0].text.contains("<b>total:</b> 12"));
}

#[tokio::test]
async fn test_rejected_sql_is_still_replied() {
    let messenger = Arc::new(RecordingMessenger::default());
    let (status, body) = post(
        app("DROP TABLE orders", messenger.clone()),
        update(5, Some("drop the orders"))
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["success"], false);
    let sent = messenger.sent.lock().unwrap();
    assert_eq!(sent[0].text, "❌ Only SELECT queries are allowed");
}

#[tokio::test]
async fn test_non_text_update_is_acknowledged() {
    let messenger = Arc::new(RecordingMessenger::default());
    let (status, body) = post(app("SELECT 1", messenger.clone()), update(5, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true }));
    assert!(messenger.sent.lock().unwrap().is_empty());
    assert!(messenger.typing.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_update_without_message_is_acknowledged() {
    let messenger = Arc::new(RecordingMessenger::default());
    let (status, body) = post(
        app("SELECT 1", messenger.clone()),
        json!({ "update_id": 3, "edited_message": {} }).to_string()
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert!(messenger.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_body_is_rejected() {
    let (status, body) = post(app("SELECT 1", Arc::new(RecordingMessenger::default())), "").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Empty body");
}

#[tokio::test]
async fn test_malformed_body_is_rejected() {
    let (status, body) = post(
        app("SELECT 1", Arc::new(RecordingMessenger::default())),
        "{not json"
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("Invalid update"));
}

#[tokio::test]
async fn test_blank_text_gets_refusal_without_typing() {
    let messenger = Arc::new(RecordingMessenger::default());
    let (status, _) = post(app("SELECT 1", messenger.clone()), update(9, Some("   "))).await;

    assert_eq!(status, StatusCode::OK);
    assert!(messenger.typing.lock().unwrap().is_empty());
    assert_eq!(
        messenger.sent.lock().unwrap()[0].text,
        "❌ Question cannot be empty"
    );
}

#[tokio::test]
async fn test_delivery_failure_is_server_error() {
    let messenger = Arc::new(RecordingMessenger {
        fail: true,
        ..Default::default()
    });
    let (status, body) = post(app("SELECT 1", messenger), update(5, Some("orders"))).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_webhook_only_accepts_post() {
    let response = app("SELECT 1", Arc::new(RecordingMessenger::default()))
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(WEBHOOK)
                .body(Body::empty())
                .unwrap()
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
