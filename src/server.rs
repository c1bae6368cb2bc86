//! Telegram webhook transport.
//!
//! | Route | Method | Purpose |
//! |-------|--------|---------|
//! | `{webhook_path}` | POST | Telegram update delivery |
//! | `/health` | GET | Liveness check |

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::{Method, StatusCode, header},
    routing::{get, post}
};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer
};

use crate::{
    app::{ProcessQuestion, QuestionRequest},
    error::{AppResult, config_error},
    messaging::{MessageGateway, OutgoingMessage}
};

/// Shared state of the webhook handlers
pub struct BotState {
    pub question:  ProcessQuestion,
    pub messenger: Arc<dyn MessageGateway>
}

/// Subset of a Telegram `Update` the bot reacts to
#[derive(Debug, Deserialize)]
pub struct TelegramUpdate {
    pub message: Option<TelegramMessage>
}

#[derive(Debug, Deserialize)]
pub struct TelegramMessage {
    #[serde(default)]
    pub message_id: i64,
    pub chat:       TelegramChat,
    pub text:       Option<String>
}

#[derive(Debug, Deserialize)]
pub struct TelegramChat {
    pub id: i64
}

type JsonResponse = (StatusCode, Json<Value>);

pub fn router(state: Arc<BotState>, webhook_path: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health))
        .route(webhook_path, post(webhook))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn webhook(State(state): State<Arc<BotState>>, body: String) -> JsonResponse {
    if body.trim().is_empty() {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": "Empty body" })));
    }
    let update: TelegramUpdate = match serde_json::from_str(&body) {
        Ok(update) => update,
        Err(e) => {
            tracing::warn!(error = %e, "Malformed update");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": format!("Invalid update: {}", e) }))
            );
        }
    };

    let Some((chat_id, message_id, text)) = update
        .message
        .and_then(|m| m.text.map(|text| (m.chat.id, m.message_id, text)))
    else {
        tracing::debug!("Ignored non-text update");
        return (StatusCode::OK, Json(json!({ "ok": true })));
    };
    tracing::info!(chat_id, message_id, "Received question");

    if !text.trim().is_empty()
        && let Err(e) = state.messenger.send_typing(chat_id).await
    {
        tracing::debug!(error = %e, "Typing indicator failed");
    }

    let outcome = state
        .question
        .execute(&QuestionRequest {
            chat_id,
            question: text
        })
        .await;

    let reply = OutgoingMessage::html(chat_id, outcome.formatted_response.clone());
    if let Err(e) = state.messenger.send_message(&reply).await {
        tracing::error!(chat_id, error = %e, "Failed to deliver reply");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() }))
        );
    }

    (StatusCode::OK, Json(json!({ "ok": true, "result": outcome })))
}

/// Bind and serve until the process is stopped
pub async fn serve(state: Arc<BotState>, host: &str, port: u16, webhook_path: &str) -> AppResult<()> {
    let app = router(state, webhook_path);
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| config_error(format!("Failed to bind {}: {}", addr, e)))?;
    tracing::info!(%addr, webhook_path, "Webhook server listening");
    axum::serve(listener, app)
        .await
        .map_err(|e| crate::error::AppError::internal(format!("Server error: {}", e)))
}
