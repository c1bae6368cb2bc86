//! Messaging collaborator (Telegram Bot API).

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{AppResult, http_error, messaging_error};

/// Telegram text formatting modes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum ParseMode {
    #[default]
    #[serde(rename = "HTML")]
    Html
}

/// Message to deliver to one chat
#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    pub chat_id:    i64,
    pub text:       String,
    pub parse_mode: ParseMode
}

impl OutgoingMessage {
    pub fn html(chat_id: i64, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            parse_mode: ParseMode::Html
        }
    }
}

#[async_trait]
pub trait MessageGateway: Send + Sync {
    async fn send_message(&self, message: &OutgoingMessage) -> AppResult<()>;

    /// Show the "typing..." indicator
    async fn send_typing(&self, chat_id: i64) -> AppResult<()>;
}

#[derive(Serialize)]
struct SendMessageBody<'a> {
    chat_id:    i64,
    text:       &'a str,
    parse_mode: ParseMode
}

#[derive(Serialize)]
struct ChatActionBody {
    chat_id: i64,
    action:  &'static str
}

/// Telegram Bot API client.
pub struct TelegramClient {
    client:  reqwest::Client,
    api_url: String
}

impl TelegramClient {
    /// `api_base` is normally `https://api.telegram.org`
    pub fn new(api_base: &str, bot_token: &str) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            api_url: format!("{}/bot{}", api_base.trim_end_matches('/'), bot_token)
        }
    }
}

#[async_trait]
impl MessageGateway for TelegramClient {
    async fn send_message(&self, message: &OutgoingMessage) -> AppResult<()> {
        let body = SendMessageBody {
            chat_id:    message.chat_id,
            text:       &message.text,
            parse_mode: message.parse_mode
        };
        let response = self
            .client
            .post(format!("{}/sendMessage", self.api_url))
            .json(&body)
            .send()
            .await
            .map_err(http_error)?;
        if !response.status().is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(messaging_error(format!("Telegram API error: {}", text)));
        }
        tracing::debug!(chat_id = message.chat_id, "Message delivered");
        Ok(())
    }

    async fn send_typing(&self, chat_id: i64) -> AppResult<()> {
        let body = ChatActionBody {
            chat_id,
            action: "typing"
        };
        self.client
            .post(format!("{}/sendChatAction", self.api_url))
            .json(&body)
            .send()
            .await
            .map_err(http_error)?;
        Ok(())
    }
}
