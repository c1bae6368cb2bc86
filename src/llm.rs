//! Language-model collaborator.
//!
//! The bot asks a language model two kinds of questions: "write SQL for this
//! question" and "describe this table as JSON". Both go through the
//! [`LanguageModel`] trait as a context plus a question, and come back as
//! untrusted text. Callers validate SQL with [`crate::validator`] and parse
//! descriptions with [`crate::catalog::parse_description`].
//!
//! # Supported Providers
//!
//! | Provider | Endpoint | Authentication |
//! |----------|----------|----------------|
//! | Gemini | `generativelanguage.googleapis.com` | `key` query parameter |
//! | OpenAI | `api.openai.com` | Bearer token |
//! | Anthropic | `api.anthropic.com` | x-api-key header |
//! | Ollama | Local (configurable) | None |
//!
//! # Retry Behavior
//!
//! The client automatically retries on transient errors:
//! - Connection timeouts
//! - Rate limiting (429)
//! - Server errors (5xx)
//!
//! Retry delays use exponential backoff with configurable parameters. A
//! [`RateLimiter`] can additionally space out consecutive calls.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use sql_query_bot::{
//!     config::RetryConfig,
//!     llm::{LlmClient, LlmProvider, RateLimiter}
//! };
//!
//! let provider = LlmProvider::Ollama {
//!     base_url: "http://localhost:11434".into(),
//!     model:    "llama3.2".into()
//! };
//!
//! let client = LlmClient::with_retry_config(provider, RetryConfig::default())
//!     .with_rate_limiter(RateLimiter::new(Duration::from_secs(4)));
//! ```

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::{
    sync::Mutex,
    time::{Instant, sleep, sleep_until}
};

use crate::{
    config::RetryConfig,
    error::{AppResult, http_error, llm_api_error}
};

/// Context and question handed to the language model
#[derive(Debug, Clone)]
pub struct PromptRequest {
    pub context:  String,
    pub question: String
}

impl PromptRequest {
    pub fn new(context: impl Into<String>, question: impl Into<String>) -> Self {
        Self {
            context:  context.into(),
            question: question.into()
        }
    }

    /// Single prompt text sent to providers
    pub fn to_prompt(&self) -> String {
        format!("{}\n\n{}", self.context, self.question)
    }
}

/// Raw model output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String
}

/// Anything that can answer a [`PromptRequest`]
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, request: &PromptRequest) -> AppResult<Completion>;
}

/// Remove a surrounding markdown code fence (```` ```sql ```` or ```` ``` ````)
pub fn strip_code_fences(text: &str) -> String {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    // Drop the info string (e.g. `sql`, `json`) up to the first newline
    let body = match rest.find('\n') {
        Some(idx)
            if rest[..idx]
                .trim_end()
                .chars()
                .all(|c| c.is_ascii_alphanumeric()) =>
        {
            &rest[idx + 1..]
        }
        _ => strip_inline_sql_tag(rest)
    };
    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim().to_string()
}

/// `sql SELECT 1` -> `SELECT 1`; anything else is returned as is
fn strip_inline_sql_tag(text: &str) -> &str {
    match text.strip_prefix("sql") {
        Some(rest) if rest.starts_with(char::is_whitespace) => rest,
        _ => text
    }
}

/// Enforces a minimum gap between consecutive calls.
///
/// Owned by the client it throttles; there is no process-wide state.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_call:    Mutex<Option<Instant>>
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: Mutex::new(None)
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until `min_interval` has passed since the previous call
    pub async fn acquire(&self) {
        let mut last_call = self.last_call.lock().await;
        if let Some(previous) = *last_call {
            let ready_at = previous + self.min_interval;
            if ready_at > Instant::now() {
                tracing::debug!(
                    wait_ms = (ready_at - Instant::now()).as_millis() as u64,
                    "Throttling LLM request"
                );
                sleep_until(ready_at).await;
            }
        }
        *last_call = Some(Instant::now());
    }
}

/// LLM provider configuration with authentication credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmProvider {
    /// Google Gemini API
    Gemini {
        /// API key
        api_key: String,
        /// Model identifier (e.g., "gemini-1.5-flash-latest")
        model:   String
    },
    /// OpenAI API (GPT-4, GPT-3.5, etc.)
    OpenAI {
        /// API key (sk-...)
        api_key: String,
        /// Model identifier (e.g., "gpt-4", "gpt-3.5-turbo")
        model:   String
    },
    /// Anthropic API (Claude models)
    Anthropic {
        /// API key
        api_key: String,
        /// Model identifier (e.g., "claude-sonnet-4-20250514")
        model:   String
    },
    /// Local Ollama instance
    Ollama {
        /// Base URL (e.g., "http://localhost:11434")
        base_url: String,
        /// Model name (e.g., "llama3.2", "codellama")
        model:    String
    }
}

impl LlmProvider {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Gemini {
                ..
            } => "gemini",
            Self::OpenAI {
                ..
            } => "openai",
            Self::Anthropic {
                ..
            } => "anthropic",
            Self::Ollama {
                ..
            } => "ollama"
        }
    }
}

/// HTTP client for LLM API communication with retry support.
///
/// Handles provider-specific request formatting and response parsing.
/// Automatically retries transient failures with exponential backoff.
pub struct LlmClient {
    provider:     LlmProvider,
    client:       reqwest::Client,
    retry_config: RetryConfig,
    rate_limiter: Option<RateLimiter>
}

const GEMINI_TEMPERATURE: f32 = 0.1;
const GEMINI_MAX_OUTPUT_TOKENS: u32 = 1024;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents:          Vec<GeminiContent>,
    generation_config: GeminiGenerationConfig
}

#[derive(Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>
}

#[derive(Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    temperature:       f32,
    max_output_tokens: u32
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiContent
}

#[derive(Serialize)]
struct OpenAIRequest {
    model:    String,
    messages: Vec<OpenAIRequestMessage>
}

#[derive(Serialize)]
struct OpenAIRequestMessage {
    role:    String,
    content: String
}

#[derive(Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>
}

#[derive(Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage
}

#[derive(Deserialize)]
struct OpenAIResponseMessage {
    content: String
}

#[derive(Serialize)]
struct AnthropicRequest {
    model:      String,
    max_tokens: u32,
    messages:   Vec<AnthropicMessage>
}

#[derive(Serialize)]
struct AnthropicMessage {
    role:    String,
    content: String
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>
}

#[derive(Deserialize)]
struct AnthropicContent {
    text: String
}

#[derive(Serialize)]
struct OllamaRequest {
    model:  String,
    prompt: String,
    stream: bool
}

#[derive(Deserialize)]
struct OllamaResponse {
    response: String
}

impl LlmClient {
    /// Create new LLM client with default retry configuration
    pub fn new(provider: LlmProvider) -> Self {
        Self::with_retry_config(provider, RetryConfig::default())
    }

    /// Create new LLM client with custom retry configuration
    pub fn with_retry_config(provider: LlmProvider, retry_config: RetryConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        tracing::info!(provider = provider.name(), "Initialized LLM client");
        Self {
            provider,
            client,
            retry_config,
            rate_limiter: None
        }
    }

    /// Space out calls made through this client
    pub fn with_rate_limiter(mut self, rate_limiter: RateLimiter) -> Self {
        tracing::info!(
            min_interval_ms = rate_limiter.min_interval().as_millis() as u64,
            "Rate limiting LLM requests"
        );
        self.rate_limiter = Some(rate_limiter);
        self
    }

    async fn call_with_retry(&self, prompt: &str) -> AppResult<String> {
        let mut last_error = None;
        let mut delay = self.retry_config.initial_delay_ms;
        for attempt in 0..=self.retry_config.max_retries {
            if attempt > 0 {
                tracing::warn!(
                    attempt = attempt + 1,
                    max_attempts = self.retry_config.max_retries + 1,
                    delay_ms = delay,
                    "Retrying LLM request"
                );
                sleep(Duration::from_millis(delay)).await;
                delay = ((delay as f64 * self.retry_config.backoff_factor) as u64)
                    .min(self.retry_config.max_delay_ms);
            }
            if let Some(limiter) = &self.rate_limiter {
                limiter.acquire().await;
            }
            match self.call_provider(prompt).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    if is_retryable_error(&e) {
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| llm_api_error("All retry attempts failed")))
    }

    async fn call_provider(&self, prompt: &str) -> AppResult<String> {
        match &self.provider {
            LlmProvider::Gemini {
                api_key,
                model
            } => self.call_gemini(api_key, model, prompt).await,
            LlmProvider::OpenAI {
                api_key,
                model
            } => self.call_openai(api_key, model, prompt).await,
            LlmProvider::Anthropic {
                api_key,
                model
            } => self.call_anthropic(api_key, model, prompt).await,
            LlmProvider::Ollama {
                base_url,
                model
            } => self.call_ollama(base_url, model, prompt).await
        }
    }

    async fn call_gemini(&self, api_key: &str, model: &str, prompt: &str) -> AppResult<String> {
        let request = GeminiRequest {
            contents:          vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: prompt.to_string()
                }]
            }],
            generation_config: GeminiGenerationConfig {
                temperature:       GEMINI_TEMPERATURE,
                max_output_tokens: GEMINI_MAX_OUTPUT_TOKENS
            }
        };
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            model
        );
        let response = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&request)
            .send()
            .await
            .map_err(http_error)?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(llm_api_error(format!(
                "Gemini API error {}: {}",
                status, text
            )));
        }
        let result: GeminiResponse = response.json().await.map_err(http_error)?;
        result
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.clone())
            .ok_or_else(|| llm_api_error("Empty response from Gemini"))
    }

    async fn call_openai(&self, api_key: &str, model: &str, prompt: &str) -> AppResult<String> {
        let request = OpenAIRequest {
            model:    model.to_string(),
            messages: vec![OpenAIRequestMessage {
                role:    String::from("user"),
                content: prompt.to_string()
            }]
        };
        let response = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .header("Authorization", format!("Bearer {}", api_key))
            .json(&request)
            .send()
            .await
            .map_err(http_error)?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(llm_api_error(format!(
                "OpenAI API error {}: {}",
                status, text
            )));
        }
        let result: OpenAIResponse = response.json().await.map_err(http_error)?;
        result
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| llm_api_error("Empty response from OpenAI"))
    }

    async fn call_anthropic(&self, api_key: &str, model: &str, prompt: &str) -> AppResult<String> {
        let request = AnthropicRequest {
            model:      model.to_string(),
            max_tokens: 1024,
            messages:   vec![AnthropicMessage {
                role:    String::from("user"),
                content: prompt.to_string()
            }]
        };
        let response = self
            .client
            .post("https://api.anthropic.com/v1/messages")
            .header("x-api-key", api_key)
            .header("anthropic-version", "2023-06-01")
            .json(&request)
            .send()
            .await
            .map_err(http_error)?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(llm_api_error(format!(
                "Anthropic API error {}: {}",
                status, text
            )));
        }
        let result: AnthropicResponse = response.json().await.map_err(http_error)?;
        result
            .content
            .first()
            .map(|c| c.text.clone())
            .ok_or_else(|| llm_api_error("Empty response from Anthropic"))
    }

    async fn call_ollama(&self, base_url: &str, model: &str, prompt: &str) -> AppResult<String> {
        let request = OllamaRequest {
            model:  model.to_string(),
            prompt: prompt.to_string(),
            stream: false
        };
        let url = format!("{}/api/generate", base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(http_error)?;
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(llm_api_error(format!(
                "Ollama API error {}: {}",
                status, text
            )));
        }
        let result: OllamaResponse = response.json().await.map_err(http_error)?;
        Ok(result.response)
    }
}

#[async_trait]
impl LanguageModel for LlmClient {
    async fn complete(&self, request: &PromptRequest) -> AppResult<Completion> {
        let text = self.call_with_retry(&request.to_prompt()).await?;
        Ok(Completion {
            text
        })
    }
}

fn is_retryable_error(error: &masterror::AppError) -> bool {
    let msg = error.to_string().to_lowercase();
    msg.contains("timeout")
        || msg.contains("connection")
        || msg.contains("429")
        || msg.contains("rate limit")
        || msg.contains("500")
        || msg.contains("502")
        || msg.contains("503")
        || msg.contains("504")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_sql_fence() {
        assert_eq!(strip_code_fences("```sql\nSELECT 1\n```"), "SELECT 1");
    }

    #[test]
    fn test_strip_bare_fence() {
        assert_eq!(strip_code_fences("```\nSELECT 1\n```\n"), "SELECT 1");
    }

    #[test]
    fn test_strip_without_fence() {
        assert_eq!(strip_code_fences("  SELECT 1  "), "SELECT 1");
    }

    #[test]
    fn test_strip_crlf_fence() {
        assert_eq!(strip_code_fences("```sql\r\nSELECT 1\r\n```"), "SELECT 1");
        assert_eq!(strip_code_fences("```\r\nSELECT 1\r\n```\r\n"), "SELECT 1");
    }

    #[test]
    fn test_strip_same_line_sql_tag() {
        assert_eq!(strip_code_fences("```sql SELECT 1```"), "SELECT 1");
        assert_eq!(
            strip_code_fences("```sql SELECT id\nFROM users\n```"),
            "SELECT id\nFROM users"
        );
    }

    #[test]
    fn test_strip_single_line_fence() {
        assert_eq!(strip_code_fences("```SELECT 1```"), "SELECT 1");
    }

    #[test]
    fn test_client_errors_are_not_retried() {
        assert!(!is_retryable_error(&llm_api_error("Gemini API error 400: bad")));
    }

    #[test]
    fn test_client_keeps_rate_limiter() {
        let client = LlmClient::new(LlmProvider::Ollama {
            base_url: "http://localhost:11434".into(),
            model:    "llama3.2".into()
        })
        .with_rate_limiter(RateLimiter::new(Duration::from_millis(4000)));
        let limiter = client.rate_limiter.as_ref().map(RateLimiter::min_interval);
        assert_eq!(limiter, Some(Duration::from_millis(4000)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limiter_spaces_calls() {
        let limiter = RateLimiter::new(Duration::from_secs(4));
        let start = Instant::now();
        limiter.acquire().await;
        assert!(Instant::now() - start < Duration::from_secs(1));
        limiter.acquire().await;
        assert!(Instant::now() - start >= Duration::from_secs(4));
    }
}
