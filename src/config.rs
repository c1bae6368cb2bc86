//! Configuration loading and management.
//!
//! Configuration is loaded from multiple sources with the following precedence
//! (highest to lowest):
//!
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. `.sql-query-bot.toml` in current directory (or the `--config` file)
//! 4. `~/.config/sql-query-bot/config.toml`
//! 5. Default values
//!
//! # Configuration File Format
//!
//! ```toml
//! [llm]
//! provider = "gemini"          # gemini, openai, anthropic, ollama
//! model = "gemini-1.5-flash-latest"
//! api_key = "..."              # or use LLM_API_KEY / GEMINI_API_KEY
//!
//! [retry]
//! max_retries = 3
//! initial_delay_ms = 1000
//!
//! [telegram]
//! bot_token = "123:abc"        # or TELEGRAM_BOT_TOKEN
//!
//! [database]
//! url = "postgres://bot_reader@localhost/app"   # or DATABASE_URL
//! schema = "public"
//! statement_timeout_ms = 10000
//!
//! [server]
//! host = "0.0.0.0"
//! port = 8080
//! webhook_path = "/telegram-bot"
//!
//! [indexer]
//! batch_size = 5
//! request_delay_ms = 4000
//! excluded_tables = ["bot_table_metadata", "bot_query_audit_log"]
//!
//! [validator]
//! strict = false
//!
//! [context]
//! schema_file = "schema.sql"
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Description |
//! |----------|-------------|
//! | `LLM_API_KEY` | API key for the LLM provider |
//! | `GEMINI_API_KEY` | Fallback API key when `LLM_API_KEY` is unset |
//! | `LLM_PROVIDER` | Provider name |
//! | `LLM_MODEL` | Model identifier |
//! | `OLLAMA_URL` | Ollama base URL |
//! | `TELEGRAM_BOT_TOKEN` | Telegram bot token |
//! | `DATABASE_URL` | PostgreSQL connection string |
//! | `BOT_HOST` / `BOT_PORT` | Webhook listen address |

use std::{
    env, fs,
    path::{Path, PathBuf}
};

use serde::Deserialize;

use crate::error::{AppResult, config_error};

/// Application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub llm:       LlmConfig,
    #[serde(default)]
    pub retry:     RetryConfig,
    #[serde(default)]
    pub telegram:  TelegramConfig,
    #[serde(default)]
    pub database:  DatabaseConfig,
    #[serde(default)]
    pub server:    ServerConfig,
    #[serde(default)]
    pub indexer:   IndexerConfig,
    #[serde(default)]
    pub validator: ValidatorConfig,
    #[serde(default)]
    pub context:   ContextConfig
}

/// LLM provider configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider:   Option<String>,
    pub api_key:    Option<String>,
    pub model:      Option<String>,
    pub ollama_url: Option<String>
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider:   None,
            api_key:    None,
            model:      None,
            ollama_url: Some(String::from("http://localhost:11434"))
        }
    }
}

/// Retry configuration for LLM requests
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries:      u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms:     u64,
    pub backoff_factor:   f64
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries:      3,
            initial_delay_ms: 1000,
            max_delay_ms:     30000,
            backoff_factor:   2.0
        }
    }
}

/// Telegram Bot API settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub bot_token: Option<String>,
    pub api_base:  String
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            api_base:  String::from("https://api.telegram.org")
        }
    }
}

/// PostgreSQL connection settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url:                  Option<String>,
    /// Schema whose tables are introspected and indexed
    pub schema:               String,
    pub max_connections:      u32,
    pub statement_timeout_ms: u64
}

impl DatabaseConfig {
    /// Connection URL or a configuration error naming how to set it
    pub fn connection_url(&self) -> AppResult<&str> {
        self.url
            .as_deref()
            .ok_or_else(|| config_error("Database URL required (set [database].url or DATABASE_URL)"))
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url:                  None,
            schema:               String::from("public"),
            max_connections:      5,
            statement_timeout_ms: 10_000
        }
    }
}

/// Webhook server settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host:         String,
    pub port:         u16,
    pub webhook_path: String
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host:         String::from("0.0.0.0"),
            port:         8080,
            webhook_path: String::from("/telegram-bot")
        }
    }
}

/// Batch indexing job settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    /// Tables described per run
    pub batch_size:       usize,
    /// Minimum gap between two language-model calls
    pub request_delay_ms: u64,
    /// Tables never offered to the language model
    pub excluded_tables:  Vec<String>
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            batch_size:       5,
            request_delay_ms: 4000,
            excluded_tables:  vec![
                String::from("bot_table_metadata"),
                String::from("bot_query_audit_log"),
            ]
        }
    }
}

/// SQL validator settings
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Additionally require the SQL to parse as exactly one query
    pub strict: bool
}

/// Fallback schema context used when no catalog table matches a question
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ContextConfig {
    /// DDL file rendered into the prompt; the live schema is used otherwise
    pub schema_file: Option<PathBuf>
}

impl Config {
    /// Load configuration from file and environment
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables
    /// 2. Explicit config file, or `.sql-query-bot.toml` in current directory
    /// 3. Config file in home directory (~/.config/sql-query-bot/config.toml)
    /// 4. Default values
    pub fn load(explicit: Option<&Path>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(home) = env::var_os("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("sql-query-bot")
                .join("config.toml");
            if home_config.exists() {
                config = Self::from_file(&home_config)?;
            }
        }

        match explicit {
            Some(path) => config = Self::from_file(path)?,
            None => {
                let local_config = PathBuf::from(".sql-query-bot.toml");
                if local_config.exists() {
                    config = Self::from_file(&local_config)?;
                }
            }
        }

        config.apply_env(|key| env::var(key).ok());
        Ok(config)
    }

    /// Read and parse a TOML config file
    pub fn from_file(path: &Path) -> AppResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| config_error(format!("Failed to read config file: {}", e)))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> AppResult<Self> {
        toml::from_str(content).map_err(|e| config_error(format!("Invalid config file: {}", e)))
    }

    /// Override values from environment variables, looked up through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>
    {
        if let Some(api_key) = lookup("LLM_API_KEY").or_else(|| lookup("GEMINI_API_KEY")) {
            self.llm.api_key = Some(api_key);
        }
        if let Some(provider) = lookup("LLM_PROVIDER") {
            self.llm.provider = Some(provider);
        }
        if let Some(model) = lookup("LLM_MODEL") {
            self.llm.model = Some(model);
        }
        if let Some(url) = lookup("OLLAMA_URL") {
            self.llm.ollama_url = Some(url);
        }
        if let Some(token) = lookup("TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = Some(token);
        }
        if let Some(url) = lookup("DATABASE_URL") {
            self.database.url = Some(url);
        }
        if let Some(host) = lookup("BOT_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("BOT_PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(e) => tracing::warn!(%port, error = %e, "Ignoring invalid BOT_PORT")
            }
        }
    }

    /// Telegram bot token or a configuration error naming how to set it
    pub fn bot_token(&self) -> AppResult<&str> {
        self.telegram.bot_token.as_deref().ok_or_else(|| {
            config_error("Telegram bot token required (set [telegram].bot_token or TELEGRAM_BOT_TOKEN)")
        })
    }
}
