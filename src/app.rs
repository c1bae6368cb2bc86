//! Use cases and their wiring.
//!
//! - [`ProcessQuestion`] answers one chat question
//! - [`IndexDatabase`] describes uncatalogued tables in batches
//! - [`Services`] connects the concrete collaborators from [`Config`]

mod indexer;
mod question;
mod types;

use std::{fs::read_to_string, sync::Arc, time::Duration};

use clap::ValueEnum;
pub use indexer::IndexDatabase;
pub use question::{DefaultContext, ProcessQuestion, SQL_SYSTEM_PROMPT};
pub use types::{IndexReport, QueryOutcome, QuestionRequest};

use crate::{
    catalog::{CatalogStore, PgCatalogStore},
    cli::Provider,
    config::Config,
    database::{DatabaseGateway, PgDatabase, connect_pool},
    error::{AppResult, config_error, file_read_error},
    llm::{LanguageModel, LlmClient, LlmProvider, RateLimiter},
    messaging::{MessageGateway, TelegramClient},
    schema::Schema,
    validator::Validator
};

/// Resolve the provider named in configuration, defaulting to Gemini
pub fn resolve_provider(name: Option<&str>) -> AppResult<Provider> {
    match name {
        None => Ok(Provider::Gemini),
        Some(name) => Provider::from_str(name, true)
            .map_err(|_| config_error(format!("Unknown LLM provider '{}'", name)))
    }
}

/// Get effective model name
pub fn get_effective_model(model: Option<String>, provider: &Provider) -> String {
    model.unwrap_or_else(|| provider.default_model().to_string())
}

/// Build LLM provider from configuration values
pub fn build_llm_provider(
    provider: Provider,
    api_key: Option<String>,
    model: String,
    ollama_url: String
) -> AppResult<LlmProvider> {
    match provider {
        Provider::Gemini => {
            let key = api_key.ok_or_else(|| {
                config_error("API key required for Gemini (use LLM_API_KEY or GEMINI_API_KEY)")
            })?;
            Ok(LlmProvider::Gemini {
                api_key: key,
                model
            })
        }
        Provider::OpenAI => {
            let key = api_key
                .ok_or_else(|| config_error("API key required for OpenAI (use LLM_API_KEY)"))?;
            Ok(LlmProvider::OpenAI {
                api_key: key,
                model
            })
        }
        Provider::Anthropic => {
            let key = api_key
                .ok_or_else(|| config_error("API key required for Anthropic (use LLM_API_KEY)"))?;
            Ok(LlmProvider::Anthropic {
                api_key: key,
                model
            })
        }
        Provider::Ollama => Ok(LlmProvider::Ollama {
            base_url: ollama_url,
            model
        })
    }
}

/// LLM provider described by the `[llm]` section
pub fn llm_provider_from_config(config: &Config) -> AppResult<LlmProvider> {
    let provider = resolve_provider(config.llm.provider.as_deref())?;
    let model = get_effective_model(config.llm.model.clone(), &provider);
    let ollama_url = config
        .llm
        .ollama_url
        .clone()
        .unwrap_or_else(|| String::from("http://localhost:11434"));
    build_llm_provider(provider, config.llm.api_key.clone(), model, ollama_url)
}

/// Default context from `[context].schema_file`, or the live schema
pub fn load_default_context(config: &Config) -> AppResult<DefaultContext> {
    match &config.context.schema_file {
        None => Ok(DefaultContext::LiveSchema),
        Some(path) => {
            let path_str = path.display().to_string();
            let ddl = read_to_string(path).map_err(|e| file_read_error(&path_str, e))?;
            Ok(DefaultContext::Static(Schema::parse(&ddl)?.to_summary()))
        }
    }
}

/// Concrete collaborators shared by the use cases.
#[derive(Clone)]
pub struct Services {
    pub llm:       Arc<dyn LanguageModel>,
    pub database:  Arc<dyn DatabaseGateway>,
    pub catalog:   Arc<dyn CatalogStore>,
    pub messenger: Option<Arc<dyn MessageGateway>>
}

impl Services {
    /// Connect to the database and build the language-model client.
    ///
    /// The messaging client is only built when a bot token is configured.
    /// `rate_limited` spaces language-model calls by
    /// `[indexer].request_delay_ms`.
    pub async fn connect(config: &Config, rate_limited: bool) -> AppResult<Self> {
        let pool = connect_pool(&config.database).await?;
        let catalog = PgCatalogStore::new(pool.clone());
        catalog.ensure_table().await?;

        let mut client =
            LlmClient::with_retry_config(llm_provider_from_config(config)?, config.retry.clone());
        if rate_limited {
            client = client.with_rate_limiter(RateLimiter::new(Duration::from_millis(
                config.indexer.request_delay_ms
            )));
        }

        let messenger = config.telegram.bot_token.as_deref().map(|token| {
            Arc::new(TelegramClient::new(&config.telegram.api_base, token))
                as Arc<dyn MessageGateway>
        });

        Ok(Self {
            llm: Arc::new(client),
            database: Arc::new(PgDatabase::new(pool, &config.database)),
            catalog: Arc::new(catalog),
            messenger
        })
    }

    pub fn process_question(&self, config: &Config) -> AppResult<ProcessQuestion> {
        Ok(ProcessQuestion::new(
            self.llm.clone(),
            self.database.clone(),
            self.catalog.clone()
        )
        .with_validator(Validator::with_strict(config.validator.strict))
        .with_default_context(load_default_context(config)?))
    }

    pub fn index_database(&self, config: &Config) -> IndexDatabase {
        IndexDatabase::new(
            self.llm.clone(),
            self.database.clone(),
            self.catalog.clone(),
            &config.indexer
        )
    }
}
