//! # SQL Query Bot
//!
//! Telegram chatbot that answers questions about a PostgreSQL database.
//!
//! # Architecture
//!
//! ```text
//! Telegram ──▶ webhook ──▶ rank catalog ──▶ LLM ──▶ validate ──▶ PostgreSQL
//!                 ▲                                                  │
//!                 └──────────── formatted HTML reply ◀───────────────┘
//! ```
//!
//! A separate `index` job asks the LLM to describe tables that have no
//! catalog entry yet, a few tables per run.
//!
//! # Quick Start
//!
//! ```bash
//! export DATABASE_URL="postgres://bot_reader@localhost/app"
//! export GEMINI_API_KEY="..."
//! export TELEGRAM_BOT_TOKEN="123:abc"
//!
//! # Build the table catalog
//! sql-query-bot index --all
//!
//! # Serve the webhook
//! sql-query-bot serve --port 8080
//!
//! # Offline helpers
//! sql-query-bot validate "SELECT * FROM users"
//! sql-query-bot rank --catalog catalog.json "show me recent orders"
//! ```
//!
//! # Exit Codes
//!
//! - `0` - Success (for `validate`: the SQL is allowed)
//! - `1` - Runtime or configuration error
//! - `2` - `validate` rejected the SQL

use std::{
    fs::read_to_string,
    io::{self, Read},
    path::Path,
    process,
    sync::Arc,
    time::Duration
};

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use sql_query_bot::{
    app::{QuestionRequest, Services},
    catalog::TableDescriptor,
    cli::{Cli, Commands, Format},
    config::Config,
    error::{AppResult, config_error, file_read_error},
    output::{OutputFormat, OutputOptions, format_ranking, format_verdict},
    ranker::rank_scored,
    server::{BotState, serve},
    validator::Validator
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .with_writer(io::stderr)
        .init();

    match run().await {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

async fn run() -> AppResult<i32> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Validate {
            sql,
            strict,
            output_format,
            no_color
        } => {
            let sql = read_input(&sql)?;
            let verdict = Validator::with_strict(strict).validate(&sql);
            println!(
                "{}",
                format_verdict(&sql, &verdict, &output_options(output_format, no_color))
            );
            Ok(if verdict.is_valid() { 0 } else { 2 })
        }
        Commands::Rank {
            catalog,
            question,
            output_format,
            no_color
        } => {
            let catalog = load_catalog_file(&catalog)?;
            let ranked = rank_scored(&question, &catalog);
            println!(
                "{}",
                format_ranking(&question, &ranked, &output_options(output_format, no_color))
            );
            Ok(0)
        }
        Commands::Ask {
            question
        } => {
            let config = Config::load(cli.config.as_deref())?;
            let services = Services::connect(&config, false).await?;
            let use_case = services.process_question(&config)?;
            let pb = spinner("Asking...");
            let outcome = use_case
                .execute(&QuestionRequest {
                    chat_id: 0,
                    question
                })
                .await;
            pb.finish_and_clear();
            if let Some(sql) = &outcome.sql {
                eprintln!("SQL: {}", sql);
            }
            println!("{}", outcome.formatted_response);
            Ok(if outcome.success { 0 } else { 1 })
        }
        Commands::Index {
            all
        } => {
            let config = Config::load(cli.config.as_deref())?;
            let services = Services::connect(&config, true).await?;
            let job = services.index_database(&config);
            let pb = spinner("Indexing tables...");
            let (mut trained, mut failed) = (0, 0);
            loop {
                let report = job.execute().await?;
                trained += report.trained;
                failed += report.failed;
                pb.set_message(format!(
                    "Indexed {} table(s), {} remaining",
                    trained, report.remaining
                ));
                let attempted = report.trained + report.failed;
                if !all || report.remaining == 0 || attempted == 0 {
                    pb.finish_and_clear();
                    println!(
                        "Indexed {} table(s), {} failed, {} remaining",
                        trained, failed, report.remaining
                    );
                    break;
                }
            }
            Ok(0)
        }
        Commands::Serve {
            host,
            port
        } => {
            let config = Config::load(cli.config.as_deref())?;
            config.bot_token()?;
            let services = Services::connect(&config, false).await?;
            let messenger = services
                .messenger
                .clone()
                .ok_or_else(|| config_error("Telegram bot token required"))?;
            let state = Arc::new(BotState {
                question: services.process_question(&config)?,
                messenger
            });
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            serve(state, &host, port, &config.server.webhook_path).await?;
            Ok(0)
        }
    }
}

/// Read argument text, or stdin for "-"
fn read_input(arg: &str) -> AppResult<String> {
    if arg == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|e| file_read_error("stdin", e))?;
        Ok(buffer)
    } else {
        Ok(arg.to_string())
    }
}

fn load_catalog_file(path: &Path) -> AppResult<Vec<TableDescriptor>> {
    let path_str = path.display().to_string();
    let content = read_to_string(path).map_err(|e| file_read_error(&path_str, e))?;
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );
    if is_yaml {
        serde_yaml::from_str(&content)
            .map_err(|e| config_error(format!("Invalid catalog file '{}': {}", path_str, e)))
    } else {
        serde_json::from_str(&content)
            .map_err(|e| config_error(format!("Invalid catalog file '{}': {}", path_str, e)))
    }
}

fn output_options(format: Format, no_color: bool) -> OutputOptions {
    OutputOptions {
        format:  match format {
            Format::Text => OutputFormat::Text,
            Format::Json => OutputFormat::Json,
            Format::Yaml => OutputFormat::Yaml
        },
        colored: !no_color
    }
}

fn spinner(message: &'static str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
