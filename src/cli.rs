use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// SQL Query Bot - answer chat questions with read-only SQL
#[derive(Parser, Debug)]
#[command(name = "sql-query-bot")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Config file (defaults to .sql-query-bot.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the Telegram webhook server
    Serve {
        /// Listen address (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Listen port (overrides config)
        #[arg(short, long)]
        port: Option<u16>
    },

    /// Describe uncatalogued tables with the LLM and store the descriptions
    Index {
        /// Keep running batches until every table is indexed
        #[arg(long)]
        all: bool
    },

    /// Answer a question locally and print the reply
    Ask {
        /// Natural-language question
        question: String
    },

    /// Check whether SQL would be allowed to run (use - for stdin)
    Validate {
        /// SQL text or "-"
        sql: String,

        /// Also require the SQL to parse as a single query
        #[arg(long)]
        strict: bool,

        /// Output format
        #[arg(short = 'f', long, value_enum, default_value = "text")]
        output_format: Format,

        /// Disable colored output
        #[arg(long)]
        no_color: bool
    },

    /// Rank catalogued tables for a question
    Rank {
        /// JSON or YAML file with a list of table descriptors
        #[arg(long)]
        catalog: PathBuf,

        /// Natural-language question
        question: String,

        /// Output format
        #[arg(short = 'f', long, value_enum, default_value = "text")]
        output_format: Format,

        /// Disable colored output
        #[arg(long)]
        no_color: bool
    }
}

#[derive(Debug, Clone, PartialEq, Eq, ValueEnum)]
pub enum Provider {
    Gemini,
    #[value(name = "openai")]
    OpenAI,
    Anthropic,
    Ollama
}

impl Provider {
    /// Get default model for provider
    pub fn default_model(&self) -> &str {
        match self {
            Self::Gemini => "gemini-1.5-flash-latest",
            Self::OpenAI => "gpt-4",
            Self::Anthropic => "claude-sonnet-4-20250514",
            Self::Ollama => "llama3.2"
        }
    }
}

#[derive(Debug, Clone, ValueEnum)]
pub enum Format {
    Text,
    Json,
    Yaml
}
