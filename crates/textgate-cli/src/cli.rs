//! CLI command definitions using clap

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// textgate - route text operations to locally-hosted models
#[derive(Parser)]
#[command(name = "textgate")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file path (TOML)
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Override the models directory
    #[arg(long, global = true)]
    pub models_dir: Option<PathBuf>,

    /// Pre-load every configured model before serving
    #[arg(long, global = true)]
    pub eager: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Summarize a text
    Summarize {
        /// Text to summarize; use --file to read from disk instead
        #[arg(conflicts_with = "file")]
        text: Option<String>,

        /// Read the input text from a file
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Number of sentences in the summary
        #[arg(short = 'n', long, default_value_t = 5)]
        max_sentences: u8,

        /// ISO 639-1 code of the summary language
        #[arg(short, long, default_value = "en")]
        language: String,

        /// Correlation id attached to the request (generated if omitted)
        #[arg(long)]
        correlation_id: Option<String>,
    },

    /// Translate a text between supported languages
    Translate {
        #[arg(conflicts_with = "file")]
        text: Option<String>,

        /// Read the input text from a file
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Source language code
        #[arg(short, long)]
        source: String,

        /// Target language code
        #[arg(short, long)]
        target: String,

        #[arg(long)]
        correlation_id: Option<String>,
    },

    /// Classify a text into one of the given categories
    Classify {
        #[arg(conflicts_with = "file")]
        text: Option<String>,

        /// Read the input text from a file
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Candidate category labels (2-20), e.g. -g billing -g support
        #[arg(short = 'g', long = "category", required = true)]
        categories: Vec<String>,

        #[arg(long)]
        correlation_id: Option<String>,
    },

    /// Show the active per-operation limits
    Limits,

    /// Set the daily request limit for an operation
    SetLimit {
        /// Operation name (summarize, translate, classify)
        operation: String,

        /// New daily request limit; 0 denies all requests
        daily_limit: u64,
    },

    /// Show today's usage, optionally for a single operation
    Usage {
        #[arg(short, long)]
        operation: Option<String>,
    },

    /// Show platform health and per-model load status
    Health,
}
