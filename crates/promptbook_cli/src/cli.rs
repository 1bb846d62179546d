//! Command-line surface.

use clap::{Parser, Subcommand};
use promptbook_core::Verdict;
use std::path::PathBuf;

/// Promptbook - knowledge base of evaluated image prompts.
#[derive(Parser, Debug)]
#[command(name = "promptbook", version, about = "Import, query and export image prompt notes.", long_about = None)]
pub struct Cli {
    /// SQLite database file (defaults to the platform data directory)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// TOML config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse a notes document and store its entries
    Import {
        /// Markdown notes document
        path: PathBuf,

        /// Keep the first occurrence of a repeated reference instead of failing
        #[arg(long)]
        keep_first: bool,
    },

    /// List entries matching all given filters
    Query {
        /// Only entries with this verdict (good, bad)
        #[arg(long)]
        verdict: Option<Verdict>,

        /// Only entries carrying this tag (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Case-insensitive substring of prompt or note
        #[arg(long)]
        text: Option<String>,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Show one entry by reference
    Get {
        reference: String,

        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// Full-text search over prompts and notes
    Search {
        text: String,

        /// Only hits with this verdict (good, bad)
        #[arg(long)]
        verdict: Option<Verdict>,

        /// Maximum number of hits
        #[arg(long, default_value_t = 20)]
        limit: u32,

        /// Pass text through as a raw FTS5 expression
        #[arg(long)]
        raw: bool,
    },

    /// List all known tags
    Tags,

    /// Write the store back as a notes document
    Export {
        /// Destination file
        path: PathBuf,

        /// Document title (overrides config)
        #[arg(long)]
        title: Option<String>,
    },
}
