//! CLI argument definitions

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "menusift")]
#[command(
    author,
    version,
    about = "Find catalog dishes that fit a dietary request"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to MENUSIFT_CONFIG or the user config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Catalog file (.csv or .json)
    #[arg(long, global = true, env = "MENUSIFT_CORPUS")]
    pub corpus: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "cli")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ask for recommendations (uses the configured LLM service)
    Ask(AskArgs),

    /// Run the decision engine offline with explicit constraints
    Filter(FilterArgs),

    /// Show the attribute schema
    Schema,

    /// Validate configuration and catalog
    Check,
}

#[derive(Args)]
pub struct AskArgs {
    /// Request in natural language
    #[arg(required = true)]
    pub query: Vec<String>,

    /// Stop after selection; do not generate an answer
    #[arg(long)]
    pub no_answer: bool,

    /// Embed the catalog and use semantic ranking
    #[arg(long)]
    pub semantic: bool,
}

#[derive(Args)]
pub struct FilterArgs {
    /// Request text (drives the fallback threshold)
    pub query: Vec<String>,

    /// Constraints as a JSON object, e.g. '{"is_vegano": true, "kcal": "<400"}'
    #[arg(short, long, default_value = "{}")]
    pub constraints: String,

    /// Also print the context blocks handed to answer generation
    #[arg(long)]
    pub show_context: bool,
}

#[derive(Clone, Copy, ValueEnum, Default, PartialEq, Eq, Debug)]
pub enum OutputFormat {
    #[default]
    Cli,
    Json,
    Md,
}
