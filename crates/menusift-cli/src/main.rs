//! MenuSift CLI
//!
//! Ask a tupper catalog for dishes that fit your diet.

use anyhow::Result;
use clap::Parser;
use menusift_core::error::exit_codes;
use menusift_core::{Config, MenuSiftError};

mod app;
mod commands;
mod output;

use app::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        let code = e
            .downcast_ref::<MenuSiftError>()
            .map(|e| e.exit_code())
            .unwrap_or(exit_codes::GENERAL_ERROR);
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(path) = cli.corpus {
        config.corpus_path = Some(path);
    }

    match cli.command {
        Commands::Ask(args) => commands::ask::run(args, &config, cli.format).await,
        Commands::Filter(args) => commands::filter::run(args, &config, cli.format),
        Commands::Schema => commands::schema::run(&config, cli.format),
        Commands::Check => commands::check::run(&config, cli.format),
    }
}
