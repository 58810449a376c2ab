//! CLI command handlers

pub mod ask;
pub mod check;
pub mod filter;
pub mod schema;

use anyhow::{Context, Result};
use menusift_core::corpus::load_path;
use menusift_core::{AttributeSchema, Config, Corpus, LoadReport, MenuSiftError};
use std::path::Path;

/// Catalog path from `--corpus`, `MENUSIFT_CORPUS` or the config file
fn corpus_path(config: &Config) -> Result<&Path> {
    config.corpus_path.as_deref().ok_or_else(|| {
        MenuSiftError::InvalidInput(
            "no catalog given: pass --corpus, set MENUSIFT_CORPUS or corpus_path in the config"
                .to_string(),
        )
        .into()
    })
}

/// Validate configuration and load the catalog it points to
pub fn load_catalog(config: &Config) -> Result<(AttributeSchema, Corpus, LoadReport)> {
    let schema = config.validate()?;
    let path = corpus_path(config)?;
    let (corpus, report) =
        load_path(path, &schema).with_context(|| format!("loading {}", path.display()))?;
    Ok((schema, corpus, report))
}
