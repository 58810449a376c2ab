//! Check command

use super::{corpus_path, load_catalog};
use crate::app::OutputFormat;
use crate::output;
use anyhow::Result;
use menusift_core::Config;

pub fn run(config: &Config, format: OutputFormat) -> Result<()> {
    let (_, _, report) = load_catalog(config)?;
    print!("{}", output::format_report(&report, corpus_path(config)?, format));
    Ok(())
}
