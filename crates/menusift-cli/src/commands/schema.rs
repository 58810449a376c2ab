//! Schema command

use crate::app::OutputFormat;
use crate::output;
use anyhow::Result;
use menusift_core::Config;

pub fn run(config: &Config, format: OutputFormat) -> Result<()> {
    let schema = config.attribute_schema()?;
    print!("{}", output::format_schema(&schema, format));
    Ok(())
}
