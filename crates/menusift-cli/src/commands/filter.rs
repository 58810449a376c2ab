//! Filter command: the decision engine without any model calls

use super::load_catalog;
use crate::app::{FilterArgs, OutputFormat};
use crate::output;
use anyhow::Result;
use menusift_core::llm::{parse_json_object, Extraction};
use menusift_core::{run_query, Config, ConstraintSet, MenuSiftError};

pub fn run(args: FilterArgs, config: &Config, format: OutputFormat) -> Result<()> {
    let (schema, corpus, _) = load_catalog(config)?;
    let query = args.query.join(" ");

    let raw = parse_json_object(&args.constraints).map_err(|e| {
        MenuSiftError::InvalidInput(format!("--constraints must be a JSON object: {}", e))
    })?;
    let validated = ConstraintSet::from_raw(&raw, &schema);
    let extraction = Extraction {
        constraints: validated.constraints,
        dropped: validated.dropped,
        degraded: false,
    };

    let run = run_query(&corpus, config, &query, &extraction.constraints, &[])?;
    let recommendation = run.recommendation(&query, &extraction);
    let context = if args.show_context {
        run.blocks(&schema)
    } else {
        Vec::new()
    };

    print!(
        "{}",
        output::format_recommendation(&recommendation, None, &context, format)
    );
    Ok(())
}
