//! Output formatters

pub mod json;
pub mod markdown;
pub mod terminal;

use crate::app::OutputFormat;
use menusift_core::{AttributeSchema, LoadReport, Recommendation};
use std::path::Path;

/// Format a recommendation, with the generated answer when there is one
pub fn format_recommendation(
    rec: &Recommendation,
    answer: Option<&str>,
    context: &[String],
    format: OutputFormat,
) -> String {
    match format {
        OutputFormat::Json => json::format_recommendation(rec, answer, context),
        OutputFormat::Md => markdown::format_recommendation(rec, answer, context),
        OutputFormat::Cli => terminal::format_recommendation(rec, answer, context),
    }
}

pub fn format_schema(schema: &AttributeSchema, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => json::format_schema(schema),
        OutputFormat::Md => markdown::format_schema(schema),
        OutputFormat::Cli => terminal::format_schema(schema),
    }
}

pub fn format_report(report: &LoadReport, path: &Path, format: OutputFormat) -> String {
    match format {
        OutputFormat::Json => json::format_report(report, path),
        OutputFormat::Md => markdown::format_report(report, path),
        OutputFormat::Cli => terminal::format_report(report, path),
    }
}
