//! JSON output formatter

use menusift_core::{AttributeSchema, LoadReport, Recommendation};
use serde_json::json;
use std::path::Path;

pub fn format_recommendation(rec: &Recommendation, answer: Option<&str>, context: &[String]) -> String {
    let mut value = serde_json::to_value(rec).unwrap_or_else(|_| json!({}));
    if let Some(obj) = value.as_object_mut() {
        if let Some(text) = answer {
            obj.insert("answer".to_string(), json!(text));
        }
        if !context.is_empty() {
            obj.insert("context".to_string(), json!(context));
        }
    }
    pretty(&value)
}

pub fn format_schema(schema: &AttributeSchema) -> String {
    pretty(&json!(schema.specs()))
}

pub fn format_report(report: &LoadReport, path: &Path) -> String {
    pretty(&json!({
        "corpus": path.display().to_string(),
        "items": report.items,
        "flagged": report.flagged,
    }))
}

fn pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string()) + "\n"
}
