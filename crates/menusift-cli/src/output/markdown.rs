//! Markdown output formatter

use menusift_core::{AttributeSchema, LoadReport, Recommendation};
use std::path::Path;

pub fn format_recommendation(rec: &Recommendation, answer: Option<&str>, context: &[String]) -> String {
    let mut output = String::from("# Recommendations\n\n");

    if let Some(text) = answer {
        output.push_str(text.trim_end());
        output.push_str("\n\n");
    }

    output.push_str(&format!("- **Constraints**: {}\n", rec.constraints));
    output.push_str(&format!("- **Mode**: {}\n", rec.mode));
    output.push_str(&format!("- **Exact matches**: {}\n\n", rec.exact_matches));

    for (i, item) in rec.presented_items().iter().enumerate() {
        output.push_str(&format!("## {}. {}\n\n", i + 1, item.name));
        output.push_str(&format!("- **ID**: `{}`\n", item.id));
        if let Some(score) = item.score {
            output.push_str(&format!("- **Score**: {:.2}\n", score));
        }
        if !item.violated.is_empty() {
            output.push_str(&format!("- **Misses**: {}\n", item.violated.join(", ")));
        }
        output.push('\n');
    }

    if rec.items.is_empty() {
        output.push_str("*No dishes found*\n");
    }

    if !context.is_empty() {
        output.push_str("## Context\n\n");
        for block in context {
            output.push_str("```\n");
            output.push_str(block);
            output.push_str("\n```\n\n");
        }
    }

    output
}

pub fn format_schema(schema: &AttributeSchema) -> String {
    let mut output = String::from("| Attribute | Type | Label | Unit |\n|---|---|---|---|\n");
    for spec in schema.iter() {
        output.push_str(&format!(
            "| `{}` | {} | {} | {} |\n",
            spec.name,
            spec.kind,
            spec.display_label(),
            spec.unit.as_deref().unwrap_or("")
        ));
    }
    output
}

pub fn format_report(report: &LoadReport, path: &Path) -> String {
    let mut output = format!(
        "# Catalog check\n\n- **Corpus**: `{}`\n- **Items**: {}\n",
        path.display(),
        report.items
    );
    if !report.is_clean() {
        output.push_str("\n## Flagged\n\n");
        for violation in &report.flagged {
            output.push_str(&format!("- {}\n", violation));
        }
    }
    output
}
