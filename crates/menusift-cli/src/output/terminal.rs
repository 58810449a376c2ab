//! Terminal output formatter

use menusift_core::{AttributeSchema, LoadReport, Recommendation};
use std::path::Path;

pub fn format_recommendation(rec: &Recommendation, answer: Option<&str>, context: &[String]) -> String {
    let mut output = String::new();

    if let Some(text) = answer {
        output.push_str(text.trim_end());
        output.push_str("\n\n");
    }

    output.push_str(&format!("Constraints: {}\n", rec.constraints));
    for violation in &rec.dropped {
        output.push_str(&format!("  dropped {}\n", violation));
    }
    if rec.extraction_degraded {
        output.push_str("  (extraction unavailable, showing unconstrained results)\n");
    }
    output.push_str(&format!(
        "Mode: {} ({} exact, {} shown of {})\n",
        rec.mode,
        rec.exact_matches,
        rec.presented,
        rec.items.len()
    ));
    output.push('\n');

    for (i, item) in rec.presented_items().iter().enumerate() {
        match item.score {
            Some(score) => output.push_str(&format!(
                "{:>2}. {} #{} [{:.2}]\n",
                i + 1,
                item.name,
                item.id,
                score
            )),
            None => output.push_str(&format!("{:>2}. {} #{}\n", i + 1, item.name, item.id)),
        }
        if !item.violated.is_empty() {
            output.push_str(&format!("    misses: {}\n", item.violated.join(", ")));
        }
    }

    for block in context {
        output.push('\n');
        output.push_str(block);
        output.push('\n');
    }

    output
}

pub fn format_schema(schema: &AttributeSchema) -> String {
    let width = schema.iter().map(|s| s.name.len()).max().unwrap_or(0);
    let mut output = String::new();
    for spec in schema.iter() {
        output.push_str(&format!(
            "{:<width$}  {:<8}  {}",
            spec.name,
            spec.kind.as_str(),
            spec.display_label(),
            width = width
        ));
        if let Some(ref unit) = spec.unit {
            output.push_str(&format!(" ({})", unit));
        }
        output.push('\n');
    }
    output
}

pub fn format_report(report: &LoadReport, path: &Path) -> String {
    let mut output = format!("Corpus:   {}\nItems:    {}\n", path.display(), report.items);
    if report.is_clean() {
        output.push_str("Flagged:  none\n");
    } else {
        output.push_str(&format!("Flagged:  {}\n", report.flagged.len()));
        for violation in &report.flagged {
            output.push_str(&format!("  {}\n", violation));
        }
    }
    output
}
