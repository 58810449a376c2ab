//! Corpus loading from CSV and JSON exports
//!
//! Every schema attribute is read from a column (CSV) or key (JSON) of the same
//! name and coerced to its declared type. Values that cannot be coerced are
//! dropped and flagged in the [`LoadReport`].

use super::{AttributeValue, Corpus, Item, LoadReport};
use crate::error::{MenuSiftError, Result, SchemaViolation};
use crate::schema::AttributeSchema;
use csv::ReaderBuilder;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

const ID_COLUMNS: &[&str] = &["id"];
const NAME_COLUMNS: &[&str] = &["name", "nombre_plato", "nombre"];
const DESCRIPTION_COLUMNS: &[&str] = &["description", "ingredientes"];
const ALLERGEN_COLUMNS: &[&str] = &["alergenos", "allergens"];

/// Load a corpus, choosing the format from the file extension
pub fn load_path(path: &Path, schema: &AttributeSchema) -> Result<(Corpus, LoadReport)> {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("csv") => load_csv(path, schema),
        Some("json") => load_json(path, schema),
        other => Err(MenuSiftError::InvalidInput(format!(
            "Unsupported corpus format {:?} for {}",
            other.unwrap_or(""),
            path.display()
        ))),
    }
}

/// Load a corpus from a CSV file with a header row
pub fn load_csv(path: &Path, schema: &AttributeSchema) -> Result<(Corpus, LoadReport)> {
    let content = fs::read_to_string(path).map_err(|e| {
        MenuSiftError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to read CSV file {:?}: {}", path, e),
        ))
    })?;
    parse_csv(&content, schema)
}

/// Parse CSV text into a corpus
pub fn parse_csv(content: &str, schema: &AttributeSchema) -> Result<(Corpus, LoadReport)> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers = reader.headers()?.clone();
    let column = |candidates: &[&str]| {
        headers
            .iter()
            .position(|h| candidates.iter().any(|c| h.eq_ignore_ascii_case(c)))
    };

    let id_col = column(ID_COLUMNS);
    let name_col = column(NAME_COLUMNS).ok_or_else(|| {
        MenuSiftError::Parse(format!(
            "CSV has no name column (expected one of {:?})",
            NAME_COLUMNS
        ))
    })?;
    let description_col = column(DESCRIPTION_COLUMNS);
    let allergen_col = column(ALLERGEN_COLUMNS);

    let attribute_cols: Vec<(usize, &str)> = schema
        .iter()
        .filter_map(|spec| {
            headers
                .iter()
                .position(|h| h == spec.name)
                .map(|idx| (idx, spec.name.as_str()))
        })
        .collect();

    let mut flagged = Vec::new();
    let mut items = Vec::new();

    for (row_num, result) in reader.records().enumerate() {
        let record = result.map_err(|e| {
            MenuSiftError::Parse(format!("Failed to parse CSV row {}: {}", row_num + 1, e))
        })?;
        let field = |idx: Option<usize>| idx.and_then(|i| record.get(i)).unwrap_or("");

        let id = match field(id_col) {
            "" => (row_num + 1).to_string(),
            id => id.to_string(),
        };

        let mut description = field(description_col).to_string();
        let allergens = field(allergen_col);
        if !allergens.is_empty() {
            if !description.is_empty() {
                description.push('\n');
            }
            description.push_str("Alérgenos: ");
            description.push_str(allergens);
        }

        let mut attributes = BTreeMap::new();
        for &(idx, name) in &attribute_cols {
            let raw = record.get(idx).unwrap_or("");
            if raw.is_empty() {
                continue;
            }
            // Columns come from the schema, so the lookup always succeeds.
            let Some(kind) = schema.type_of(name) else {
                continue;
            };
            match AttributeValue::parse_text(raw, kind) {
                Some(value) => {
                    attributes.insert(name.to_string(), value);
                }
                None => flagged.push(
                    SchemaViolation::new(name, format!("cannot read '{}' as {}", raw, kind))
                        .for_item(id.as_str()),
                ),
            }
        }

        items.push(Item {
            id,
            name: field(Some(name_col)).to_string(),
            description,
            attributes,
        });
    }

    finish(items, flagged, schema)
}

#[derive(Deserialize)]
struct RawItem {
    id: serde_json::Value,
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    attributes: serde_json::Map<String, serde_json::Value>,
}

/// Load a corpus from a JSON array of `{id, name, description, attributes}`
pub fn load_json(path: &Path, schema: &AttributeSchema) -> Result<(Corpus, LoadReport)> {
    let content = fs::read_to_string(path)?;
    parse_json(&content, schema)
}

/// Parse JSON text into a corpus
pub fn parse_json(content: &str, schema: &AttributeSchema) -> Result<(Corpus, LoadReport)> {
    let raw: Vec<RawItem> = serde_json::from_str(content)?;

    let mut flagged = Vec::new();
    let mut items = Vec::with_capacity(raw.len());

    for entry in raw {
        let id = match entry.id {
            serde_json::Value::String(s) => s,
            serde_json::Value::Number(n) => n.to_string(),
            other => {
                return Err(MenuSiftError::Parse(format!(
                    "Item id must be a string or number, found {}",
                    other
                )))
            }
        };

        let mut attributes = BTreeMap::new();
        for (name, value) in entry.attributes {
            if value.is_null() {
                continue;
            }
            let Some(kind) = schema.type_of(&name) else {
                flagged.push(
                    SchemaViolation::new(name.as_str(), "is not in the attribute schema")
                        .for_item(id.as_str()),
                );
                continue;
            };
            match AttributeValue::coerce_json(&value, kind) {
                Some(v) => {
                    attributes.insert(name, v);
                }
                None => flagged.push(
                    SchemaViolation::new(name.as_str(), format!("cannot read {} as {}", value, kind))
                        .for_item(id.as_str()),
                ),
            }
        }

        items.push(Item {
            id,
            name: entry.name,
            description: entry.description,
            attributes,
        });
    }

    finish(items, flagged, schema)
}

fn finish(
    items: Vec<Item>,
    flagged: Vec<SchemaViolation>,
    schema: &AttributeSchema,
) -> Result<(Corpus, LoadReport)> {
    for violation in &flagged {
        tracing::warn!("Corpus entry flagged: {}", violation);
    }
    let (corpus, mut report) = Corpus::new(items, schema)?;
    let mut all = flagged;
    all.append(&mut report.flagged);
    report.flagged = all;
    tracing::info!("Loaded {} catalog items", report.items);
    Ok((corpus, report))
}
