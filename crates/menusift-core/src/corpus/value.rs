//! Typed attribute values and best-effort coercion from loose input

use crate::schema::AttributeType;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

lazy_static! {
    /// First number embedded in text; accepts decimal commas ("5,50 €")
    static ref NUMBER_RE: Regex = Regex::new(r"[-+]?\d+(?:[.,]\d+)?|[-+]?[.,]\d+").unwrap();
}

/// Value of one attribute on an item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Boolean(bool),
    Number(f64),
    /// Multi-valued categorical tag, lower-cased
    Category(Vec<String>),
}

impl AttributeValue {
    pub fn kind(&self) -> AttributeType {
        match self {
            AttributeValue::Boolean(_) => AttributeType::Boolean,
            AttributeValue::Number(_) => AttributeType::Number,
            AttributeValue::Category(_) => AttributeType::Category,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AttributeValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            AttributeValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_categories(&self) -> Option<&[String]> {
        match self {
            AttributeValue::Category(values) => Some(values),
            _ => None,
        }
    }

    /// Build a category value from raw tags, normalising case and dropping blanks
    /// and repeats. First occurrence order is kept.
    pub fn categories<I, S>(iter: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let values: Vec<String> = iter
            .into_iter()
            .map(|s| normalize_category(s.as_ref()))
            .filter(|s| !s.is_empty() && seen.insert(s.clone()))
            .collect();
        AttributeValue::Category(values)
    }

    /// Coerce a JSON value into the given attribute type
    pub fn coerce_json(value: &serde_json::Value, kind: AttributeType) -> Option<Self> {
        use serde_json::Value;

        match (kind, value) {
            (AttributeType::Boolean, Value::Bool(b)) => Some(AttributeValue::Boolean(*b)),
            (AttributeType::Boolean, Value::String(s)) => {
                parse_bool(s).map(AttributeValue::Boolean)
            }
            (AttributeType::Boolean, Value::Number(n)) => match n.as_i64() {
                Some(0) => Some(AttributeValue::Boolean(false)),
                Some(1) => Some(AttributeValue::Boolean(true)),
                _ => None,
            },
            (AttributeType::Number, Value::Number(n)) => {
                n.as_f64().filter(|f| f.is_finite()).map(AttributeValue::Number)
            }
            (AttributeType::Number, Value::String(s)) => {
                parse_number(s).map(AttributeValue::Number)
            }
            (AttributeType::Category, Value::String(s)) => {
                let value = AttributeValue::categories(split_categories(s));
                non_empty_category(value)
            }
            (AttributeType::Category, Value::Array(items)) => {
                let strings: Option<Vec<&str>> = items.iter().map(|v| v.as_str()).collect();
                non_empty_category(AttributeValue::categories(strings?))
            }
            _ => None,
        }
    }

    /// Parse a text cell into the given attribute type. Blank text means absent.
    pub fn parse_text(text: &str, kind: AttributeType) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        match kind {
            AttributeType::Boolean => parse_bool(text).map(AttributeValue::Boolean),
            AttributeType::Number => parse_number(text).map(AttributeValue::Number),
            AttributeType::Category => {
                non_empty_category(AttributeValue::categories(split_categories(text)))
            }
        }
    }
}

impl std::fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttributeValue::Boolean(b) => write!(f, "{}", b),
            AttributeValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{}", n)
                }
            }
            AttributeValue::Category(values) => f.write_str(&values.join(", ")),
        }
    }
}

fn non_empty_category(value: AttributeValue) -> Option<AttributeValue> {
    match &value {
        AttributeValue::Category(values) if values.is_empty() => None,
        _ => Some(value),
    }
}

/// Lower-case and trim a categorical tag
pub fn normalize_category(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn split_categories(text: &str) -> impl Iterator<Item = &str> {
    text.split([';', ',', '|'])
}

/// Parse a loose boolean ("true", "sí", "1", "no", ...)
pub fn parse_bool(text: &str) -> Option<bool> {
    match text.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "y" | "si" | "sí" | "verdadero" => Some(true),
        "false" | "0" | "no" | "n" | "falso" => Some(false),
        _ => None,
    }
}

/// Extract the first number from text, treating a decimal comma as a dot
pub fn parse_number(text: &str) -> Option<f64> {
    let m = NUMBER_RE.find(text)?;
    m.as_str()
        .replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_number_formats() {
        assert_eq!(parse_number("180"), Some(180.0));
        assert_eq!(parse_number("5,50 €"), Some(5.5));
        assert_eq!(parse_number("Energía: 95.2 kcal"), Some(95.2));
        assert_eq!(parse_number("n/a"), None);
    }

    #[test]
    fn test_parse_bool_variants() {
        assert_eq!(parse_bool("Sí"), Some(true));
        assert_eq!(parse_bool(" false "), Some(false));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn test_coerce_json() {
        assert_eq!(
            AttributeValue::coerce_json(&json!("true"), AttributeType::Boolean),
            Some(AttributeValue::Boolean(true))
        );
        assert_eq!(
            AttributeValue::coerce_json(&json!(2), AttributeType::Boolean),
            None
        );
        assert_eq!(
            AttributeValue::coerce_json(&json!("450"), AttributeType::Number),
            Some(AttributeValue::Number(450.0))
        );
        assert_eq!(
            AttributeValue::coerce_json(&json!(["Principal", "cena"]), AttributeType::Category),
            Some(AttributeValue::Category(vec![
                "principal".to_string(),
                "cena".to_string()
            ]))
        );
        assert_eq!(
            AttributeValue::coerce_json(&json!(true), AttributeType::Category),
            None
        );
    }

    #[test]
    fn test_parse_text_blank_is_absent() {
        assert_eq!(AttributeValue::parse_text("  ", AttributeType::Number), None);
        assert_eq!(
            AttributeValue::parse_text("Mediterránea; Casera", AttributeType::Category),
            Some(AttributeValue::Category(vec![
                "mediterránea".to_string(),
                "casera".to_string()
            ]))
        );
    }

    #[test]
    fn test_repeated_categories_collapse() {
        assert_eq!(
            AttributeValue::parse_text("India; Picante; india", AttributeType::Category),
            Some(AttributeValue::Category(vec![
                "india".to_string(),
                "picante".to_string()
            ]))
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(AttributeValue::Number(180.0).to_string(), "180");
        assert_eq!(AttributeValue::Number(5.5).to_string(), "5.5");
        assert_eq!(AttributeValue::Boolean(false).to_string(), "false");
    }
}
