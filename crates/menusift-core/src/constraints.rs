//! Structured filtering intent extracted from a query
//!
//! A [`ConstraintSet`] is built from untrusted key/value output (usually an
//! LLM reply) by [`ConstraintSet::from_raw`], which keeps only keys declared in
//! the attribute schema and coerces loosely typed values where it can.

use crate::corpus::{normalize_category, AttributeValue};
use crate::error::{MenuSiftError, Result, SchemaViolation};
use crate::schema::{AttributeSchema, AttributeType};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

lazy_static! {
    /// Comparison string such as "<400", ">= 12,5" or "=300 kcal"
    static ref COMPARISON_RE: Regex =
        Regex::new(r"^\s*(<=|>=|=<|=>|==|≤|≥|<|>|=)?\s*([-+]?\d+(?:[.,]\d+)?)").unwrap();
}

/// Comparison operator of a numeric constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NumericOp {
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "=")]
    Eq,
}

impl NumericOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            NumericOp::Lt => "<",
            NumericOp::Le => "<=",
            NumericOp::Gt => ">",
            NumericOp::Ge => ">=",
            NumericOp::Eq => "=",
        }
    }

    pub fn holds(&self, value: f64, threshold: f64) -> bool {
        match self {
            NumericOp::Lt => value < threshold,
            NumericOp::Le => value <= threshold,
            NumericOp::Gt => value > threshold,
            NumericOp::Ge => value >= threshold,
            NumericOp::Eq => (value - threshold).abs() <= f64::EPSILON * threshold.abs().max(1.0),
        }
    }
}

impl fmt::Display for NumericOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NumericOp {
    type Err = MenuSiftError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "<" => Ok(NumericOp::Lt),
            "<=" | "=<" | "≤" => Ok(NumericOp::Le),
            ">" => Ok(NumericOp::Gt),
            ">=" | "=>" | "≥" => Ok(NumericOp::Ge),
            "=" | "==" | "" => Ok(NumericOp::Eq),
            other => Err(MenuSiftError::Parse(format!(
                "Unknown comparison operator '{}'",
                other
            ))),
        }
    }
}

/// `(operator, threshold)` pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericConstraint {
    pub op: NumericOp,
    pub threshold: f64,
}

impl NumericConstraint {
    pub fn new(op: NumericOp, threshold: f64) -> Self {
        Self { op, threshold }
    }

    pub fn holds(&self, value: f64) -> bool {
        self.op.holds(value, self.threshold)
    }

    /// How far `value` is from satisfying the constraint (0 when it holds)
    pub fn miss_distance(&self, value: f64) -> f64 {
        if self.holds(value) {
            0.0
        } else {
            (value - self.threshold).abs()
        }
    }

    /// Parse a comparison string. A bare number means equality.
    pub fn parse(text: &str) -> Option<Self> {
        let caps = COMPARISON_RE.captures(text)?;
        let op = caps
            .get(1)
            .map(|m| m.as_str())
            .unwrap_or("")
            .parse()
            .ok()?;
        let threshold = caps[2].replace(',', ".").parse::<f64>().ok()?;
        threshold.is_finite().then_some(Self { op, threshold })
    }

    fn from_json(value: &serde_json::Value) -> Option<Self> {
        use serde_json::Value;

        match value {
            Value::Number(n) => n
                .as_f64()
                .filter(|f| f.is_finite())
                .map(|t| Self::new(NumericOp::Eq, t)),
            Value::String(s) => Self::parse(s),
            Value::Object(obj) => {
                let op = obj
                    .get("op")
                    .or_else(|| obj.get("operator"))
                    .and_then(|v| v.as_str())
                    .unwrap_or("=")
                    .parse()
                    .ok()?;
                let threshold = obj
                    .get("threshold")
                    .or_else(|| obj.get("value"))
                    .and_then(|v| match v {
                        Value::Number(n) => n.as_f64(),
                        Value::String(s) => crate::corpus::parse_number(s),
                        _ => None,
                    })
                    .filter(|f| f.is_finite())?;
                Some(Self::new(op, threshold))
            }
            _ => None,
        }
    }
}

impl fmt::Display for NumericConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.op, AttributeValue::Number(self.threshold))
    }
}

/// Per-query constraint set
///
/// Boolean and numeric constraints hold one condition per attribute.
/// Categorical constraints accept any value of their set (OR within an
/// attribute); all attributes must hold (AND across attributes).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstraintSet {
    #[serde(default)]
    boolean: BTreeMap<String, bool>,
    #[serde(default)]
    numeric: BTreeMap<String, NumericConstraint>,
    #[serde(default)]
    categorical: BTreeMap<String, BTreeSet<String>>,
}

/// Result of validating raw extractor output
#[derive(Debug, Clone, Default)]
pub struct ValidatedConstraints {
    pub constraints: ConstraintSet,
    /// Keys that were dropped, with the reason
    pub dropped: Vec<SchemaViolation>,
}

impl ConstraintSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_boolean(mut self, attribute: impl Into<String>, required: bool) -> Self {
        self.boolean.insert(attribute.into(), required);
        self
    }

    pub fn with_numeric(mut self, attribute: impl Into<String>, op: NumericOp, threshold: f64) -> Self {
        self.numeric
            .insert(attribute.into(), NumericConstraint::new(op, threshold));
        self
    }

    pub fn with_categories<I, S>(mut self, attribute: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set: BTreeSet<String> = values
            .into_iter()
            .map(|v| normalize_category(v.as_ref()))
            .filter(|v| !v.is_empty())
            .collect();
        if !set.is_empty() {
            self.categorical.insert(attribute.into(), set);
        }
        self
    }

    /// Validate untrusted key/value output against the schema.
    ///
    /// Unknown keys and values that cannot be coerced to the declared type are
    /// dropped and reported; null values are ignored.
    pub fn from_raw(
        raw: &serde_json::Map<String, serde_json::Value>,
        schema: &AttributeSchema,
    ) -> ValidatedConstraints {
        let mut constraints = ConstraintSet::new();
        let mut dropped = Vec::new();

        for (key, value) in raw {
            if value.is_null() {
                continue;
            }

            let Some(kind) = schema.type_of(key) else {
                dropped.push(SchemaViolation::new(key.as_str(), "is not in the attribute schema"));
                continue;
            };

            let accepted = match kind {
                AttributeType::Boolean => AttributeValue::coerce_json(value, kind)
                    .and_then(|v| v.as_bool())
                    .map(|b| {
                        constraints.boolean.insert(key.clone(), b);
                    }),
                AttributeType::Number => NumericConstraint::from_json(value).map(|c| {
                    constraints.numeric.insert(key.clone(), c);
                }),
                AttributeType::Category => match AttributeValue::coerce_json(value, kind) {
                    Some(AttributeValue::Category(values)) => {
                        constraints
                            .categorical
                            .insert(key.clone(), values.into_iter().collect());
                        Some(())
                    }
                    _ => None,
                },
            };

            if accepted.is_none() {
                dropped.push(SchemaViolation::new(
                    key.as_str(),
                    format!("value {} cannot be read as {}", value, kind),
                ));
            }
        }

        for violation in &dropped {
            tracing::warn!("Dropped constraint key {}", violation);
        }

        ValidatedConstraints {
            constraints,
            dropped,
        }
    }

    /// Check that every referenced attribute exists with the matching type
    pub fn validate(&self, schema: &AttributeSchema) -> Result<()> {
        let refs = self
            .boolean
            .keys()
            .map(|k| (k, AttributeType::Boolean))
            .chain(self.numeric.keys().map(|k| (k, AttributeType::Number)))
            .chain(self.categorical.keys().map(|k| (k, AttributeType::Category)));

        for (name, expected) in refs {
            match schema.type_of(name) {
                Some(kind) if kind == expected => {}
                Some(kind) => {
                    return Err(SchemaViolation::new(
                        name.as_str(),
                        format!("constrained as {} but declared {}", expected, kind),
                    )
                    .into())
                }
                None => {
                    return Err(
                        SchemaViolation::new(name.as_str(), "is not in the attribute schema").into(),
                    )
                }
            }
        }
        Ok(())
    }

    pub fn boolean(&self) -> &BTreeMap<String, bool> {
        &self.boolean
    }

    pub fn numeric(&self) -> &BTreeMap<String, NumericConstraint> {
        &self.numeric
    }

    pub fn categorical(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.categorical
    }

    /// Number of constrained attributes
    pub fn len(&self) -> usize {
        self.boolean.len() + self.numeric.len() + self.categorical.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Constrained attribute names (boolean, numeric, then categorical)
    pub fn attributes(&self) -> impl Iterator<Item = &str> {
        self.boolean
            .keys()
            .chain(self.numeric.keys())
            .chain(self.categorical.keys())
            .map(|s| s.as_str())
    }
}

impl fmt::Display for ConstraintSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("(none)");
        }
        let mut parts = Vec::with_capacity(self.len());
        for (name, value) in &self.boolean {
            parts.push(format!("{} = {}", name, value));
        }
        for (name, c) in &self.numeric {
            parts.push(format!("{} {}", name, c));
        }
        for (name, values) in &self.categorical {
            let values: Vec<&str> = values.iter().map(|s| s.as_str()).collect();
            parts.push(format!("{} in {{{}}}", name, values.join(", ")));
        }
        f.write_str(&parts.join(", "))
    }
}
