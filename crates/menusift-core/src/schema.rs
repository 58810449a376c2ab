//! Attribute schema shared by the loader, the extractor and the engine
//!
//! The schema is ordered: the order of attributes is the label order used when
//! items are rendered for response generation.

use crate::error::{MenuSiftError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Type of a catalog attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeType {
    Boolean,
    Number,
    Category,
}

impl AttributeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeType::Boolean => "boolean",
            AttributeType::Number => "number",
            AttributeType::Category => "category",
        }
    }
}

impl std::fmt::Display for AttributeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declaration of one attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeSpec {
    pub name: String,

    #[serde(rename = "type")]
    pub kind: AttributeType,

    /// Human-readable label used in rendered item blocks
    #[serde(default)]
    pub label: Option<String>,

    /// Display unit appended to numeric values (e.g. "g", "euros")
    #[serde(default)]
    pub unit: Option<String>,
}

impl AttributeSpec {
    pub fn new(name: impl Into<String>, kind: AttributeType) -> Self {
        Self {
            name: name.into(),
            kind,
            label: None,
            unit: None,
        }
    }

    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, AttributeType::Boolean)
    }

    pub fn number(name: impl Into<String>) -> Self {
        Self::new(name, AttributeType::Number)
    }

    pub fn category(name: impl Into<String>) -> Self {
        Self::new(name, AttributeType::Category)
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    /// Label to render, falling back to the attribute name
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }
}

/// Ordered, name-indexed set of attribute declarations
#[derive(Debug, Clone)]
pub struct AttributeSchema {
    specs: Vec<AttributeSpec>,
    index: HashMap<String, usize>,
}

impl AttributeSchema {
    /// Build a schema, rejecting empty and duplicate names
    pub fn new(specs: Vec<AttributeSpec>) -> Result<Self> {
        if specs.is_empty() {
            return Err(MenuSiftError::InvalidConfiguration(
                "attribute schema has no attributes".to_string(),
            ));
        }

        let mut index = HashMap::with_capacity(specs.len());
        for (i, spec) in specs.iter().enumerate() {
            if spec.name.trim().is_empty() {
                return Err(MenuSiftError::InvalidConfiguration(format!(
                    "attribute #{} has an empty name",
                    i + 1
                )));
            }
            if index.insert(spec.name.clone(), i).is_some() {
                return Err(MenuSiftError::InvalidConfiguration(format!(
                    "attribute '{}' declared twice",
                    spec.name
                )));
            }
        }

        Ok(Self { specs, index })
    }

    /// Schema of the tupper catalog the assistant was built for
    pub fn default_catalog() -> Self {
        let specs = default_catalog_specs();
        let index = specs
            .iter()
            .enumerate()
            .map(|(i, s)| (s.name.clone(), i))
            .collect();
        Self { specs, index }
    }

    pub fn get(&self, name: &str) -> Option<&AttributeSpec> {
        self.index.get(name).map(|&i| &self.specs[i])
    }

    pub fn type_of(&self, name: &str) -> Option<AttributeType> {
        self.get(name).map(|s| s.kind)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Attributes in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &AttributeSpec> {
        self.specs.iter()
    }

    /// Attributes of one type, in declaration order
    pub fn of_type(&self, kind: AttributeType) -> impl Iterator<Item = &AttributeSpec> {
        self.specs.iter().filter(move |s| s.kind == kind)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn specs(&self) -> &[AttributeSpec] {
        &self.specs
    }
}

impl Default for AttributeSchema {
    fn default() -> Self {
        Self::default_catalog()
    }
}

/// Attribute declarations for the default catalog
pub fn default_catalog_specs() -> Vec<AttributeSpec> {
    vec![
        AttributeSpec::number("kcal").with_label("Kcal"),
        AttributeSpec::number("proteinas")
            .with_label("Proteínas")
            .with_unit("g"),
        AttributeSpec::number("hidratos")
            .with_label("Hidratos")
            .with_unit("g"),
        AttributeSpec::number("grasas").with_label("Grasas").with_unit("g"),
        AttributeSpec::number("peso").with_label("Peso").with_unit("g"),
        AttributeSpec::number("precio")
            .with_label("Precio")
            .with_unit("euros"),
        AttributeSpec::category("tipo_plato").with_label("Tipo de plato"),
        AttributeSpec::category("cocina").with_label("Cocina"),
        AttributeSpec::boolean("sin_gluten").with_label("Sin gluten"),
        AttributeSpec::boolean("sin_lactosa").with_label("Sin lactosa"),
        AttributeSpec::boolean("es_postre").with_label("Es postre"),
        AttributeSpec::boolean("de_cuchara").with_label("De cuchara"),
        AttributeSpec::boolean("bajo_en_calorias").with_label("Bajo en calorías"),
        AttributeSpec::boolean("alto_proteina").with_label("Alto en proteína"),
        AttributeSpec::boolean("is_vegetariano").with_label("Vegetariano"),
        AttributeSpec::boolean("is_vegano").with_label("Vegano"),
        AttributeSpec::boolean("is_keto").with_label("Keto"),
        AttributeSpec::boolean("is_gourmet").with_label("Gourmet"),
        AttributeSpec::boolean("para_diabeticos").with_label("Para diabéticos"),
        AttributeSpec::boolean("congelar").with_label("Apto para congelar"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_lookup() {
        let schema = AttributeSchema::default_catalog();
        assert_eq!(schema.type_of("kcal"), Some(AttributeType::Number));
        assert_eq!(schema.type_of("is_vegano"), Some(AttributeType::Boolean));
        assert_eq!(schema.type_of("cocina"), Some(AttributeType::Category));
        assert_eq!(schema.type_of("unknown_attr"), None);
        assert_eq!(schema.of_type(AttributeType::Boolean).count(), 12);
    }

    #[test]
    fn test_duplicate_rejected() {
        let err = AttributeSchema::new(vec![
            AttributeSpec::number("kcal"),
            AttributeSpec::boolean("kcal"),
        ])
        .unwrap_err();
        assert!(matches!(err, MenuSiftError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_empty_rejected() {
        assert!(AttributeSchema::new(vec![]).is_err());
        assert!(AttributeSchema::new(vec![AttributeSpec::number("  ")]).is_err());
    }

    #[test]
    fn test_display_label_fallback() {
        let spec = AttributeSpec::number("peso");
        assert_eq!(spec.display_label(), "peso");
        assert_eq!(spec.with_label("Peso").display_label(), "Peso");
    }

    #[test]
    fn test_spec_yaml() {
        let yaml = "name: precio\ntype: number\nlabel: Precio\nunit: euros\n";
        let spec: AttributeSpec = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(spec.kind, AttributeType::Number);
        assert_eq!(spec.unit.as_deref(), Some("euros"));
    }
}
