//! Catalog corpus
//!
//! A [`Corpus`] is an immutable, validated snapshot of catalog items. It is
//! built once at startup and shared by reference across queries; reloading
//! produces a new snapshot that replaces the old one inside a [`CorpusHandle`].

pub mod loader;
mod value;

pub use loader::{load_csv, load_json, load_path};
pub use value::{normalize_category, parse_bool, parse_number, AttributeValue};

use crate::error::{MenuSiftError, Result, SchemaViolation};
use crate::schema::AttributeSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

/// One catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub name: String,

    /// Ingredients, allergens and notes; the semantic-search substrate
    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl Item {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_bool(mut self, name: impl Into<String>, value: bool) -> Self {
        self.attributes
            .insert(name.into(), AttributeValue::Boolean(value));
        self
    }

    pub fn with_number(mut self, name: impl Into<String>, value: f64) -> Self {
        self.attributes
            .insert(name.into(), AttributeValue::Number(value));
        self
    }

    pub fn with_categories<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.attributes
            .insert(name.into(), AttributeValue::categories(values));
        self
    }

    pub fn get(&self, name: &str) -> Option<&AttributeValue> {
        self.attributes.get(name)
    }

    pub fn boolean(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(AttributeValue::as_bool)
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(AttributeValue::as_number)
    }

    pub fn categories(&self, name: &str) -> Option<&[String]> {
        self.get(name).and_then(AttributeValue::as_categories)
    }
}

/// Outcome of validating items against the schema
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    /// Number of items accepted
    pub items: usize,
    /// Attributes dropped from items because they did not fit the schema
    pub flagged: Vec<SchemaViolation>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.flagged.is_empty()
    }
}

/// Immutable, validated collection of items
#[derive(Debug)]
pub struct Corpus {
    items: Vec<Item>,
    by_id: HashMap<String, usize>,
}

impl Corpus {
    /// Validate items against the schema and build a snapshot.
    ///
    /// Fails on an empty item list or duplicate ids. Attributes that are not
    /// declared in the schema, or whose value type does not match the
    /// declaration, are removed from the item and reported.
    pub fn new(items: Vec<Item>, schema: &AttributeSchema) -> Result<(Self, LoadReport)> {
        if items.is_empty() {
            return Err(MenuSiftError::EmptyCorpus);
        }

        let mut report = LoadReport::default();
        let mut by_id = HashMap::with_capacity(items.len());
        let mut validated = Vec::with_capacity(items.len());

        for (pos, mut item) in items.into_iter().enumerate() {
            if by_id.insert(item.id.clone(), pos).is_some() {
                return Err(MenuSiftError::DuplicateItem(item.id));
            }

            let id = item.id.clone();
            item.attributes.retain(|name, value| match schema.type_of(name) {
                None => {
                    report.flagged.push(
                        SchemaViolation::new(name.as_str(), "is not in the attribute schema")
                            .for_item(id.as_str()),
                    );
                    false
                }
                Some(kind) if kind != value.kind() => {
                    report.flagged.push(
                        SchemaViolation::new(
                            name.as_str(),
                            format!("expected {}, found {}", kind, value.kind()),
                        )
                        .for_item(id.as_str()),
                    );
                    false
                }
                Some(_) => true,
            });

            validated.push(item);
        }

        for violation in &report.flagged {
            tracing::warn!("Corpus entry flagged: {}", violation);
        }

        report.items = validated.len();
        tracing::debug!(
            "Corpus built: {} items, {} flagged attributes",
            report.items,
            report.flagged.len()
        );

        Ok((
            Self {
                items: validated,
                by_id,
            },
            report,
        ))
    }

    /// Items in corpus order
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Item> {
        self.items.iter()
    }

    pub fn get(&self, id: &str) -> Option<&Item> {
        self.by_id.get(id).map(|&i| &self.items[i])
    }

    /// Position of an item in corpus order
    pub fn position(&self, id: &str) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Always false for a constructed corpus
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Observed (min, max) of a numeric attribute across items that carry it
    pub fn numeric_range(&self, attribute: &str) -> Option<(f64, f64)> {
        self.items
            .iter()
            .filter_map(|item| item.number(attribute))
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}

impl<'a> IntoIterator for &'a Corpus {
    type Item = &'a Item;
    type IntoIter = std::slice::Iter<'a, Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Process-wide handle to the current corpus snapshot
///
/// Readers take an `Arc` snapshot and keep it for the whole query; a reload
/// swaps in a new snapshot without touching the one readers hold.
#[derive(Debug, Clone)]
pub struct CorpusHandle {
    current: Arc<RwLock<Arc<Corpus>>>,
}

impl CorpusHandle {
    pub fn new(corpus: Corpus) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(corpus))),
        }
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<Corpus> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Replace the snapshot, returning the previous one
    pub fn replace(&self, corpus: Corpus) -> Arc<Corpus> {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        let previous = std::mem::replace(&mut *guard, Arc::new(corpus));
        tracing::info!(
            "Corpus snapshot replaced: {} -> {} items",
            previous.len(),
            guard.len()
        );
        previous
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::AttributeType;

    fn schema() -> AttributeSchema {
        AttributeSchema::default_catalog()
    }

    #[test]
    fn test_empty_corpus_is_fatal() {
        let err = Corpus::new(vec![], &schema()).unwrap_err();
        assert!(matches!(err, MenuSiftError::EmptyCorpus));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let items = vec![Item::new("1", "Sopa"), Item::new("1", "Crema")];
        let err = Corpus::new(items, &schema()).unwrap_err();
        assert!(matches!(err, MenuSiftError::DuplicateItem(id) if id == "1"));
    }

    #[test]
    fn test_schema_violations_flagged_at_load() {
        let items = vec![Item::new("1", "Lentejas")
            .with_bool("is_vegano", true)
            .with_bool("kcal", true)
            .with_number("picante", 3.0)];

        let (corpus, report) = Corpus::new(items, &schema()).unwrap();
        let item = corpus.get("1").unwrap();

        assert_eq!(item.boolean("is_vegano"), Some(true));
        assert!(item.get("kcal").is_none());
        assert!(item.get("picante").is_none());
        assert_eq!(report.flagged.len(), 2);
        assert!(report
            .flagged
            .iter()
            .all(|v| v.item_id.as_deref() == Some("1")));
    }

    #[test]
    fn test_numeric_range() {
        let items = vec![
            Item::new("1", "A").with_number("kcal", 180.0),
            Item::new("2", "B").with_number("kcal", 150.0),
            Item::new("3", "C"),
        ];
        let (corpus, _) = Corpus::new(items, &schema()).unwrap();
        assert_eq!(corpus.numeric_range("kcal"), Some((150.0, 180.0)));
        assert_eq!(corpus.numeric_range("precio"), None);
        assert_eq!(corpus.position("2"), Some(1));
    }

    #[test]
    fn test_handle_replace_keeps_old_snapshot() {
        let (first, _) = Corpus::new(vec![Item::new("1", "A")], &schema()).unwrap();
        let handle = CorpusHandle::new(first);
        let held = handle.snapshot();

        let (second, _) = Corpus::new(
            vec![Item::new("1", "A"), Item::new("2", "B")],
            &schema(),
        )
        .unwrap();
        handle.replace(second);

        assert_eq!(held.len(), 1);
        assert_eq!(handle.snapshot().len(), 2);
    }

    #[test]
    fn test_item_accessors() {
        let item = Item::new("9", "Curry")
            .with_categories("cocina", ["India", "Picante"])
            .with_number("precio", 5.5);
        assert_eq!(
            item.categories("cocina"),
            Some(&["india".to_string(), "picante".to_string()][..])
        );
        assert_eq!(item.number("precio"), Some(5.5));
        assert_eq!(item.get("precio").map(|v| v.kind()), Some(AttributeType::Number));
    }
}
