//! Error types for menusift

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using MenuSiftError
pub type Result<T> = std::result::Result<T, MenuSiftError>;

/// Error type alias for convenience
pub type Error = MenuSiftError;

/// Exit codes for CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const NOT_FOUND: i32 = 2;
    pub const INVALID_INPUT: i32 = 3;
}

/// A constraint key or corpus attribute that does not fit the attribute schema.
///
/// Collected into reports rather than raised: the extractor drops the offending
/// key, the corpus loader drops the offending attribute from the item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaViolation {
    /// Attribute name as it appeared in the input
    pub attribute: String,
    /// Human-readable reason
    pub reason: String,
    /// Item the attribute belonged to (corpus load only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
}

impl SchemaViolation {
    pub fn new(attribute: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            reason: reason.into(),
            item_id: None,
        }
    }

    pub fn for_item(mut self, item_id: impl Into<String>) -> Self {
        self.item_id = Some(item_id.into());
        self
    }
}

impl std::fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.item_id {
            Some(id) => write!(f, "item {}: '{}' {}", id, self.attribute, self.reason),
            None => write!(f, "'{}' {}", self.attribute, self.reason),
        }
    }
}

/// Main error type for menusift
#[derive(Debug, Error)]
pub enum MenuSiftError {
    #[error("Schema violation: {0}")]
    SchemaViolation(SchemaViolation),

    #[error("External call failed: {0}")]
    ExternalCallFailure(String),

    #[error("Corpus is empty: at least one item is required")]
    EmptyCorpus,

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Duplicate item id: {0}")]
    DuplicateItem(String),

    #[error("Item not found: {0}")]
    ItemNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl MenuSiftError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ItemNotFound(_) => exit_codes::NOT_FOUND,
            Self::InvalidConfiguration(_)
            | Self::EmptyCorpus
            | Self::DuplicateItem(_)
            | Self::SchemaViolation(_)
            | Self::InvalidInput(_) => exit_codes::INVALID_INPUT,
            _ => exit_codes::GENERAL_ERROR,
        }
    }

    /// Whether this error must halt startup rather than degrade a query
    pub fn is_startup_fatal(&self) -> bool {
        matches!(
            self,
            Self::EmptyCorpus | Self::InvalidConfiguration(_) | Self::DuplicateItem(_)
        )
    }
}

impl From<SchemaViolation> for MenuSiftError {
    fn from(v: SchemaViolation) -> Self {
        Self::SchemaViolation(v)
    }
}
