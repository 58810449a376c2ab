//! MenuSift Core Library
//!
//! Decision core of a dietary menu assistant: turns a free-text food request
//! into a ranked, bounded list of catalog items.
//!
//! # Features
//! - Typed attribute schema with validated per-query constraint sets
//! - Exact filtering with a weighted soft-scoring fallback
//! - Deterministic result selection with context and presentation caps
//! - Structured item rendering for answer generation
//! - Pluggable model collaborators for extraction, generation and semantic search

pub mod config;
pub mod constraints;
pub mod corpus;
pub mod engine;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod schema;

pub use config::{Config, FallbackConfig, LLMServiceConfig, ScoringConfig, SelectionConfig};
pub use constraints::{ConstraintSet, NumericConstraint, NumericOp, ValidatedConstraints};
pub use corpus::{AttributeValue, Corpus, CorpusHandle, Item, LoadReport};
pub use engine::{
    assemble, filter_exact, render_item, score_all, ResultMode, ResultSet, ScoredItem, Selector,
};
pub use error::{Error, MenuSiftError, Result, SchemaViolation};
pub use llm::{
    ConstraintExtractor, ConstraintSource, EmbeddingIndex, HttpLLMClient, LLMClient,
    LlmConstraintSource, LlmEmbedder, LlmResponseGenerator, ResponseGenerator, SemanticSearch,
};
pub use pipeline::{run_query, Answer, MenuAssistant, QueryRun, Recommendation, Suggestion};
pub use schema::{AttributeSchema, AttributeSpec, AttributeType};

/// Default config directory name
pub const CONFIG_DIR_NAME: &str = "menusift";
