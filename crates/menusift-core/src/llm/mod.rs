//! Adapters for the language-model collaborators
//!
//! The engine never talks to a model directly. Constraint extraction, answer
//! generation and semantic search sit behind traits so the pipeline can run
//! against HTTP services, local mocks, or nothing at all.

mod cache;
mod client;
mod extractor;
mod generator;
mod semantic;

pub use cache::LLMCache;
pub use client::{ChatMessage, ClientStats, HttpLLMClient, LLMClient};
pub use extractor::{
    parse_json_object, ConstraintExtractor, ConstraintSource, Extraction, LlmConstraintSource,
};
pub use generator::{LlmResponseGenerator, ResponseGenerator, DEGRADED_ANSWER};
pub use semantic::{cosine_similarity, Embedder, EmbeddingIndex, LlmEmbedder, SemanticSearch};
