//! Nearest-neighbour search over item embeddings
//!
//! Only used to order candidates; it never admits or rejects an item.

use super::LLMClient;
use crate::corpus::Corpus;
use crate::engine::compare_ids;
use crate::error::{MenuSiftError, Result};
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;

const EMBED_BATCH_SIZE: usize = 32;
const EMBED_CONCURRENCY: usize = 4;

/// Text embedding backend
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| MenuSiftError::ExternalCallFailure("no embedding returned".to_string()))
    }
}

/// Ordered item ids for a free-text query
#[async_trait]
pub trait SemanticSearch: Send + Sync {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<String>>;
}

/// [`Embedder`] over the embeddings endpoint of an [`LLMClient`]
pub struct LlmEmbedder {
    client: Arc<dyn LLMClient>,
}

impl LlmEmbedder {
    pub fn new(client: Arc<dyn LLMClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Embedder for LlmEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.client.embed_batch(texts).await
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Brute-force cosine index over one corpus snapshot
pub struct EmbeddingIndex {
    embedder: Arc<dyn Embedder>,
    entries: Vec<(String, Vec<f32>)>,
}

impl EmbeddingIndex {
    /// Embed `name` and `description` of every item
    pub async fn build(embedder: Arc<dyn Embedder>, corpus: &Corpus) -> Result<Self> {
        let ids: Vec<String> = corpus.iter().map(|item| item.id.clone()).collect();
        let texts: Vec<String> = corpus
            .iter()
            .map(|item| format!("{}\n{}", item.name, item.description))
            .collect();

        let batches: Vec<Vec<Vec<f32>>> = stream::iter(texts.chunks(EMBED_BATCH_SIZE))
            .map(|chunk| {
                let embedder = embedder.clone();
                async move { embedder.embed_batch(chunk).await }
            })
            .buffered(EMBED_CONCURRENCY)
            .try_collect()
            .await?;

        let vectors: Vec<Vec<f32>> = batches.into_iter().flatten().collect();
        if vectors.len() != ids.len() {
            return Err(MenuSiftError::ExternalCallFailure(format!(
                "embedded {} of {} items",
                vectors.len(),
                ids.len()
            )));
        }

        tracing::info!("Built embedding index over {} items", ids.len());
        Ok(Self {
            embedder,
            entries: ids.into_iter().zip(vectors).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rank all entries against a query vector; ties by item id
    pub fn rank(&self, query: &[f32], k: usize) -> Vec<String> {
        let mut scored: Vec<(&str, f32)> = self
            .entries
            .iter()
            .map(|(id, v)| (id.as_str(), cosine_similarity(query, v)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| compare_ids(a.0, b.0)));
        scored
            .into_iter()
            .take(k)
            .map(|(id, _)| id.to_string())
            .collect()
    }
}

#[async_trait]
impl SemanticSearch for EmbeddingIndex {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<String>> {
        let vector = self.embedder.embed(query).await?;
        Ok(self.rank(&vector, k))
    }
}
