//! Per-query pipeline
//!
//! extract → exact filter → fallback decision → fallback score → semantic
//! candidates → select → assemble → generate. Each stage runs once per query
//! against the corpus snapshot taken when the query started.

use crate::config::Config;
use crate::constraints::ConstraintSet;
use crate::corpus::{Corpus, CorpusHandle};
use crate::engine::{
    assemble, filter_exact, needs_fallback, required_matches, score_all, ResultMode, ResultSet,
    ScoredItem, Selector,
};
use crate::error::{Result, SchemaViolation};
use crate::llm::{
    ConstraintExtractor, Extraction, ResponseGenerator, SemanticSearch, DEGRADED_ANSWER,
};
use crate::schema::AttributeSchema;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// One suggested item
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    pub id: String,
    pub name: String,
    /// Fallback score, when the item came from the scorer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub matched: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub violated: Vec<String>,
}

/// Outcome of selection for one query, detached from the corpus snapshot
#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub query: String,
    pub constraints: ConstraintSet,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dropped: Vec<SchemaViolation>,
    pub extraction_degraded: bool,
    pub mode: ResultMode,
    pub exact_matches: usize,
    pub fallback_triggered: bool,
    pub supplemented: usize,
    /// Items within the context cap, best first
    pub items: Vec<Suggestion>,
    /// How many leading items are suggested to the user
    pub presented: usize,
}

impl Recommendation {
    pub fn presented_items(&self) -> &[Suggestion] {
        &self.items[..self.presented.min(self.items.len())]
    }

    pub fn ids(&self) -> Vec<&str> {
        self.items.iter().map(|s| s.id.as_str()).collect()
    }
}

/// Recommendation plus the generated answer text
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    #[serde(flatten)]
    pub recommendation: Recommendation,
    pub text: String,
    pub generation_degraded: bool,
}

/// Result of the deterministic stages over one corpus snapshot
#[derive(Debug)]
pub struct QueryRun<'a> {
    pub exact_count: usize,
    pub fallback_triggered: bool,
    pub result: ResultSet<'a>,
    scored: Vec<ScoredItem<'a>>,
}

impl<'a> QueryRun<'a> {
    /// Context blocks for answer generation
    pub fn blocks(&self, schema: &AttributeSchema) -> Vec<String> {
        assemble(&self.result, schema)
    }

    /// Owned summary, attaching constraint bookkeeping to fallback entries
    pub fn recommendation(&self, query: &str, extraction: &Extraction) -> Recommendation {
        let by_id: HashMap<&str, &ScoredItem<'a>> =
            self.scored.iter().map(|s| (s.item_id(), s)).collect();

        let items = self
            .result
            .entries()
            .iter()
            .map(|entry| {
                let scored = entry.score.and(by_id.get(entry.item.id.as_str()));
                Suggestion {
                    id: entry.item.id.clone(),
                    name: entry.item.name.clone(),
                    score: entry.score,
                    matched: scored.map(|s| s.matched.clone()).unwrap_or_default(),
                    violated: scored.map(|s| s.violated.clone()).unwrap_or_default(),
                }
            })
            .collect();

        Recommendation {
            query: query.to_string(),
            constraints: extraction.constraints.clone(),
            dropped: extraction.dropped.clone(),
            extraction_degraded: extraction.degraded,
            mode: self.result.mode(),
            exact_matches: self.exact_count,
            fallback_triggered: self.fallback_triggered,
            supplemented: self.result.supplemented(),
            items,
            presented: self.result.presented().len(),
        }
    }
}

/// Deterministic core: filter, score when needed, select.
///
/// `semantic` is an ordered list of item ids from nearest-neighbour search,
/// possibly empty.
pub fn run_query<'a>(
    corpus: &'a Corpus,
    config: &Config,
    query: &str,
    constraints: &ConstraintSet,
    semantic: &[String],
) -> Result<QueryRun<'a>> {
    let schema = config.attribute_schema()?;
    let selector = Selector::from_config(config)?;
    execute(corpus, config, &schema, &selector, query, constraints, semantic)
}

fn execute<'a>(
    corpus: &'a Corpus,
    config: &Config,
    schema: &AttributeSchema,
    selector: &Selector,
    query: &str,
    constraints: &ConstraintSet,
    semantic: &[String],
) -> Result<QueryRun<'a>> {
    let exact = filter_exact(corpus, constraints);
    let exact_count = exact.len();

    let fallback_triggered = needs_fallback(query, exact_count, &config.fallback);
    let scored = if fallback_triggered {
        tracing::info!(
            "{} exact matches below minimum of {}, scoring fallback",
            exact_count,
            required_matches(query, &config.fallback)
        );
        score_all(corpus, constraints, schema, &config.scoring)?
    } else {
        Vec::new()
    };

    let result = selector.select(&exact, &scored, semantic, constraints.is_empty())?;

    Ok(QueryRun {
        exact_count,
        fallback_triggered,
        result,
        scored,
    })
}

/// The assistant: collaborators plus a validated configuration
pub struct MenuAssistant {
    config: Config,
    schema: AttributeSchema,
    selector: Selector,
    corpus: CorpusHandle,
    extractor: ConstraintExtractor,
    semantic: Option<Arc<dyn SemanticSearch>>,
    generator: Arc<dyn ResponseGenerator>,
}

impl MenuAssistant {
    /// Validates the configuration; invalid settings fail here, never per query
    pub fn new(
        config: Config,
        corpus: CorpusHandle,
        extractor: ConstraintExtractor,
        generator: Arc<dyn ResponseGenerator>,
    ) -> Result<Self> {
        let schema = config.validate()?;
        let selector = Selector::from_config(&config)?;
        Ok(Self {
            config,
            schema,
            selector,
            corpus,
            extractor,
            semantic: None,
            generator,
        })
    }

    pub fn with_semantic_search(mut self, semantic: Arc<dyn SemanticSearch>) -> Self {
        self.semantic = Some(semantic);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn schema(&self) -> &AttributeSchema {
        &self.schema
    }

    pub fn corpus(&self) -> &CorpusHandle {
        &self.corpus
    }

    /// Select items for a query without generating an answer
    pub async fn recommend(&self, query: &str) -> Result<Recommendation> {
        let (recommendation, _) = self.prepare(query).await?;
        Ok(recommendation)
    }

    /// Select items and generate an answer over them
    pub async fn answer(&self, query: &str) -> Result<Answer> {
        let (recommendation, blocks) = self.prepare(query).await?;

        let timeout = self.config.llm_service.timeout();
        let generated =
            tokio::time::timeout(timeout, self.generator.generate(query, &blocks)).await;
        let (text, generation_degraded) = match generated {
            Ok(Ok(text)) => (text, false),
            Ok(Err(e)) => {
                tracing::warn!("Answer generation failed: {}", e);
                (DEGRADED_ANSWER.to_string(), true)
            }
            Err(_) => {
                tracing::warn!("Answer generation timed out after {:?}", timeout);
                (DEGRADED_ANSWER.to_string(), true)
            }
        };

        Ok(Answer {
            recommendation,
            text,
            generation_degraded,
        })
    }

    async fn prepare(&self, query: &str) -> Result<(Recommendation, Vec<String>)> {
        let extraction = self.extractor.extract(query).await;
        let corpus = self.corpus.snapshot();
        let semantic = self
            .semantic_candidates(query, &extraction.constraints, corpus.len())
            .await;

        let run = execute(
            &corpus,
            &self.config,
            &self.schema,
            &self.selector,
            query,
            &extraction.constraints,
            &semantic,
        )?;

        Ok((run.recommendation(query, &extraction), run.blocks(&self.schema)))
    }

    async fn semantic_candidates(
        &self,
        query: &str,
        constraints: &ConstraintSet,
        k: usize,
    ) -> Vec<String> {
        let Some(semantic) = &self.semantic else {
            return Vec::new();
        };
        let selection = &self.config.selection;
        let useful = selection.semantic_tie_break
            || (selection.semantic_when_unconstrained && constraints.is_empty());
        if !useful || query.trim().is_empty() {
            return Vec::new();
        }

        let timeout = self.config.llm_service.timeout();
        match tokio::time::timeout(timeout, semantic.search(query, k)).await {
            Ok(Ok(ids)) => ids,
            Ok(Err(e)) => {
                tracing::warn!("Semantic search failed, ranking without it: {}", e);
                Vec::new()
            }
            Err(_) => {
                tracing::warn!("Semantic search timed out after {:?}", timeout);
                Vec::new()
            }
        }
    }
}
