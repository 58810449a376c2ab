//! Result selection
//!
//! Exact matches win whenever there is at least one. Otherwise the fallback
//! ranking is used. Results are bounded by two caps: the context cap (items
//! handed to answer generation) and the presentation cap (items suggested to
//! the user), with `presentation <= context`.

use super::scoring::ScoredItem;
use crate::config::{Config, FallbackConfig};
use crate::corpus::Item;
use crate::error::{MenuSiftError, Result};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Which stage produced a result set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultMode {
    Exact,
    Fallback,
    Semantic,
}

impl ResultMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResultMode::Exact => "exact",
            ResultMode::Fallback => "fallback",
            ResultMode::Semantic => "semantic",
        }
    }
}

impl std::fmt::Display for ResultMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Context and presentation caps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caps {
    context: usize,
    presentation: usize,
}

impl Caps {
    pub fn new(context: usize, presentation: usize) -> Result<Self> {
        if presentation == 0 {
            return Err(MenuSiftError::InvalidConfiguration(
                "presentation cap must be at least 1".to_string(),
            ));
        }
        if presentation > context {
            return Err(MenuSiftError::InvalidConfiguration(format!(
                "presentation cap ({}) exceeds context cap ({})",
                presentation, context
            )));
        }
        Ok(Self {
            context,
            presentation,
        })
    }

    pub fn context(&self) -> usize {
        self.context
    }

    pub fn presentation(&self) -> usize {
        self.presentation
    }
}

/// One selected item, with its fallback score when one was computed
#[derive(Debug, Clone, Copy)]
pub struct ResultEntry<'a> {
    pub item: &'a Item,
    pub score: Option<f64>,
}

/// Ordered, bounded selection of corpus items
#[derive(Debug, Clone)]
pub struct ResultSet<'a> {
    mode: ResultMode,
    entries: Vec<ResultEntry<'a>>,
    presentation_cap: usize,
    supplemented: usize,
}

impl<'a> ResultSet<'a> {
    pub fn mode(&self) -> ResultMode {
        self.mode
    }

    /// Everything within the context cap
    pub fn entries(&self) -> &[ResultEntry<'a>] {
        &self.entries
    }

    pub fn items(&self) -> impl Iterator<Item = &'a Item> + '_ {
        self.entries.iter().map(|e| e.item)
    }

    /// The leading entries within the presentation cap
    pub fn presented(&self) -> &[ResultEntry<'a>] {
        let n = self.presentation_cap.min(self.entries.len());
        &self.entries[..n]
    }

    pub fn ids(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.item.id.clone()).collect()
    }

    /// Fallback items appended to a short exact result
    pub fn supplemented(&self) -> usize {
        self.supplemented
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Minimum number of exact matches for this query before fallback scoring
/// is skipped. Queries asking for variety need more.
pub fn required_matches(query: &str, config: &FallbackConfig) -> usize {
    let query = query.to_lowercase();
    let words: HashSet<&str> = query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    let wants_variety = config.variety_keywords.iter().any(|k| {
        let k = k.to_lowercase();
        if k.contains(char::is_whitespace) {
            query.contains(&k)
        } else {
            words.contains(k.as_str())
        }
    });

    if wants_variety {
        config.extended_threshold
    } else {
        config.base_threshold
    }
}

/// Whether fallback scoring must run. Always true without exact matches.
pub fn needs_fallback(query: &str, exact_count: usize, config: &FallbackConfig) -> bool {
    exact_count == 0 || exact_count < required_matches(query, config)
}

/// Applies the selection policy
#[derive(Debug, Clone)]
pub struct Selector {
    caps: Caps,
    semantic_tie_break: bool,
    semantic_when_unconstrained: bool,
    top_up: Option<(usize, f64)>,
}

impl Selector {
    pub fn new(caps: Caps) -> Self {
        Self {
            caps,
            semantic_tie_break: true,
            semantic_when_unconstrained: false,
            top_up: None,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let caps = Caps::new(
            config.selection.context_cap,
            config.selection.presentation_cap,
        )?;
        let mut selector = Self::new(caps)
            .with_semantic_tie_break(config.selection.semantic_tie_break)
            .with_semantic_when_unconstrained(config.selection.semantic_when_unconstrained);
        if config.fallback.top_up_exact {
            selector = selector.with_top_up(
                config.fallback.top_up_limit,
                config.fallback.min_fallback_score,
            );
        }
        Ok(selector)
    }

    pub fn with_semantic_tie_break(mut self, enabled: bool) -> Self {
        self.semantic_tie_break = enabled;
        self
    }

    pub fn with_semantic_when_unconstrained(mut self, enabled: bool) -> Self {
        self.semantic_when_unconstrained = enabled;
        self
    }

    /// Append up to `limit` fallback items scoring above `min_score` to exact results
    pub fn with_top_up(mut self, limit: usize, min_score: f64) -> Self {
        self.top_up = Some((limit, min_score));
        self
    }

    pub fn caps(&self) -> Caps {
        self.caps
    }

    /// Merge exact results, fallback ranking and semantic candidates.
    ///
    /// `semantic` is an ordered list of item ids from nearest-neighbour search
    /// (may be empty). `unconstrained` tells whether the query produced no
    /// constraints. Fails only when there is nothing at all to select, which
    /// means the corpus was empty.
    pub fn select<'a>(
        &self,
        exact: &[&'a Item],
        fallback: &[ScoredItem<'a>],
        semantic: &[String],
        unconstrained: bool,
    ) -> Result<ResultSet<'a>> {
        let ranks: HashMap<&str, usize> = semantic
            .iter()
            .enumerate()
            .rev()
            .map(|(rank, id)| (id.as_str(), rank))
            .collect();
        let rank_of = |item: &Item| ranks.get(item.id.as_str()).copied().unwrap_or(usize::MAX);

        if unconstrained && self.semantic_when_unconstrained && !ranks.is_empty() {
            let mut ranked: Vec<&'a Item> = exact
                .iter()
                .copied()
                .filter(|item| ranks.contains_key(item.id.as_str()))
                .collect();
            if !ranked.is_empty() {
                ranked.sort_by_key(|item| rank_of(item));
                return Ok(self.finish(
                    ResultMode::Semantic,
                    ranked.into_iter().map(|item| ResultEntry { item, score: None }),
                    0,
                ));
            }
        }

        if !exact.is_empty() {
            let mut items: Vec<&'a Item> = exact.to_vec();
            if self.semantic_tie_break && !ranks.is_empty() {
                items.sort_by_key(|item| rank_of(item));
            }

            let mut entries: Vec<ResultEntry<'a>> = items
                .into_iter()
                .take(self.caps.context)
                .map(|item| ResultEntry { item, score: None })
                .collect();

            let mut supplemented = 0;
            if let Some((limit, min_score)) = self.top_up {
                let present: HashSet<&str> = entries.iter().map(|e| e.item.id.as_str()).collect();
                let room = self.caps.context.saturating_sub(entries.len()).min(limit);
                let extra: Vec<ResultEntry<'a>> = fallback
                    .iter()
                    .filter(|s| s.score > min_score && !present.contains(s.item_id()))
                    .take(room)
                    .map(|s| ResultEntry {
                        item: s.item,
                        score: Some(s.score),
                    })
                    .collect();
                supplemented = extra.len();
                entries.extend(extra);
            }

            return Ok(self.finish(ResultMode::Exact, entries.into_iter(), supplemented));
        }

        if !fallback.is_empty() {
            let mut ranked: Vec<&ScoredItem<'a>> = fallback.iter().collect();
            if self.semantic_tie_break && !ranks.is_empty() {
                // Stable: equal (score, rank) pairs keep the scorer's id order.
                ranked.sort_by(|a, b| {
                    b.score
                        .total_cmp(&a.score)
                        .then_with(|| rank_of(a.item).cmp(&rank_of(b.item)))
                });
            }
            return Ok(self.finish(
                ResultMode::Fallback,
                ranked.into_iter().map(|s| ResultEntry {
                    item: s.item,
                    score: Some(s.score),
                }),
                0,
            ));
        }

        Err(MenuSiftError::EmptyCorpus)
    }

    fn finish<'a>(
        &self,
        mode: ResultMode,
        entries: impl Iterator<Item = ResultEntry<'a>>,
        supplemented: usize,
    ) -> ResultSet<'a> {
        let entries: Vec<ResultEntry<'a>> = entries.take(self.caps.context).collect();
        tracing::info!(
            "Selected {} items in {} mode ({} presented, {} supplemented)",
            entries.len(),
            mode,
            entries.len().min(self.caps.presentation),
            supplemented
        );
        ResultSet {
            mode,
            entries,
            presentation_cap: self.caps.presentation,
            supplemented,
        }
    }
}
