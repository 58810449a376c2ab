//! Fallback scoring
//!
//! Every item in the corpus is scored against the constraint set with a
//! weighted soft match, so that items which "almost" satisfy the query can be
//! ranked when exact filtering yields too little.
//!
//! Per constraint:
//! - boolean: `+boolean_reward` on match, `-penalty` on mismatch, nothing
//!   when the item lacks the attribute
//! - numeric: `+numeric_reward` when the comparison holds, otherwise
//!   `numeric_reward * min(decay(miss / scale), near_miss_cap)`
//! - categorical: `+categorical_reward` per accepted value the item carries,
//!   nothing otherwise
//!
//! The total is the sum of contributions. Ties are broken by item id.

use crate::config::{DecayKind, ScoringConfig};
use crate::constraints::{ConstraintSet, NumericConstraint};
use crate::corpus::{Corpus, Item};
use crate::error::Result;
use crate::schema::AttributeSchema;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// One item's fallback score
#[derive(Debug, Clone, Serialize)]
pub struct ScoredItem<'a> {
    #[serde(skip)]
    pub item: &'a Item,
    pub score: f64,
    /// Constrained attributes the item satisfies
    pub matched: Vec<String>,
    /// Constrained attributes the item fails or lacks
    pub violated: Vec<String>,
}

impl ScoredItem<'_> {
    pub fn item_id(&self) -> &str {
        &self.item.id
    }
}

impl DecayKind {
    /// Credit fraction in `[0, 1]` for a normalised distance `d >= 0`
    pub fn apply(&self, d: f64) -> f64 {
        let d = d.max(0.0);
        match self {
            DecayKind::Linear => (1.0 - d).max(0.0),
            DecayKind::Exponential => (-d).exp(),
            DecayKind::Gaussian => (-d * d).exp(),
        }
    }
}

/// Scorer bound to one constraint set and corpus snapshot
pub struct FallbackScorer<'c> {
    config: &'c ScoringConfig,
    constraints: &'c ConstraintSet,
    scales: BTreeMap<&'c str, f64>,
}

impl<'c> FallbackScorer<'c> {
    /// Resolve the normalisation scale of every numeric constraint.
    ///
    /// Scale precedence: per-attribute config, default config, the corpus's
    /// observed range, then `max(|threshold|, 1)` when the range is degenerate.
    pub fn new(corpus: &Corpus, constraints: &'c ConstraintSet, config: &'c ScoringConfig) -> Self {
        let scales = constraints
            .numeric()
            .iter()
            .map(|(name, c)| {
                let scale = config
                    .numeric_scales
                    .get(name)
                    .copied()
                    .or(config.default_numeric_scale)
                    .or_else(|| {
                        corpus
                            .numeric_range(name)
                            .map(|(lo, hi)| hi - lo)
                            .filter(|r| *r > 0.0)
                    })
                    .unwrap_or_else(|| c.threshold.abs().max(1.0));
                (name.as_str(), scale)
            })
            .collect();

        Self {
            config,
            constraints,
            scales,
        }
    }

    /// Score one item
    pub fn score<'a>(&self, item: &'a Item) -> ScoredItem<'a> {
        let mut score = 0.0;
        let mut matched = Vec::new();
        let mut violated = Vec::new();

        for (name, required) in self.constraints.boolean() {
            if *required {
                score += self.graded_bonus(name, item);
            }
            match item.boolean(name) {
                Some(v) if v == *required => {
                    score += self.config.boolean_reward;
                    matched.push(name.clone());
                }
                Some(_) => {
                    score -= self.config.penalty_for(name);
                    violated.push(name.clone());
                }
                None => violated.push(name.clone()),
            }
        }

        for (name, constraint) in self.constraints.numeric() {
            match item.number(name) {
                Some(v) if constraint.holds(v) => {
                    score += self.config.numeric_reward;
                    matched.push(name.clone());
                }
                Some(v) => {
                    score += self.numeric_credit(name, constraint, v);
                    violated.push(name.clone());
                }
                None => violated.push(name.clone()),
            }
        }

        for (name, accepted) in self.constraints.categorical() {
            let hits = item
                .categories(name)
                .map(|values| values.iter().filter(|v| accepted.contains(*v)).count())
                .unwrap_or(0);
            if hits > 0 {
                score += self.config.categorical_reward * hits as f64;
                matched.push(name.clone());
            } else {
                violated.push(name.clone());
            }
        }

        ScoredItem {
            item,
            score,
            matched,
            violated,
        }
    }

    fn numeric_credit(&self, name: &str, constraint: &NumericConstraint, value: f64) -> f64 {
        let scale = self.scales.get(name).copied().unwrap_or(1.0);
        let distance = constraint.miss_distance(value) / scale;
        let credit = self
            .config
            .decay
            .apply(distance)
            .min(self.config.near_miss_cap);
        self.config.numeric_reward * credit
    }

    fn graded_bonus(&self, name: &str, item: &Item) -> f64 {
        let Some(bonus) = self.config.graded_booleans.get(name) else {
            return 0.0;
        };
        item.number(&bonus.attribute)
            .map(|v| (v.max(0.0) / bonus.divisor).min(bonus.cap))
            .unwrap_or(0.0)
    }
}

/// Score every corpus item, best first.
///
/// Fails only when the constraint set references an attribute outside the
/// schema; items missing a constrained attribute simply earn nothing for it.
pub fn score_all<'a>(
    corpus: &'a Corpus,
    constraints: &ConstraintSet,
    schema: &AttributeSchema,
    config: &ScoringConfig,
) -> Result<Vec<ScoredItem<'a>>> {
    constraints.validate(schema)?;

    let scorer = FallbackScorer::new(corpus, constraints, config);
    let mut scored: Vec<ScoredItem<'a>> = corpus.iter().map(|item| scorer.score(item)).collect();

    scored.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| compare_ids(a.item_id(), b.item_id()))
    });

    tracing::debug!(
        "Fallback scored {} items; best {:?}",
        scored.len(),
        scored.first().map(|s| (s.item_id(), s.score))
    );

    Ok(scored)
}

/// Deterministic id order: integer ids first, numerically, then every other id
/// lexically
pub fn compare_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GradedBonus;
    use crate::constraints::NumericOp;
    use crate::error::MenuSiftError;

    fn schema() -> AttributeSchema {
        AttributeSchema::default_catalog()
    }

    fn corpus(items: Vec<Item>) -> Corpus {
        Corpus::new(items, &schema()).unwrap().0
    }

    fn plain_config() -> ScoringConfig {
        ScoringConfig {
            boolean_penalty_overrides: BTreeMap::new(),
            graded_booleans: BTreeMap::new(),
            ..ScoringConfig::default()
        }
    }

    #[test]
    fn test_decay_functions() {
        assert_eq!(DecayKind::Linear.apply(0.0), 1.0);
        assert_eq!(DecayKind::Linear.apply(0.25), 0.75);
        assert_eq!(DecayKind::Linear.apply(2.0), 0.0);
        assert!((DecayKind::Exponential.apply(1.0) - (-1.0f64).exp()).abs() < 1e-12);
        assert!(DecayKind::Gaussian.apply(0.5) > DecayKind::Gaussian.apply(1.0));
        assert_eq!(DecayKind::Gaussian.apply(-3.0), 1.0);
    }

    #[test]
    fn test_every_item_scored() {
        let corpus = corpus(vec![
            Item::new("1", "A").with_bool("is_vegano", true),
            Item::new("2", "B"),
            Item::new("3", "C").with_bool("is_vegano", false),
        ]);
        let c = ConstraintSet::new().with_boolean("is_vegano", true);
        let scored = score_all(&corpus, &c, &schema(), &plain_config()).unwrap();

        assert_eq!(scored.len(), 3);
        let order: Vec<&str> = scored.iter().map(|s| s.item_id()).collect();
        assert_eq!(order, vec!["1", "2", "3"]);
        assert_eq!(scored[0].score, 1.0);
        assert_eq!(scored[1].score, 0.0);
        assert_eq!(scored[1].violated, vec!["is_vegano"]);
        assert_eq!(scored[2].score, -0.5);
    }

    #[test]
    fn test_small_overshoot_beats_large_overshoot() {
        let corpus = corpus(vec![
            Item::new("far", "Lasaña").with_number("kcal", 650.0),
            Item::new("near", "Crema").with_number("kcal", 420.0),
            Item::new("ok", "Caldo").with_number("kcal", 90.0),
        ]);
        let c = ConstraintSet::new().with_numeric("kcal", NumericOp::Le, 400.0);
        let mut config = plain_config();
        config.numeric_scales.insert("kcal".to_string(), 400.0);

        let scored = score_all(&corpus, &c, &schema(), &config).unwrap();
        let order: Vec<&str> = scored.iter().map(|s| s.item_id()).collect();
        assert_eq!(order, vec!["ok", "near", "far"]);
        assert_eq!(scored[0].score, 1.0);
        assert!((scored[1].score - 0.95).abs() < 1e-9);
        assert!((scored[2].score - 0.375).abs() < 1e-9);
    }

    #[test]
    fn test_strict_boundary_ranks_below_satisfied() {
        let corpus = corpus(vec![
            Item::new("1", "Justo").with_number("kcal", 400.0),
            Item::new("2", "Ligero").with_number("kcal", 399.0),
        ]);
        let c = ConstraintSet::new().with_numeric("kcal", NumericOp::Lt, 400.0);
        let scored = score_all(&corpus, &c, &schema(), &plain_config()).unwrap();

        assert_eq!(scored[0].item_id(), "2");
        assert_eq!(scored[0].score, 1.0);
        assert_eq!(scored[1].violated, vec!["kcal"]);
        assert!((scored[1].score - 0.99).abs() < 1e-9);
    }

    #[test]
    fn test_scale_defaults_to_corpus_range() {
        let corpus = corpus(vec![
            Item::new("1", "A").with_number("kcal", 100.0),
            Item::new("2", "B").with_number("kcal", 300.0),
        ]);
        let c = ConstraintSet::new().with_numeric("kcal", NumericOp::Lt, 200.0);
        let scorer_config = plain_config();
        let scorer = FallbackScorer::new(&corpus, &c, &scorer_config);
        let b = scorer.score(corpus.get("2").unwrap());
        // miss 100 over range 200
        assert!((b.score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_categorical_counts_each_match_without_penalty() {
        let corpus = corpus(vec![
            Item::new("1", "A").with_categories("cocina", ["india", "picante"]),
            Item::new("2", "B").with_categories("cocina", ["italiana"]),
        ]);
        let c = ConstraintSet::new().with_categories("cocina", ["india", "picante", "thai"]);
        let scored = score_all(&corpus, &c, &schema(), &plain_config()).unwrap();
        assert_eq!(scored[0].score, 2.0);
        assert_eq!(scored[1].score, 0.0);
        assert_eq!(scored[1].violated, vec!["cocina"]);
    }

    #[test]
    fn test_penalty_override_sinks_diet_violation() {
        let corpus = corpus(vec![
            Item::new("1", "Pollo")
                .with_bool("is_vegano", false)
                .with_bool("sin_gluten", true)
                .with_bool("sin_lactosa", true),
            Item::new("2", "Tofu")
                .with_bool("is_vegano", true)
                .with_bool("sin_gluten", false)
                .with_bool("sin_lactosa", false),
        ]);
        let c = ConstraintSet::new()
            .with_boolean("is_vegano", true)
            .with_boolean("sin_gluten", true)
            .with_boolean("sin_lactosa", true);

        let scored = score_all(&corpus, &c, &schema(), &ScoringConfig::default()).unwrap();
        assert_eq!(scored[0].item_id(), "2");
        assert_eq!(scored[0].score, 0.0);
        assert_eq!(scored[1].score, -3.0);
    }

    #[test]
    fn test_graded_bonus_rewards_protein() {
        let corpus = corpus(vec![
            Item::new("1", "Ensalada")
                .with_bool("alto_proteina", false)
                .with_number("proteinas", 4.0),
            Item::new("2", "Pollo")
                .with_bool("alto_proteina", true)
                .with_number("proteinas", 30.0),
        ]);
        let c = ConstraintSet::new().with_boolean("alto_proteina", true);
        let mut config = plain_config();
        config.graded_booleans.insert(
            "alto_proteina".to_string(),
            GradedBonus {
                attribute: "proteinas".to_string(),
                divisor: 5.0,
                cap: 2.5,
            },
        );

        let scored = score_all(&corpus, &c, &schema(), &config).unwrap();
        assert_eq!(scored[0].item_id(), "2");
        assert!((scored[0].score - 3.5).abs() < 1e-9);
        assert!((scored[1].score - (0.8 - 0.5)).abs() < 1e-9);
    }

    #[test]
    fn test_ties_broken_by_id() {
        let corpus = corpus(vec![
            Item::new("10", "A"),
            Item::new("2", "B"),
            Item::new("b", "C"),
            Item::new("a", "D"),
        ]);
        let scored = score_all(&corpus, &ConstraintSet::new(), &schema(), &plain_config()).unwrap();
        let order: Vec<&str> = scored.iter().map(|s| s.item_id()).collect();
        assert_eq!(order, vec!["2", "10", "a", "b"]);
    }

    #[test]
    fn test_unknown_attribute_is_an_error() {
        let corpus = corpus(vec![Item::new("1", "A")]);
        let c = ConstraintSet::new().with_boolean("picante", true);
        let err = score_all(&corpus, &c, &schema(), &plain_config()).unwrap_err();
        assert!(matches!(err, MenuSiftError::SchemaViolation(_)));
    }

    #[test]
    fn test_compare_ids() {
        assert_eq!(compare_ids("2", "10"), Ordering::Less);
        assert_eq!(compare_ids("a", "b"), Ordering::Less);
        assert_eq!(compare_ids("10", "a"), Ordering::Less);
        assert_eq!(compare_ids("10", "1a"), Ordering::Less);
        assert_eq!(compare_ids("1a", "2"), Ordering::Greater);
        assert_eq!(compare_ids("007", "7"), Ordering::Less);
    }

    #[test]
    fn test_mixed_id_ties_ignore_corpus_order() {
        let orders = [
            ["10", "2", "1a"],
            ["1a", "2", "10"],
            ["2", "1a", "10"],
            ["10", "1a", "2"],
        ];
        let c = ConstraintSet::new().with_boolean("is_vegano", true);

        for ids in orders {
            let corpus = corpus(
                ids.iter()
                    .map(|id| Item::new(*id, "Plato").with_bool("is_vegano", true))
                    .collect(),
            );
            let scored = score_all(&corpus, &c, &schema(), &plain_config()).unwrap();
            let order: Vec<&str> = scored.iter().map(|s| s.item_id()).collect();
            assert_eq!(order, vec!["2", "10", "1a"], "corpus order {:?}", ids);
        }
    }
}
