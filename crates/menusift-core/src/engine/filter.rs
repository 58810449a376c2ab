//! Exact constraint filtering

use crate::constraints::ConstraintSet;
use crate::corpus::{Corpus, Item};

/// Items satisfying every constraint, in corpus order.
///
/// An empty constraint set passes every item.
pub fn filter_exact<'a>(corpus: &'a Corpus, constraints: &ConstraintSet) -> Vec<&'a Item> {
    let matched: Vec<&Item> = corpus
        .iter()
        .filter(|item| satisfies(item, constraints))
        .collect();

    tracing::debug!(
        "Exact filter [{}]: {} of {} items",
        constraints,
        matched.len(),
        corpus.len()
    );
    matched
}

/// Whether one item satisfies all constraints. A missing attribute fails
/// the constraint on it.
pub fn satisfies(item: &Item, constraints: &ConstraintSet) -> bool {
    let booleans = constraints
        .boolean()
        .iter()
        .all(|(name, required)| item.boolean(name) == Some(*required));

    booleans
        && constraints
            .numeric()
            .iter()
            .all(|(name, c)| matches!(item.number(name), Some(v) if c.holds(v)))
        && constraints.categorical().iter().all(|(name, accepted)| {
            matches!(item.categories(name), Some(values)
                if values.iter().any(|v| accepted.contains(v)))
        })
}
