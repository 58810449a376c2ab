//! Decision engine
//!
//! Provides:
//! - Exact filtering of the corpus against a constraint set
//! - Weighted soft scoring of every item when exact matches are too few
//! - Result selection with context and presentation caps
//! - Rendering of selected items into text blocks for answer generation

mod assemble;
mod filter;
mod scoring;
mod select;

pub use assemble::{assemble, render_item, MISSING_VALUE};
pub use filter::{filter_exact, satisfies};
pub use scoring::{compare_ids, score_all, FallbackScorer, ScoredItem};
pub use select::{
    needs_fallback, required_matches, Caps, ResultEntry, ResultMode, ResultSet, Selector,
};
