//! Bottom-up predicate induction over tabular data.
//!
//! Given a [`boxscan_data::Data`] table and a scoring function over row
//! subsets, [`BottomUpEngine`] searches the lattice of conjunctive
//! predicates (axis-aligned column-value boxes) for a high-scoring,
//! non-redundant set, using containment and adjacency to prune without
//! enumerating the full lattice.

mod cache;
mod config;
mod engine;
mod error;
mod finalize;
mod predicate;

#[cfg(test)]
mod tests;

pub use cache::ScoreFn;
pub use config::EngineConfig;
pub use engine::{bottom_up_init, BottomUpEngine};
pub use error::{BoxscanError, Result};
pub use predicate::{Arena, Conjunction, PredicateId};
