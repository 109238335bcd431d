//! # boxscan
//!
//! Bottom-up predicate induction over tabular data.
//!
//! Given a table and a caller-supplied scoring function over row subsets,
//! `boxscan` searches the lattice of conjunctive predicates (axis-aligned
//! column-value boxes, e.g. `region IN {"west"} AND status IN {"late"}`) for
//! a high-scoring, non-redundant set — without enumerating the full lattice.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                         boxscan                            │
//! │  ┌───────────┐   ┌────────────┐   ┌─────────────────┐   │
//! │  │   types   │ → │    data    │ → │      core        │   │
//! │  │(dtype,    │   │ (table,    │   │ (predicate,       │   │
//! │  │ value,    │   │  binning,  │   │  adjacency,       │   │
//! │  │ bitmask)  │   │  shadow)   │   │  frontier search) │   │
//! │  └───────────┘   └────────────┘   └─────────────────┘   │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick start
//!
//! ```ignore
//! use boxscan::{bottom_up_init, BottomUpEngine, Data, EngineConfig, RawValue};
//!
//! let mut data = Data::load(columns);
//! let config = EngineConfig::default();
//! let (arena, bases) = bottom_up_init(&mut data, &config, None)?;
//!
//! let score = |mask: &boxscan::BitMask| -> f64 {
//!     // caller-supplied anomaly score over the row subset selected by mask
//!     0.0
//! };
//! let mut engine = BottomUpEngine::new(&data, arena, bases, &score);
//! let accepted = engine.refine(&config)?;
//! for id in accepted {
//!     let conj = engine.arena().get(id);
//!     println!("{:?} -> {}", conj.keys(), engine.score_of(id)?);
//! }
//! ```
//!
//! # Modules
//!
//! - **Search**: [`BottomUpEngine`], [`bottom_up_init`] - frontier search
//! - **Predicates**: [`Arena`], [`Conjunction`], [`PredicateId`] - the lattice
//! - **Data**: [`Data`], [`RawValue`] - the row-indexed table
//! - **Vocabulary**: [`Dtype`], [`Value`], [`ColumnName`], [`BitMask`]

pub use boxscan_core::{
    bottom_up_init, Arena, BottomUpEngine, BoxscanError, Conjunction, EngineConfig, PredicateId,
    Result, ScoreFn,
};
pub use boxscan_data::{Data, DataError, RawValue};
pub use boxscan_types::{and_all, total_cmp_f64, BitMask, ColumnName, Dtype, Value};
