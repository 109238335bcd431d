//! Scoring cache (spec §4.3).
//!
//! The user's scoring function is opaque and deterministic; memoisation
//! itself lives on [`crate::predicate::Conjunction`] as a write-once cell
//! (spec §9 "Lazy caches with write-once semantics"). This module only
//! names the contract every caller shares.

use boxscan_types::BitMask;

/// `score_f : BitMask -> f64`, total, deterministic, side-effect free
/// (spec §6 "Scoring function contract").
pub type ScoreFn<'a> = &'a dyn Fn(&BitMask) -> f64;
