//! Greedy merger and finaliser (spec §4.5).

use indexmap::IndexMap;
use tracing::debug;

use boxscan_types::{total_cmp_f64, ColumnName};

use crate::config::EngineConfig;
use crate::engine::BottomUpEngine;
use crate::error::Result;
use crate::predicate::PredicateId;

const GREEDY_MERGE_SAFETY_CAP: usize = 100_000;

fn keys_tuple(engine: &BottomUpEngine, id: PredicateId) -> Vec<ColumnName> {
    engine.arena().get(id).keys().to_vec()
}

/// Groups `ids` by their exact key tuple (spec §4.5 "bucket by keys").
fn bucket_by_keys(
    engine: &BottomUpEngine,
    ids: &[PredicateId],
) -> IndexMap<Vec<ColumnName>, Vec<PredicateId>> {
    let mut buckets: IndexMap<Vec<ColumnName>, Vec<PredicateId>> = IndexMap::new();
    for &id in ids {
        buckets.entry(keys_tuple(engine, id)).or_default().push(id);
    }
    buckets
}

/// Drops any predicate in a bucket that is contained by another in the same
/// bucket with a score at least as high (spec §4.5 "pre-prune").
fn pre_prune(engine: &BottomUpEngine, bucket: &mut Vec<PredicateId>) -> Result<()> {
    let arena = engine.arena();
    let mut sort_err = None;
    bucket.sort_by(|&a, &b| cmp_scores(engine, b, a, &mut sort_err));
    if let Some(err) = sort_err {
        return Err(err);
    }
    let mut kept: Vec<PredicateId> = Vec::new();
    for id in bucket.drain(..) {
        let mut dominated = false;
        for &k in &kept {
            if arena.get(id).is_contained_by(arena.get(k))
                && engine.score_of(k)? >= engine.score_of(id)?
            {
                dominated = true;
                break;
            }
        }
        if !dominated {
            kept.push(id);
        }
    }
    *bucket = kept;
    Ok(())
}

/// Compares two predicates by score, descending, recording the first
/// scoring failure encountered so the caller can propagate it after
/// `sort_by` (which cannot itself be fallible) returns.
fn cmp_scores(
    engine: &BottomUpEngine,
    a: PredicateId,
    b: PredicateId,
    err: &mut Option<crate::error::BoxscanError>,
) -> std::cmp::Ordering {
    match (engine.score_of(a), engine.score_of(b)) {
        (Ok(sa), Ok(sb)) => total_cmp_f64(sa, sb),
        (Err(e), _) | (_, Err(e)) => {
            if err.is_none() {
                *err = Some(e);
            }
            std::cmp::Ordering::Equal
        }
    }
}

/// Greedily coalesces adjacent-along-every-key predicates within a bucket
/// (sorted by score descending) whenever the merge scores at least as well
/// as the surviving predicate, dropping anything below
/// `conditional_threshold` or fully contained by a not-worse survivor, up to
/// a safety cap on merge attempts (spec §4.5 "greedy coalescence").
fn greedy_coalesce(
    engine: &mut BottomUpEngine,
    mut bucket: Vec<PredicateId>,
    cutoff: f64,
) -> Result<Vec<PredicateId>> {
    let mut sort_err = None;
    bucket.sort_by(|&a, &b| cmp_scores(engine, b, a, &mut sort_err));
    if let Some(err) = sort_err {
        return Err(err);
    }

    let mut result = Vec::new();
    let mut attempts = 0usize;
    let mut remaining = bucket;

    while let Some(mut p) = remaining.first().copied() {
        remaining.remove(0);
        if engine.score_of(p)? <= cutoff {
            continue;
        }

        let mut i = 0;
        while i < remaining.len() {
            if attempts >= GREEDY_MERGE_SAFETY_CAP {
                debug!(attempts, "greedy merge safety cap reached");
                break;
            }
            attempts += 1;
            let q = remaining[i];
            if engine.arena().get(p).is_adjacent_to_all_keys(q) {
                let merged = engine.arena_mut().merge(p, q)?;
                if engine.score_of(merged)? >= engine.score_of(p)? {
                    remaining.remove(i);
                    p = merged;
                    i = 0;
                    continue;
                }
            } else if engine.arena().get(q).is_contained_by(engine.arena().get(p))
                && engine.score_of(q)? <= engine.score_of(p)?
            {
                remaining.remove(i);
                continue;
            }
            i += 1;
        }
        result.push(p);
    }
    Ok(result)
}

/// Runs the greedy merger over the engine's remaining frontier predicates to
/// produce `conditionally_accepted`, then performs the final merge against
/// `accepted` (spec §4.5).
pub fn finalize(engine: &mut BottomUpEngine, config: &EngineConfig) -> Result<Vec<PredicateId>> {
    let leftover = engine.take_frontier();
    let cutoff = config.conditional_threshold.unwrap_or(config.threshold);

    let mut merged_conditional = Vec::new();
    for (_, mut bucket) in bucket_by_keys(engine, &leftover) {
        pre_prune(engine, &mut bucket)?;
        merged_conditional.extend(greedy_coalesce(engine, bucket, cutoff)?);
    }

    let accepted = engine.accepted().to_vec();
    final_merge(engine, &accepted, merged_conditional)
}

/// Merges the coalesced accepted and conditionally-accepted sets: for every
/// `(a, c)` pair related by containment in either direction, keeps whichever
/// scores strictly higher and drops the other, ties favoring `accepted`
/// (spec §4.5 "final merge").
fn final_merge(
    engine: &BottomUpEngine,
    accepted: &[PredicateId],
    conditional: Vec<PredicateId>,
) -> Result<Vec<PredicateId>> {
    let arena = engine.arena();
    let mut result = accepted.to_vec();

    for c in conditional {
        let snapshot = result.clone();
        let mut c_wins = true;
        let mut losers = Vec::new();
        for a in snapshot {
            let related = arena.get(c).is_contained_by(arena.get(a))
                || arena.get(a).is_contained_by(arena.get(c));
            if !related {
                continue;
            }
            if engine.score_of(a)? >= engine.score_of(c)? {
                c_wins = false;
            } else {
                losers.push(a);
            }
        }
        if c_wins {
            result.retain(|a| !losers.contains(a));
            result.push(c);
        }
    }

    let mut sort_err = None;
    result.sort_by(|&a, &b| cmp_scores(engine, b, a, &mut sort_err));
    if let Some(err) = sort_err {
        return Err(err);
    }
    Ok(result)
}
