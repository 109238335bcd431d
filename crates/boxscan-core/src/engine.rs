//! Bottom-up frontier search (spec §4.4).

use indexmap::IndexMap;
use tracing::{debug, info, instrument};

use boxscan_data::Data;
use boxscan_types::{total_cmp_f64, ColumnName, Dtype};

use crate::cache::ScoreFn;
use crate::config::EngineConfig;
use crate::error::{BoxscanError, Result};
use crate::predicate::{Arena, PredicateId};

/// Builds base predicates for every admissible column (or just `columns`,
/// if given), converting numeric columns to ordinal first (spec §6
/// `Conjunction.bottom_up_init`).
pub fn bottom_up_init(
    data: &mut Data,
    config: &EngineConfig,
    columns: Option<&[ColumnName]>,
) -> Result<(Arena, Vec<PredicateId>)> {
    let num_bins = config.resolved_num_bins(data.row_count())?;
    let requested: Vec<ColumnName> = columns.map_or_else(
        || data.column_names().cloned().collect(),
        <[ColumnName]>::to_vec,
    );
    data.convert_all(num_bins, &requested)?;

    let search_columns: Vec<ColumnName> = requested
        .into_iter()
        .filter(|c| {
            data.dtype(c)
                .and_then(Dtype::as_search_dtype)
                .is_some_and(Dtype::is_admissible)
        })
        .collect();

    let mut arena = Arena::new();
    let ids = arena.base_predicates(data, &search_columns)?;
    info!(
        columns = search_columns.len(),
        base_predicates = ids.len(),
        "initialised base predicates"
    );
    Ok((arena, ids))
}

/// Which child-generation rules a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Refine,
    Expand,
    ExpandRefine,
}

/// The frontier/accepted/rejected search state for one run (spec §4.4).
pub struct BottomUpEngine<'a> {
    data: &'a Data,
    arena: Arena,
    key_to_base: IndexMap<ColumnName, Vec<PredicateId>>,
    keys: Vec<ColumnName>,
    score_fn: ScoreFn<'a>,
    frontier: Vec<PredicateId>,
    accepted: Vec<PredicateId>,
    rejected: Vec<PredicateId>,
}

impl<'a> BottomUpEngine<'a> {
    pub fn new(
        data: &'a Data,
        arena: Arena,
        base_predicates: Vec<PredicateId>,
        score_fn: ScoreFn<'a>,
    ) -> Self {
        let mut key_to_base: IndexMap<ColumnName, Vec<PredicateId>> = IndexMap::new();
        for &id in &base_predicates {
            let p = arena.get(id);
            if p.keys().len() == 1 {
                key_to_base.entry(p.keys()[0].clone()).or_default().push(id);
            }
        }
        let keys: Vec<ColumnName> = key_to_base.keys().cloned().collect();

        let engine = Self {
            data,
            arena,
            key_to_base,
            keys,
            score_fn,
            frontier: Vec::new(),
            accepted: Vec::new(),
            rejected: Vec::new(),
        };
        let mut frontier = base_predicates;
        frontier
            .sort_by(|&a, &b| total_cmp_f64(engine.score_unchecked(b), engine.score_unchecked(a)));
        Self { frontier, ..engine }
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn arena_mut(&mut self) -> &mut Arena {
        &mut self.arena
    }

    /// Computes (or fetches the cached) score for `id`, with a panic in the
    /// caller-supplied scoring function turned into [`BoxscanError::ScoreFunctionError`]
    /// (spec §7: scoring failures are fatal for the run, never retried).
    fn score(&self, id: PredicateId) -> Result<f64> {
        let arena = &self.arena;
        let score_fn = self.score_fn;
        std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            arena.get(id).score_cached(score_fn)
        }))
        .map_err(|payload| BoxscanError::ScoreFunctionError(panic_message(&payload)))
    }

    /// Score without a panic boundary, used only during construction, which
    /// spec §7 keeps infallible.
    fn score_unchecked(&self, id: PredicateId) -> f64 {
        self.arena.get(id).score_cached(self.score_fn)
    }

    fn insert_sorted_frontier(&mut self, id: PredicateId) -> Result<()> {
        let mut scores = Vec::with_capacity(self.frontier.len());
        for &p in &self.frontier {
            scores.push(self.score(p)?);
        }
        let score = self.score(id)?;
        let pos = scores
            .iter()
            .position(|&s| total_cmp_f64(score, s) == std::cmp::Ordering::Greater);
        match pos {
            Some(i) => self.frontier.insert(i, id),
            None => self.frontier.push(id),
        }
        Ok(())
    }

    fn insert_sorted_into(&self, list: &mut Vec<PredicateId>, id: PredicateId) -> Result<()> {
        let mut scores = Vec::with_capacity(list.len());
        for &p in list.iter() {
            scores.push(self.score(p)?);
        }
        let score = self.score(id)?;
        let pos = scores
            .iter()
            .position(|&s| total_cmp_f64(score, s) == std::cmp::Ordering::Greater);
        match pos {
            Some(i) => list.insert(i, id),
            None => list.push(id),
        }
        Ok(())
    }

    /// Snapshot of the current frontier, for property tests that need a
    /// handle on the base predicates right after construction.
    #[cfg(test)]
    pub(crate) fn frontier_snapshot(&self) -> &[PredicateId] {
        &self.frontier
    }

    /// Refine children (spec §4.4): for each admissible column not already
    /// in `p`'s keys, merge with every base predicate of that column,
    /// keeping only children that strictly improve on `p`'s score.
    pub(crate) fn refine_children(&mut self, p: PredicateId) -> Result<Vec<PredicateId>> {
        let mut out = Vec::new();
        let p_score = self.score(p)?;
        let other_keys: Vec<ColumnName> = self
            .keys
            .iter()
            .filter(|k| !self.arena.get(p).keys().contains(k))
            .cloned()
            .collect();
        for key in other_keys {
            let bases = self.key_to_base.get(&key).cloned().unwrap_or_default();
            for b in bases {
                let child = self.arena.merge(p, b)?;
                if self.score(child)? > p_score {
                    out.push(child);
                }
            }
        }
        Ok(out)
    }

    /// Expand children (spec §4.4): for each column in `p`'s keys, merge
    /// with every predicate adjacent to `p` along that column.
    pub(crate) fn expand_children(&mut self, p: PredicateId) -> Result<Vec<PredicateId>> {
        let mut out = Vec::new();
        let p_score = self.score(p)?;
        let keys = self.arena.get(p).keys().to_vec();
        for key in keys {
            let adj = self.arena.get(p).adjacent(&key).to_vec();
            for a in adj {
                let child = self.arena.merge(p, a)?;
                if self.score(child)? > p_score {
                    out.push(child);
                }
            }
        }
        Ok(out)
    }

    fn children(&mut self, p: PredicateId, mode: Mode) -> Result<Vec<PredicateId>> {
        match mode {
            Mode::Refine => self.refine_children(p),
            Mode::Expand => self.expand_children(p),
            Mode::ExpandRefine => {
                let mut c = self.expand_children(p)?;
                c.extend(self.refine_children(p)?);
                Ok(c)
            }
        }
    }

    /// `c ⊑ a ∧ score(a) > score(c)` for some `a` in `accepted`.
    fn subsumed_by_accepted(&self, c: PredicateId) -> Result<Option<PredicateId>> {
        let c_score = self.score(c)?;
        for &a in &self.accepted {
            if self.arena.get(c).is_contained_by(self.arena.get(a)) && self.score(a)? > c_score {
                return Ok(Some(a));
            }
        }
        Ok(None)
    }

    /// Whether the main loop should stop before pulling another frontier
    /// predicate: `maxiters` reached, the frontier drained, or (spec §4.4)
    /// the best remaining/accepted score has already tripped
    /// `conditional_threshold`.
    fn should_stop(&self, config: &EngineConfig, iters: usize) -> Result<bool> {
        if let Some(max) = config.maxiters {
            if iters >= max {
                debug!(iters, "maxiters reached");
                return Ok(true);
            }
        }
        if self.frontier.is_empty() {
            return Ok(true);
        }
        if let Some(ct) = config.conditional_threshold {
            let top_frontier = match self.frontier.first() {
                Some(&p) => Some(self.score(p)?),
                None => None,
            };
            let top_accepted = match self.accepted.first() {
                Some(&p) => Some(self.score(p)?),
                None => None,
            };
            let top = top_frontier
                .into_iter()
                .chain(top_accepted)
                .fold(f64::NEG_INFINITY, f64::max);
            if top > ct {
                debug!(
                    top,
                    conditional_threshold = ct,
                    "conditional threshold tripped"
                );
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Tries to accept `p` (already known to score above `threshold`),
    /// evicting any accepted predicate it strictly dominates. Returns
    /// `false` (rejecting `p`) if some dominated or dominating accepted
    /// predicate scores at least as well (spec §4.4 "domination check").
    fn try_accept(&mut self, p: PredicateId, p_score: f64) -> Result<bool> {
        let dominated_by: Vec<PredicateId> = self
            .accepted
            .iter()
            .copied()
            .filter(|&a| self.arena.get(a).is_contained_by(self.arena.get(p)))
            .collect();
        for &b in &dominated_by {
            if self.score(b)? >= p_score {
                return Ok(false);
            }
        }
        if self.arena.get(p).is_base() {
            for &a in &self.accepted {
                if self.arena.get(p).is_contained_by(self.arena.get(a))
                    && p_score <= self.score(a)?
                {
                    return Ok(false);
                }
            }
        }
        for b in dominated_by {
            self.accepted.retain(|&a| a != b);
            self.rejected_push(b)?;
        }
        self.accepted_push(p)?;
        Ok(true)
    }

    fn run_loop(&mut self, config: &EngineConfig, mode: Mode) -> Result<()> {
        let threshold = config.threshold;
        let mut iters = 0usize;
        while !self.should_stop(config, iters)? {
            let p = self.frontier.remove(0);
            let p_score = self.score(p)?;
            let p_keys = self.arena.get(p).keys().to_vec();
            let children = self.children(p, mode)?;

            let mut any_unsubsumed = false;
            let mut all_fully_covered = !children.is_empty();
            for &child in &children {
                if let Some(cover) = self.subsumed_by_accepted(child)? {
                    let covers_all_keys = p_keys
                        .iter()
                        .all(|k| self.arena.get(cover).keys().contains(k));
                    all_fully_covered &= covers_all_keys;
                } else {
                    any_unsubsumed = true;
                    all_fully_covered = false;
                    self.insert_sorted_frontier(child)?;
                }
            }

            iters += 1;
            if any_unsubsumed {
                debug!(?p, p_score, "parent superseded by unsubsumed children");
                continue;
            }

            if all_fully_covered {
                self.rejected_push(p)?;
                continue;
            }

            if p_score > threshold {
                if !self.try_accept(p, p_score)? {
                    self.rejected_push(p)?;
                }
            } else {
                self.rejected_push(p)?;
            }
        }
        Ok(())
    }

    fn accepted_push(&mut self, id: PredicateId) -> Result<()> {
        let mut tmp = std::mem::take(&mut self.accepted);
        self.insert_sorted_into(&mut tmp, id)?;
        self.accepted = tmp;
        Ok(())
    }

    fn rejected_push(&mut self, id: PredicateId) -> Result<()> {
        let mut tmp = std::mem::take(&mut self.rejected);
        self.insert_sorted_into(&mut tmp, id)?;
        self.rejected = tmp;
        Ok(())
    }

    /// Remaining frontier predicates, for the finaliser (spec §4.5).
    pub fn take_frontier(&mut self) -> Vec<PredicateId> {
        std::mem::take(&mut self.frontier)
    }

    pub fn accepted(&self) -> &[PredicateId] {
        &self.accepted
    }

    /// # Errors
    ///
    /// Returns [`BoxscanError::ScoreFunctionError`] if the caller's scoring
    /// function panics while scoring `id`.
    pub fn score_of(&self, id: PredicateId) -> Result<f64> {
        self.score(id)
    }

    pub fn score_fn(&self) -> ScoreFn<'a> {
        self.score_fn
    }

    /// Expand children only.
    ///
    /// # Errors
    ///
    /// Returns [`BoxscanError::ScoreFunctionError`] if the scoring function
    /// panics, or [`BoxscanError::InvariantViolation`] if a merged predicate
    /// ever fails spec §8's mask invariant.
    #[instrument(skip(self, config))]
    pub fn expand(&mut self, config: &EngineConfig) -> Result<Vec<PredicateId>> {
        self.run_loop(config, Mode::Expand)?;
        self.finalize(config)
    }

    /// Refine children only.
    ///
    /// # Errors
    ///
    /// See [`BottomUpEngine::expand`].
    #[instrument(skip(self, config))]
    pub fn refine(&mut self, config: &EngineConfig) -> Result<Vec<PredicateId>> {
        self.run_loop(config, Mode::Refine)?;
        self.finalize(config)
    }

    /// Refine and expand children combined.
    ///
    /// # Errors
    ///
    /// See [`BottomUpEngine::expand`].
    #[instrument(skip(self, config))]
    pub fn expand_refine(&mut self, config: &EngineConfig) -> Result<Vec<PredicateId>> {
        self.run_loop(config, Mode::ExpandRefine)?;
        self.finalize(config)
    }

    fn finalize(&mut self, config: &EngineConfig) -> Result<Vec<PredicateId>> {
        let result = crate::finalize::finalize(self, config)?;
        info!(result = result.len(), "search run finished");
        Ok(result)
    }

    pub fn data(&self) -> &Data {
        self.data
    }
}

/// Renders a caught scoring-function panic payload as a string (spec §7
/// `ScoreFunctionError`).
fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "scoring function panicked".to_string()
    }
}
