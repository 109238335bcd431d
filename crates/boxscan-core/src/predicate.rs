//! The predicate data model: conjunctions over columns, their adjacency
//! graph, and the merge algebra (spec §3, §4.2).

use std::cell::OnceCell;

use indexmap::{IndexMap, IndexSet};

use boxscan_data::Data;
use boxscan_types::{and_all, BitMask, ColumnName, Value};

use crate::error::{BoxscanError, Result};

/// Index of a [`Conjunction`] inside an [`Arena`].
///
/// Predicates reference their adjacents by index rather than by owned
/// reference so the adjacency graph (which is cyclic among base predicates
/// of an ordinal column) never needs `Rc`/`RefCell` cycles (spec §9
/// "Cyclic adjacency graph").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PredicateId(pub(crate) usize);

/// A conjunction over tabular data: `AND_c (row[c] IN V_c)`.
///
/// Immutable except for its lazy, write-once score cache. Two conjunctions
/// are equal iff their `column_to_values` are equal as maps of sets (spec
/// §4.2 "Equality"), independent of insertion order.
#[derive(Debug)]
pub struct Conjunction {
    keys: Vec<ColumnName>,
    column_to_values: IndexMap<ColumnName, IndexSet<Value>>,
    per_column_mask: IndexMap<ColumnName, BitMask>,
    mask: BitMask,
    adjacent: IndexMap<ColumnName, Vec<PredicateId>>,
    parents: Option<(PredicateId, PredicateId)>,
    is_base: bool,
    score_cache: OnceCell<f64>,
}

impl PartialEq for Conjunction {
    fn eq(&self, other: &Self) -> bool {
        self.column_to_values == other.column_to_values
    }
}

impl Conjunction {
    pub fn keys(&self) -> &[ColumnName] {
        &self.keys
    }

    pub fn values(&self, column: &ColumnName) -> Option<&IndexSet<Value>> {
        self.column_to_values.get(column)
    }

    pub fn is_base(&self) -> bool {
        self.is_base
    }

    pub fn parents(&self) -> Option<(PredicateId, PredicateId)> {
        self.parents
    }

    /// Cached row mask. Always populated eagerly at construction time
    /// (base predicate and merge both compute it directly from
    /// `per_column_mask`), so invariant 1 of spec §8 ("p.mask equals the
    /// AND of `per_column_mask[c]`") holds by construction rather than by a
    /// deferred fill.
    pub fn mask(&self) -> &BitMask {
        &self.mask
    }

    pub fn adjacent(&self, column: &ColumnName) -> &[PredicateId] {
        self.adjacent.get(column).map_or(&[], Vec::as_slice)
    }

    /// Returns the cached score if present, otherwise computes, caches, and
    /// returns `score_f(mask)` (spec §4.3 scoring cache).
    pub fn score_cached(&self, score_f: &dyn Fn(&BitMask) -> f64) -> f64 {
        *self.score_cache.get_or_init(|| score_f(&self.mask))
    }

    /// `p is_contained_key(c, q)`: whether `self` is contained by `other`
    /// along column `c` (spec §3 "Contains along column c").
    pub fn is_contained_along(&self, column: &ColumnName, other: &Conjunction) -> bool {
        match (
            self.column_to_values.get(column),
            other.column_to_values.get(column),
        ) {
            (Some(mine), Some(theirs)) => mine.is_subset(theirs),
            _ => false,
        }
    }

    /// `self ⊑ other`: `other` is looser (fewer column constraints, each a
    /// superset) (spec §3 "Contains (full)").
    pub fn is_contained_by(&self, other: &Conjunction) -> bool {
        other.keys.iter().all(|k| self.keys.contains(k))
            && other.keys.iter().all(|c| self.is_contained_along(c, other))
    }

    /// Whether `other` is adjacent to `self` along every key of `self`
    /// (spec §3 "Adjacent (full)").
    pub fn is_adjacent_to_all_keys(&self, other_id: PredicateId) -> bool {
        self.keys
            .iter()
            .all(|c| self.adjacent(c).contains(&other_id))
    }
}

/// Owns every predicate created during a search run and hands out stable
/// [`PredicateId`]s. Mirrors spec §9's "store predicates in an arena (dense
/// vector) and reference by integer index".
#[derive(Debug, Default)]
pub struct Arena {
    preds: Vec<Conjunction>,
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: PredicateId) -> &Conjunction {
        &self.preds[id.0]
    }

    fn push(&mut self, c: Conjunction) -> PredicateId {
        self.preds.push(c);
        PredicateId(self.preds.len() - 1)
    }

    /// Builds one base predicate per distinct value of each admissible
    /// column, linking consecutive ordinal predicates into a doubly-linked
    /// chain (spec §4.2 "Base-predicate enumeration").
    pub fn base_predicates(
        &mut self,
        data: &Data,
        columns: &[ColumnName],
    ) -> Result<Vec<PredicateId>> {
        let mut ids = Vec::new();
        for column in columns {
            let Some(dtype) = data.dtype(column) else {
                continue;
            };
            let mut col_ids = Vec::new();
            for value in data.distinct_values(column) {
                let mask = data.value_mask(column, &value);
                let mut column_to_values = IndexMap::new();
                let mut values = IndexSet::new();
                values.insert(value);
                column_to_values.insert(column.clone(), values);
                let mut per_column_mask = IndexMap::new();
                per_column_mask.insert(column.clone(), mask.clone());
                let conj = Conjunction {
                    keys: vec![column.clone()],
                    column_to_values,
                    per_column_mask,
                    mask,
                    adjacent: IndexMap::new(),
                    parents: None,
                    is_base: true,
                    score_cache: OnceCell::new(),
                };
                col_ids.push(self.push(conj));
            }
            match dtype {
                boxscan_types::Dtype::Ordinal => {
                    for w in col_ids.windows(2) {
                        let (a, b) = (w[0], w[1]);
                        self.link_adjacent(column, a, b);
                    }
                }
                boxscan_types::Dtype::Nominal | boxscan_types::Dtype::Binary => {
                    // No natural order: every value of a nominal column is
                    // adjacent to every other, so greedy coalescence (spec
                    // §4.5) can still merge sibling bases.
                    for i in 0..col_ids.len() {
                        for j in (i + 1)..col_ids.len() {
                            self.link_adjacent(column, col_ids[i], col_ids[j]);
                        }
                    }
                }
                boxscan_types::Dtype::Numeric => {}
            }
            ids.extend(col_ids);
        }
        Ok(ids)
    }

    fn link_adjacent(&mut self, column: &ColumnName, a: PredicateId, b: PredicateId) {
        self.preds[a.0]
            .adjacent
            .entry(column.clone())
            .or_default()
            .push(b);
        self.preds[b.0]
            .adjacent
            .entry(column.clone())
            .or_default()
            .push(a);
    }

    /// The merge algebra of spec §4.2: combines `p` and `q` into a new
    /// arena entry and returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`BoxscanError::InvariantViolation`] if the merged mask ever
    /// disagrees with the AND of its own per-column masks (spec §8
    /// invariant 1) — an internal sanity check that should never trip given
    /// how `mask` is computed below, but guards against future drift.
    pub fn merge(&mut self, p_id: PredicateId, q_id: PredicateId) -> Result<PredicateId> {
        let p = self.get(p_id);
        let q = self.get(q_id);

        let mut keys: Vec<ColumnName> = p.keys.clone();
        for k in &q.keys {
            if !keys.contains(k) {
                keys.push(k.clone());
            }
        }
        keys.sort();

        let mut column_to_values = p.column_to_values.clone();
        let mut per_column_mask = p.per_column_mask.clone();
        let mut adjacent = p.adjacent.clone();

        for (column, q_values) in &q.column_to_values {
            if let Some(p_values) = column_to_values.get(column).cloned() {
                // Present in both: union values, OR masks.
                let merged_values: IndexSet<Value> = p_values.union(q_values).cloned().collect();
                column_to_values.insert(column.clone(), merged_values);
                let merged_mask = &p.per_column_mask[column] | &q.per_column_mask[column];
                per_column_mask.insert(column.clone(), merged_mask);

                if let Some(p_adj) = p.adjacent.get(column) {
                    let q_adj = q.adjacent.get(column).cloned().unwrap_or_default();
                    let mut merged_adj: Vec<PredicateId> = p_adj
                        .iter()
                        .copied()
                        .filter(|a| {
                            !self.get(*a).is_contained_along(column, q) && !q_adj.contains(a)
                        })
                        .collect();
                    merged_adj.extend(q_adj.iter().copied().filter(|a| {
                        !self.get(*a).is_contained_along(column, p) && !p_adj.contains(a)
                    }));
                    adjacent.insert(column.clone(), merged_adj);
                }
            } else {
                // Present only in q: copy its values/mask, inherit its
                // adjacents minus the merge partner itself.
                column_to_values.insert(column.clone(), q_values.clone());
                per_column_mask.insert(column.clone(), q.per_column_mask[column].clone());
                if let Some(q_adj) = q.adjacent.get(column) {
                    let filtered: Vec<PredicateId> =
                        q_adj.iter().copied().filter(|a| *a != p_id).collect();
                    adjacent.insert(column.clone(), filtered);
                }
            }
        }

        for c in &keys {
            if !per_column_mask.contains_key(c) {
                return Err(BoxscanError::InvariantViolation(format!(
                    "merged predicate over keys {keys:?} has no per-column mask for {c}"
                )));
            }
        }
        let mask = and_all(keys.iter().map(|c| &per_column_mask[c]));

        let conj = Conjunction {
            keys,
            column_to_values,
            per_column_mask,
            mask,
            adjacent,
            parents: Some((p_id, q_id)),
            is_base: false,
            score_cache: OnceCell::new(),
        };
        Ok(self.push(conj))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use boxscan_data::{Data, RawValue};

    fn two_column_data() -> Data {
        let mut cols = indexmap::IndexMap::new();
        cols.insert(
            ColumnName::new("a"),
            vec![
                RawValue::Nominal("x".into()),
                RawValue::Nominal("y".into()),
                RawValue::Nominal("x".into()),
            ],
        );
        Data::load(cols)
    }

    #[test]
    fn base_predicate_mask_matches_column_equality() {
        let data = two_column_data();
        let mut arena = Arena::new();
        let ids = arena
            .base_predicates(&data, &[ColumnName::new("a")])
            .unwrap();
        assert_eq!(ids.len(), 2); // "x", "y"
        let x_pred = ids
            .iter()
            .find(|id| {
                arena
                    .get(**id)
                    .values(&ColumnName::new("a"))
                    .unwrap()
                    .contains(&Value::Nominal("x".into()))
            })
            .unwrap();
        assert_eq!(arena.get(*x_pred).mask().count_ones(), 2);
    }

    #[test]
    fn merge_is_commutative_on_mask_and_keys() {
        let data = two_column_data();
        let mut arena = Arena::new();
        let ids = arena
            .base_predicates(&data, &[ColumnName::new("a")])
            .unwrap();
        let pq = arena.merge(ids[0], ids[1]).unwrap();
        let qp = arena.merge(ids[1], ids[0]).unwrap();
        assert_eq!(arena.get(pq).mask(), arena.get(qp).mask());
        assert_eq!(
            arena.get(pq).column_to_values,
            arena.get(qp).column_to_values
        );
    }
}
