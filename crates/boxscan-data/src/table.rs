//! The row-indexed tabular store (spec §3, §4.1).

use indexmap::IndexMap;
use tracing::debug;

use boxscan_types::{BitMask, ColumnName, Dtype, Value};

use crate::error::{DataError, Result};
use crate::raw::RawValue;

/// A single column: its declared dtype and its dense column of cells.
#[derive(Debug, Clone)]
struct Column {
    dtype: Dtype,
    cells: Vec<RawValue>,
}

/// A column-major table: one `Column` per name, all the same length.
#[derive(Debug, Clone, Default)]
struct Table {
    columns: IndexMap<ColumnName, Column>,
    row_count: usize,
}

impl Table {
    fn row_count(&self) -> usize {
        self.row_count
    }
}

/// The row-indexed tabular store plus the numeric→ordinal shadow mechanism
/// (spec §4.1).
///
/// A converted table retains a *shadow* of the original so that the caller's
/// scoring function and final row extraction may still reference original
/// values, per spec §3 "Dtype policy for search".
#[derive(Debug, Clone, Default)]
pub struct Data {
    current: Table,
    shadow: Option<(Table, IndexMap<ColumnName, Dtype>)>,
}

impl Data {
    /// Adopts `rows` (column-major) with the given dtypes, inferring any
    /// that are absent (spec §4.1 `load`).
    pub fn load(columns: IndexMap<ColumnName, Vec<RawValue>>) -> Self {
        let row_count = columns.values().map(Vec::len).next().unwrap_or(0);
        let mut table_columns = IndexMap::with_capacity(columns.len());
        for (name, cells) in columns {
            let dtype = infer_column_dtype(&cells);
            table_columns.insert(name, Column { dtype, cells });
        }
        Self {
            current: Table {
                columns: table_columns,
                row_count,
            },
            shadow: None,
        }
    }

    pub fn row_count(&self) -> usize {
        self.current.row_count()
    }

    pub fn column_names(&self) -> impl Iterator<Item = &ColumnName> {
        self.current.columns.keys()
    }

    pub fn dtype(&self, column: &ColumnName) -> Option<Dtype> {
        self.current.columns.get(column).map(|c| c.dtype)
    }

    /// Converts every column in `columns` (or every column, if empty) whose
    /// dtype is not in `admissible` but has a defined conversion target, by
    /// calling [`Data::convert`]. Idempotent: once a shadow exists from a
    /// prior conversion pass, this is a no-op (spec §4.1).
    pub fn convert_all(&mut self, num_bins: usize, columns: &[ColumnName]) -> Result<()> {
        if self.shadow.is_some() {
            return Ok(());
        }
        let targets: Vec<ColumnName> = if columns.is_empty() {
            self.current.columns.keys().cloned().collect()
        } else {
            columns.to_vec()
        };
        for column in targets {
            let Some(col) = self.current.columns.get(&column) else {
                continue;
            };
            if col.dtype.is_admissible() {
                continue;
            }
            if let Some(target) = col.dtype.conversion_target() {
                self.convert(&column, col.dtype, target, num_bins);
            }
        }
        Ok(())
    }

    /// Converts a single column from `old` to `new`. Only `numeric →
    /// ordinal` is defined; any other pair is a silent no-op (spec §4.1,
    /// §7: "Conversion of unsupported dtype pairs is an intentional
    /// no-op, not an error").
    pub fn convert(&mut self, column: &ColumnName, old: Dtype, new: Dtype, num_bins: usize) {
        if !(old == Dtype::Numeric && new == Dtype::Ordinal) {
            return;
        }
        let Some(col) = self.current.columns.get(column) else {
            return;
        };
        let values: Vec<f64> = col
            .cells
            .iter()
            .map(|c| match c {
                RawValue::Numeric(v) => *v,
                _ => f64::NAN,
            })
            .collect();
        let binned = bin_equal_width(&values, num_bins.max(1));

        if self.shadow.is_none() {
            let dtypes = self
                .current
                .columns
                .iter()
                .map(|(name, c)| (name.clone(), c.dtype))
                .collect();
            self.shadow = Some((self.current.clone(), dtypes));
        }

        debug!(column = %column, num_bins, "converted numeric column to ordinal");
        let entry = self.current.columns.get_mut(column).unwrap();
        entry.dtype = Dtype::Ordinal;
        entry.cells = binned.into_iter().map(RawValue::Ordinal).collect();
    }

    /// Distinct values present in `column`, sorted ascending (spec §4.2
    /// "Base-predicate enumeration": "one base predicate per distinct
    /// value of c").
    pub fn distinct_values(&self, column: &ColumnName) -> Vec<Value> {
        let Some(col) = self.current.columns.get(column) else {
            return Vec::new();
        };
        let mut values: Vec<Value> = match col.dtype {
            Dtype::Ordinal => {
                let mut seen = std::collections::BTreeSet::new();
                for cell in &col.cells {
                    if let RawValue::Ordinal(v) = cell {
                        seen.insert(*v);
                    }
                }
                seen.into_iter()
                    .map(|v| Value::Ordinal(u32::try_from(v).unwrap_or(0)))
                    .collect()
            }
            Dtype::Nominal | Dtype::Binary => {
                let mut seen = std::collections::BTreeSet::new();
                for cell in &col.cells {
                    seen.insert(cell_label(cell));
                }
                seen.into_iter().map(Value::Nominal).collect()
            }
            Dtype::Numeric => Vec::new(),
        };
        values.sort();
        values
    }

    /// Row mask for `column == value`.
    pub fn value_mask(&self, column: &ColumnName, value: &Value) -> BitMask {
        let Some(col) = self.current.columns.get(column) else {
            return BitMask::zeros(self.row_count());
        };
        BitMask::from_bools(col.cells.iter().map(|cell| cell_matches(cell, value)))
    }

    /// Returns the subset of rows (from the shadow table if one exists,
    /// else the current table) selected by `mask`, as `(column, RawValue)`
    /// pairs per row, in column order (spec §4.1 `select`).
    pub fn select(&self, mask: &BitMask) -> Result<Vec<Vec<(ColumnName, RawValue)>>> {
        let table = self.shadow.as_ref().map_or(&self.current, |(t, _)| t);
        if mask.len() != table.row_count() {
            return Err(DataError::MissingMask(
                table
                    .columns
                    .keys()
                    .next()
                    .cloned()
                    .unwrap_or_else(|| ColumnName::new("<unknown>")),
            ));
        }
        let mut rows = Vec::with_capacity(mask.count_ones());
        for row_idx in mask.iter_ones() {
            let row = table
                .columns
                .iter()
                .map(|(name, col)| (name.clone(), col.cells[row_idx].clone()))
                .collect();
            rows.push(row);
        }
        Ok(rows)
    }
}

/// A column-dtype-independent label for a cell, used to compare cells
/// against a nominal `Value` regardless of whether the underlying storage
/// is `Nominal`, `Binary`, or an integer/real column inferred as binary.
fn cell_label(cell: &RawValue) -> String {
    match cell {
        RawValue::Nominal(s) => s.clone(),
        RawValue::Binary(b) => b.to_string(),
        other => other.to_string(),
    }
}

fn cell_matches(cell: &RawValue, value: &Value) -> bool {
    match value {
        Value::Ordinal(b) => matches!(cell, RawValue::Ordinal(a) if *a == i64::from(*b)),
        Value::Nominal(b) => cell_label(cell) == *b,
    }
}

/// Infers a column's dtype (spec §4.1 `infer_column_dtype`):
/// all values in `{0,1}` → binary; real-valued → numeric; integer-typed →
/// ordinal; else nominal.
fn infer_column_dtype(cells: &[RawValue]) -> Dtype {
    let all_binary = cells.iter().all(|c| match c {
        RawValue::Ordinal(v) => *v == 0 || *v == 1,
        RawValue::Numeric(v) => (*v - 0.0).abs() < f64::EPSILON || (*v - 1.0).abs() < f64::EPSILON,
        RawValue::Binary(_) | RawValue::Null => true,
        RawValue::Nominal(_) => false,
    });
    if all_binary && cells.iter().any(|c| !matches!(c, RawValue::Null)) {
        return Dtype::Binary;
    }
    if cells.iter().any(|c| matches!(c, RawValue::Numeric(_))) {
        return Dtype::Numeric;
    }
    if cells
        .iter()
        .all(|c| matches!(c, RawValue::Ordinal(_) | RawValue::Null))
    {
        return Dtype::Ordinal;
    }
    Dtype::Nominal
}

/// Equal-width binning (spec §4.1 `bin_numeric`): cut `values` into
/// `num_bins` equal-width intervals spanning `[min, max]`, then sort and
/// uniquify the realized bin indices so the output is dense and 0-based.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_possible_wrap
)]
fn bin_equal_width(values: &[f64], num_bins: usize) -> Vec<i64> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    let (min, max) = finite
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });

    let raw_bins: Vec<i64> = values
        .iter()
        .map(|&v| {
            if !v.is_finite() || max <= min {
                0
            } else {
                let frac = (v - min) / (max - min);
                let idx = (frac * num_bins as f64).floor() as i64;
                idx.clamp(0, num_bins as i64 - 1)
            }
        })
        .collect();

    let mut distinct: Vec<i64> = raw_bins.clone();
    distinct.sort_unstable();
    distinct.dedup();

    raw_bins
        .into_iter()
        .map(|b| distinct.binary_search(&b).unwrap() as i64)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(&[0.0, 1.0, 2.0, 3.0], 4, vec![0, 1, 2, 3]; "four distinct bins")]
    #[test_case(&[1.0, 1.0, 1.0], 5, vec![0, 0, 0]; "constant column collapses to one bin")]
    fn bins_are_dense_and_0_based(values: &[f64], num_bins: usize, expected: Vec<i64>) {
        assert_eq!(bin_equal_width(values, num_bins), expected);
    }

    #[test]
    fn infers_binary_numeric_ordinal_nominal() {
        assert_eq!(
            infer_column_dtype(&[RawValue::Numeric(0.0), RawValue::Numeric(1.0)]),
            Dtype::Binary
        );
        assert_eq!(
            infer_column_dtype(&[RawValue::Numeric(0.5), RawValue::Numeric(2.1)]),
            Dtype::Numeric
        );
        assert_eq!(
            infer_column_dtype(&[RawValue::Ordinal(2), RawValue::Ordinal(5)]),
            Dtype::Ordinal
        );
        assert_eq!(
            infer_column_dtype(&[RawValue::Nominal("a".into())]),
            Dtype::Nominal
        );
    }

    #[test]
    fn convert_all_is_idempotent() {
        let mut cols = IndexMap::new();
        cols.insert(
            ColumnName::new("x"),
            vec![RawValue::Numeric(0.0), RawValue::Numeric(10.0)],
        );
        let mut data = Data::load(cols);
        data.convert_all(2, &[]).unwrap();
        assert_eq!(data.dtype(&ColumnName::new("x")), Some(Dtype::Ordinal));
        // A second pass must not reset the shadow or re-run conversion.
        data.convert_all(2, &[]).unwrap();
        assert_eq!(data.dtype(&ColumnName::new("x")), Some(Dtype::Ordinal));
    }

    #[test]
    fn select_uses_shadow_when_present() {
        let mut cols = IndexMap::new();
        cols.insert(
            ColumnName::new("x"),
            vec![RawValue::Numeric(0.0), RawValue::Numeric(10.0)],
        );
        let mut data = Data::load(cols);
        data.convert_all(2, &[]).unwrap();
        let mut mask = BitMask::zeros(2);
        mask.set(1, true);
        let rows = data.select(&mask).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0].1, RawValue::Numeric(10.0));
    }
}
