//! Dense bit-per-row row masks.

use std::ops::{BitAnd, BitOr};

use bitvec::prelude::{BitVec, Lsb0};

/// A dense boolean vector of length N marking which rows of a table satisfy
/// some predicate. Row order matches the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitMask(BitVec<usize, Lsb0>);

impl BitMask {
    /// Creates a mask of `len` rows, all unset.
    pub fn zeros(len: usize) -> Self {
        Self(BitVec::repeat(false, len))
    }

    /// Creates a mask from an iterator of per-row booleans.
    pub fn from_bools(bits: impl IntoIterator<Item = bool>) -> Self {
        Self(bits.into_iter().collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, row: usize) -> bool {
        self.0[row]
    }

    pub fn set(&mut self, row: usize, value: bool) {
        self.0.set(row, value);
    }

    /// Number of rows selected by this mask.
    pub fn count_ones(&self) -> usize {
        self.0.count_ones()
    }

    /// Indices of rows selected by this mask, in ascending order.
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.0.iter_ones()
    }
}

impl BitAnd for &BitMask {
    type Output = BitMask;

    fn bitand(self, rhs: &BitMask) -> BitMask {
        debug_assert_eq!(self.0.len(), rhs.0.len(), "masks must share row count");
        BitMask(self.0.clone() & rhs.0.clone())
    }
}

impl BitOr for &BitMask {
    type Output = BitMask;

    fn bitor(self, rhs: &BitMask) -> BitMask {
        debug_assert_eq!(self.0.len(), rhs.0.len(), "masks must share row count");
        BitMask(self.0.clone() | rhs.0.clone())
    }
}

/// Folds the bitwise AND of a non-empty sequence of masks. Panics on an
/// empty slice; callers always have at least one per-column mask for a
/// well-formed predicate (spec invariant: `column_to_values[c]` never empty).
pub fn and_all<'a>(masks: impl IntoIterator<Item = &'a BitMask>) -> BitMask {
    let mut iter = masks.into_iter();
    let first = iter
        .next()
        .expect("and_all requires at least one mask")
        .clone();
    iter.fold(first, |acc, m| &acc & m)
}
