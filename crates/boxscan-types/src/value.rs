//! Column values admissible in a predicate's value sets.

use std::cmp::Ordering;
use std::fmt::{self, Display};

/// A single admissible value for a column: either a nominal label or an
/// ordinal bin index.
///
/// Ordinal values order by bin index; nominal values order lexically.
/// Comparing a `Nominal` to an `Ordinal` is a logic error in a well-formed
/// predicate (every value in a column's set shares that column's dtype) and
/// falls back to a stable but otherwise arbitrary tag ordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    /// An unordered category label.
    Nominal(String),
    /// A 0-based bin index produced by binning, or a column's native
    /// integer value for a column that was already ordinal.
    Ordinal(u32),
}

impl Value {
    pub fn as_ordinal(&self) -> Option<u32> {
        match self {
            Value::Ordinal(v) => Some(*v),
            Value::Nominal(_) => None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nominal(s) => write!(f, "{s}"),
            Value::Ordinal(v) => write!(f, "{v}"),
        }
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Ordinal(a), Value::Ordinal(b)) => a.cmp(b),
            (Value::Nominal(a), Value::Nominal(b)) => a.cmp(b),
            (Value::Ordinal(_), Value::Nominal(_)) => Ordering::Less,
            (Value::Nominal(_), Value::Ordinal(_)) => Ordering::Greater,
        }
    }
}
