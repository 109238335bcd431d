//! Column data types and the search-admissibility policy over them.

use std::fmt::{self, Display};

/// The declared type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dtype {
    /// Unordered category (e.g. a label string).
    Nominal,
    /// Ordered category with a well-defined adjacency (e.g. a binned value).
    Ordinal,
    /// Real-valued; must be converted to `Ordinal` before the search engine
    /// can use it.
    Numeric,
    /// Two-valued `{0, 1}` column. Inferred like any other dtype but not
    /// itself admissible for search; admissible only once treated as
    /// nominal for base-predicate enumeration (see spec Open Question on
    /// binary columns).
    Binary,
}

impl Display for Dtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Dtype::Nominal => "nominal",
            Dtype::Ordinal => "ordinal",
            Dtype::Numeric => "numeric",
            Dtype::Binary => "binary",
        };
        f.write_str(s)
    }
}

impl Dtype {
    /// Whether this dtype can be used directly as a search dimension,
    /// without any conversion. Binary is intentionally excluded here: it is
    /// inferred but is only admissible once explicitly treated as nominal
    /// (`Dtype::as_search_dtype`).
    pub fn is_admissible(self) -> bool {
        matches!(self, Dtype::Nominal | Dtype::Ordinal)
    }

    /// The dtype a `numeric` column must be converted to before it is
    /// admissible, or `None` if this dtype needs no conversion (or has no
    /// defined conversion).
    pub fn conversion_target(self) -> Option<Dtype> {
        match self {
            Dtype::Numeric => Some(Dtype::Ordinal),
            _ => None,
        }
    }

    /// Binary columns are admissible as nominal for base-predicate
    /// enumeration (spec §9 Open Questions): a binary column explicitly
    /// listed in `columns` is treated as having two nominal values.
    pub fn as_search_dtype(self) -> Option<Dtype> {
        match self {
            Dtype::Nominal | Dtype::Ordinal => Some(self),
            Dtype::Binary => Some(Dtype::Nominal),
            Dtype::Numeric => None,
        }
    }
}
